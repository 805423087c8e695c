//! History 命令 - 查看最近的投递记录

use anyhow::Result;
use clap::Args;

use crate::notification::{DeliveryLog, DeliveryRecord};

use super::output::format_output;

/// History 命令参数
#[derive(Args)]
pub struct HistoryArgs {
    /// 显示最近 N 条
    #[arg(long, short, default_value = "20")]
    pub limit: usize,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 单条记录的文本格式
pub fn format_record(record: &DeliveryRecord) -> String {
    let action = format_output(&record.action, true);
    let mut line = format!(
        "{} {:<10} {} {}",
        record.ts.format("%Y-%m-%d %H:%M:%S"),
        action.trim_matches('"'),
        record.id,
        record.kind
    );
    if let Some(route) = &record.route {
        line.push_str(&format!(" → {}", route));
    }
    line
}

/// 处理 history 命令
pub fn handle_history(args: HistoryArgs) -> Result<()> {
    let log = DeliveryLog::default();
    let records = log.read_recent(args.limit);

    if args.json {
        println!("{}", format_output(&records, false));
        return Ok(());
    }

    if records.is_empty() {
        println!("No deliveries recorded in {}", log.path().display());
        return Ok(());
    }
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{DeliveryAction, NotificationType};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_record() {
        let record = DeliveryRecord {
            ts: Utc.with_ymd_and_hms(2026, 2, 24, 8, 20, 52).unwrap(),
            id: "n-1".to_string(),
            kind: NotificationType::FriendRequest,
            action: DeliveryAction::Clicked,
            route: Some("/friends".to_string()),
        };
        assert_eq!(
            format_record(&record),
            "2026-02-24 08:20:52 clicked    n-1 friend_request → /friends"
        );
    }
}
