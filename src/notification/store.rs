//! 投递记录 - 本地 JSONL 文件读写
//!
//! 记录每次浮动通知的显示 / 晋升 / 点击，供 `floatn history` 查看。

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use crate::config::PipelineConfig;

use super::kind::NotificationType;
use super::pipeline::{Effect, ShownVia};

/// 投递动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryAction {
    Displayed,
    Promoted,
    Clicked,
}

/// 投递记录（JSONL 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// ISO8601 时间戳
    pub ts: DateTime<Utc>,
    /// 通知 ID
    pub id: String,
    /// 通知类型
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// 动作
    pub action: DeliveryAction,
    /// 点击后的路由
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl DeliveryRecord {
    /// 从副作用生成记录；与投递无关的副作用返回 `None`
    pub fn from_effect(effect: &Effect) -> Option<Self> {
        let (id, kind, action, route) = match effect {
            Effect::Displayed { id, kind, via } => {
                let action = match via {
                    ShownVia::Admission => DeliveryAction::Displayed,
                    ShownVia::Promotion => DeliveryAction::Promoted,
                };
                (id.clone(), kind.clone(), action, None)
            }
            Effect::Navigate(request) => (
                request.id.clone(),
                request.kind.clone(),
                DeliveryAction::Clicked,
                Some(request.route.clone()),
            ),
            Effect::PlaySound { .. } | Effect::FetchPreferences => return None,
        };

        Some(Self {
            ts: Utc::now(),
            id,
            kind,
            action,
            route,
        })
    }
}

const MAX_RECORDS: usize = 200;
const KEEP_AFTER_CLEANUP: usize = 100;
const CLEANUP_CHECK_INTERVAL: usize = 10;

/// 投递记录存储
pub struct DeliveryLog {
    path: PathBuf,
    write_count: AtomicUsize,
}

impl DeliveryLog {
    /// 默认存储文件路径
    pub fn default_path() -> PathBuf {
        PipelineConfig::config_dir().join("deliveries.jsonl")
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_count: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加记录（带文件锁）
    pub fn append(&self, record: &DeliveryRecord) -> Result<()> {
        // 确保目录存在
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;

        file.lock_exclusive()?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.unlock()?;

        // 定期检查是否需要压缩；记录已写入，压缩失败不影响结果
        self.maybe_compact();

        Ok(())
    }

    /// 读取最近 N 条记录
    pub fn read_recent(&self, n: usize) -> Vec<DeliveryRecord> {
        let records = match self.read_all() {
            Ok(records) => records,
            Err(_) => return Vec::new(),
        };

        // 返回最后 N 条（按时间排序）
        let start = records.len().saturating_sub(n);
        let mut recent = records[start..].to_vec();
        recent.sort_by_key(|r| r.ts);
        recent
    }

    fn read_all(&self) -> Result<Vec<DeliveryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        file.lock_shared()?;
        let records = BufReader::new(&file)
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        file.unlock()?;
        Ok(records)
    }

    fn maybe_compact(&self) {
        let count = self.write_count.fetch_add(1, Ordering::Relaxed);
        if count % CLEANUP_CHECK_INTERVAL != 0 {
            return;
        }
        match self.compact() {
            Ok(0) => {}
            Ok(dropped) => debug!(dropped, path = %self.path.display(), "Delivery log compacted"),
            Err(e) => warn!(error = %e, path = %self.path.display(), "Failed to compact delivery log"),
        }
    }

    /// 超过上限时只保留最近的行，返回丢弃的行数
    ///
    /// 在同一个 inode 上截断重写，其他追加者持有的句柄仍然有效
    fn compact(&self) -> Result<usize> {
        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.lock_exclusive()?;
        let result = Self::compact_locked(&mut file);
        file.unlock()?;
        result
    }

    fn compact_locked(file: &mut File) -> Result<usize> {
        let lines: Vec<String> = BufReader::new(&*file)
            .lines()
            .map_while(|line| line.ok())
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.len() <= MAX_RECORDS {
            return Ok(0);
        }

        let dropped = lines.len() - KEEP_AFTER_CLEANUP;
        let mut kept = lines[dropped..].join("\n");
        kept.push('\n');

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(kept.as_bytes())?;
        file.sync_data()?;
        Ok(dropped)
    }
}

impl Default for DeliveryLog {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::navigation::NavigationRequest;
    use tempfile::TempDir;

    fn record(id: &str) -> DeliveryRecord {
        DeliveryRecord {
            ts: Utc::now(),
            id: id.to_string(),
            kind: NotificationType::ChatMessage,
            action: DeliveryAction::Displayed,
            route: None,
        }
    }

    #[test]
    fn test_append_and_read_recent() {
        let dir = TempDir::new().unwrap();
        let log = DeliveryLog::new(dir.path().join("deliveries.jsonl"));

        log.append(&record("a")).unwrap();
        log.append(&record("b")).unwrap();
        log.append(&record("c")).unwrap();

        let recent = log.read_recent(2);
        let ids: Vec<_> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = DeliveryLog::new(dir.path().join("missing.jsonl"));
        assert!(log.read_recent(10).is_empty());
    }

    #[test]
    fn test_cleanup_keeps_last_records() {
        let dir = TempDir::new().unwrap();
        let log = DeliveryLog::new(dir.path().join("deliveries.jsonl"));

        for i in 0..=MAX_RECORDS {
            log.append(&record(&format!("n-{}", i))).unwrap();
        }
        // 超过上限后由周期检查裁剪
        for i in 0..10 {
            log.append(&record(&format!("m-{}", i))).unwrap();
        }

        let all = log.read_recent(usize::MAX);
        assert!(all.len() <= MAX_RECORDS);
        assert_eq!(all.last().map(|r| r.id.as_str()), Some("m-9"));
    }

    #[test]
    fn test_compaction_keeps_open_appenders_valid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deliveries.jsonl");
        let log = DeliveryLog::new(&path);
        log.append(&record("first")).unwrap();

        // 另一个进程在压缩前已经打开了文件
        let mut other = OpenOptions::new().append(true).open(&path).unwrap();

        for i in 0..MAX_RECORDS + CLEANUP_CHECK_INTERVAL {
            log.append(&record(&format!("n-{}", i))).unwrap();
        }
        assert!(log.read_recent(usize::MAX).len() <= MAX_RECORDS);

        writeln!(other, "{}", serde_json::to_string(&record("late")).unwrap()).unwrap();
        drop(other);

        let all = log.read_recent(usize::MAX);
        assert_eq!(all.last().map(|r| r.id.as_str()), Some("late"));
    }

    #[test]
    fn test_compact_reports_dropped_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deliveries.jsonl");
        let lines: String = (0..MAX_RECORDS + 1)
            .map(|i| format!("{}\n", serde_json::to_string(&record(&format!("n-{}", i))).unwrap()))
            .collect();
        fs::write(&path, lines).unwrap();

        let log = DeliveryLog::new(&path);
        assert_eq!(log.compact().unwrap(), MAX_RECORDS + 1 - KEEP_AFTER_CLEANUP);
        assert_eq!(log.compact().unwrap(), 0);

        let all = log.read_recent(usize::MAX);
        assert_eq!(all.len(), KEEP_AFTER_CLEANUP);
        assert_eq!(all.first().map(|r| r.id.clone()), Some(format!("n-{}", MAX_RECORDS + 1 - KEEP_AFTER_CLEANUP)));
    }

    #[test]
    fn test_record_from_effects() {
        let shown = Effect::Displayed {
            id: "n-1".to_string(),
            kind: NotificationType::BillDue,
            via: ShownVia::Promotion,
        };
        let r = DeliveryRecord::from_effect(&shown).unwrap();
        assert_eq!(r.action, DeliveryAction::Promoted);
        assert_eq!(r.id, "n-1");

        let nav = Effect::Navigate(NavigationRequest {
            id: "n-2".to_string(),
            kind: NotificationType::BillDue,
            route: "/bills".to_string(),
            target_id: Some("b-3".to_string()),
        });
        let r = DeliveryRecord::from_effect(&nav).unwrap();
        assert_eq!(r.action, DeliveryAction::Clicked);
        assert_eq!(r.id, "n-2");
        assert_eq!(r.route.as_deref(), Some("/bills"));

        assert!(DeliveryRecord::from_effect(&Effect::FetchPreferences).is_none());
    }

    #[test]
    fn test_record_serialization() {
        let json = serde_json::to_string(&record("x")).unwrap();
        assert!(json.contains("\"type\":\"chat_message\""));
        assert!(json.contains("\"action\":\"displayed\""));
        let parsed: DeliveryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "x");
    }
}
