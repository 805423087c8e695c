// src/cli/watch.rs
//! Watch 命令 - 轮询快照文件并实时运行管线
//!
//! 快照文件是外部通知存储的落地（JSON 数组），偏好文件是偏好服务的落地（JSON 对象）。
//! 标准输入支持 `close <id>` / `click <id>` / `clear` 三种操作。

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::notification::{
    DeliveryLog, EffectExecutor, Notification, PipelineRuntime, PreferenceService, PreferenceSet,
    RuntimeHandle,
};

use super::output::{build_sound_gate, render_view, PrintNavigator};

/// Watch 命令参数
#[derive(Args)]
pub struct WatchArgs {
    /// 快照文件（JSON 数组）
    #[arg(long, short)]
    pub snapshot: PathBuf,

    /// 偏好文件（JSON 对象）
    #[arg(long, short)]
    pub preferences: PathBuf,

    /// 轮询间隔（秒）
    #[arg(long, short, default_value = "5")]
    pub interval: u64,

    /// 写入投递记录
    #[arg(long)]
    pub log: bool,
}

/// 从本地 JSON 文件读取偏好
pub struct FilePreferenceService {
    path: PathBuf,
}

impl FilePreferenceService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceService for FilePreferenceService {
    fn fetch(&self) -> Result<PreferenceSet> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read preferences {}", self.path.display()))?;
        let preferences = serde_json::from_str(&content)
            .with_context(|| format!("Invalid preferences {}", self.path.display()))?;
        Ok(preferences)
    }
}

/// 读取快照文件
pub fn read_snapshot(path: &Path) -> Result<Vec<Notification>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot = serde_json::from_str(&content)
        .with_context(|| format!("Invalid snapshot {}", path.display()))?;
    Ok(snapshot)
}

/// 解析标准输入命令，无法识别时返回 `false`
pub fn dispatch_command(handle: &RuntimeHandle, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("close"), Some(id)) => handle.close(id),
        (Some("click"), Some(id)) => handle.click(id),
        (Some("clear"), None) => handle.clear_all(),
        _ => false,
    }
}

/// 快照轮询定时器，在循环外创建，标准输入的活动不会推迟下一次轮询
pub fn poll_timer(period: Duration) -> Interval {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// 处理 watch 命令
pub async fn handle_watch(args: WatchArgs) -> Result<()> {
    let config = PipelineConfig::load()?;

    let mut executor = EffectExecutor::new(build_sound_gate(&config), Arc::new(PrintNavigator));
    if args.log {
        executor = executor.with_delivery_log(Arc::new(DeliveryLog::default()));
    }

    let (runtime, handle) = PipelineRuntime::new(
        &config,
        executor,
        Arc::new(FilePreferenceService::new(&args.preferences)),
    );
    let runtime_task = tokio::spawn(runtime.run());

    // 视图变化时打印
    let mut views = handle.subscribe();
    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            println!("{}", render_view(&view));
        }
    });

    println!("🔍 Watching {} (interval: {}s)", args.snapshot.display(), args.interval);
    println!("Commands: close <id> | click <id> | clear (Ctrl+C to stop)\n");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = poll_timer(Duration::from_secs(args.interval.max(1)));
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !dispatch_command(&handle, line.trim()) {
                        warn!(command = %line.trim(), "Unknown command");
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = poll.tick() => match read_snapshot(&args.snapshot) {
                Ok(snapshot) => {
                    debug!(count = snapshot.len(), "Snapshot polled");
                    handle.snapshot(snapshot);
                }
                Err(e) => warn!(error = %e, "Snapshot unavailable, skipping poll"),
            },
        }
    }

    drop(handle);
    let pipeline = runtime_task.await?;
    printer.abort();
    info!(
        ledger = pipeline.ledger().len(),
        queued = pipeline.queue_len(),
        "Watch stopped"
    );
    Ok(())
}
