//! 管线配置
//!
//! 加载顺序：
//! 1. 默认值
//! 2. `~/.config/floating-notify/config.json`（JSON，缺失字段用默认值，未知字段忽略）
//! 3. 环境变量 `FLOATN_*`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::notification::classifier::{ArrivalOverflow, DEFAULT_MAX_ARRIVALS_PER_SNAPSHOT};
use crate::notification::ledger::DEFAULT_LEDGER_CAPACITY;

/// 同时可见的浮动通知上限
pub const DEFAULT_MAX_VISIBLE: usize = 5;
/// 账本裁剪间隔（秒）
pub const DEFAULT_TRIM_INTERVAL_SECS: u64 = 60;
/// 偏好加载失败后的重试次数
pub const DEFAULT_FETCH_RETRIES: u32 = 1;

/// 管线配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 同时可见上限
    pub max_visible: usize,
    /// 单份快照新到达上限
    pub max_arrivals_per_snapshot: usize,
    /// 超出上限的处理方式
    pub arrival_overflow: ArrivalOverflow,
    /// 账本容量
    pub ledger_capacity: usize,
    /// 账本裁剪间隔（秒）
    pub trim_interval_secs: u64,
    /// 偏好加载重试次数
    pub fetch_retries: u32,
    /// 提示音播放命令（如 `paplay ~/ding.oga`），未设置则静音
    pub sound_command: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_visible: DEFAULT_MAX_VISIBLE,
            max_arrivals_per_snapshot: DEFAULT_MAX_ARRIVALS_PER_SNAPSHOT,
            arrival_overflow: ArrivalOverflow::Defer,
            ledger_capacity: DEFAULT_LEDGER_CAPACITY,
            trim_interval_secs: DEFAULT_TRIM_INTERVAL_SECS,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            sound_command: None,
        }
    }
}

impl PipelineConfig {
    /// 配置目录
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("floating-notify")
    }

    /// 默认配置文件路径
    pub fn path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// 从默认位置加载并应用环境变量
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config.sanitized())
    }

    /// 从指定文件加载；文件不存在时返回默认值
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }

    /// 环境变量覆盖（传入查询函数便于测试）
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: Option<String>) -> Option<T> {
            let value = value?;
            match value.trim().parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(key, value = %value, "Ignoring invalid environment override");
                    None
                }
            }
        }

        if let Some(v) = parse("FLOATN_MAX_VISIBLE", lookup("FLOATN_MAX_VISIBLE")) {
            self.max_visible = v;
        }
        if let Some(v) = parse("FLOATN_MAX_ARRIVALS", lookup("FLOATN_MAX_ARRIVALS")) {
            self.max_arrivals_per_snapshot = v;
        }
        if let Some(v) = parse("FLOATN_LEDGER_CAPACITY", lookup("FLOATN_LEDGER_CAPACITY")) {
            self.ledger_capacity = v;
        }
        if let Some(v) = parse("FLOATN_TRIM_INTERVAL_SECS", lookup("FLOATN_TRIM_INTERVAL_SECS")) {
            self.trim_interval_secs = v;
        }
        if let Some(cmd) = lookup("FLOATN_SOUND_COMMAND").filter(|c| !c.trim().is_empty()) {
            self.sound_command = Some(cmd);
        }
    }

    /// 修正非法值（0 容量等）
    pub fn sanitized(mut self) -> Self {
        if self.max_visible == 0 {
            warn!("max_visible must be at least 1, using default");
            self.max_visible = DEFAULT_MAX_VISIBLE;
        }
        if self.trim_interval_secs == 0 {
            warn!("trim_interval_secs must be at least 1, using default");
            self.trim_interval_secs = DEFAULT_TRIM_INTERVAL_SECS;
        }
        if self.max_arrivals_per_snapshot == 0 {
            warn!("max_arrivals_per_snapshot must be at least 1, using default");
            self.max_arrivals_per_snapshot = DEFAULT_MAX_ARRIVALS_PER_SNAPSHOT;
        }
        self
    }

    /// 裁剪间隔，至少 1 秒
    pub fn trim_interval(&self) -> Duration {
        Duration::from_secs(self.trim_interval_secs.max(1))
    }
}
