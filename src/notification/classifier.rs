//! 到达分类器 - 区分“历史快照”和“新到达”
//!
//! 初始化后的第一份快照只是已有的未读历史，只记入账本不弹出。
//! 之后每份快照中不在账本里的未读通知才算新到达，并按单次上限截断（防洪）。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use super::ledger::DedupLedger;
use super::model::Notification;

/// 每份快照的默认新到达上限
pub const DEFAULT_MAX_ARRIVALS_PER_SNAPSHOT: usize = 10;

/// 超出上限部分的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalOverflow {
    /// 不记入账本，留给下一份快照
    #[default]
    Defer,
    /// 记入账本但不弹出
    Drop,
}

/// 一次分类的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    /// 新到达（按快照顺序，已截断，尚未做类型过滤）
    pub arrivals: Vec<Notification>,
    /// 作为历史静默记录的数量
    pub suppressed: usize,
    /// 超出上限被推迟或丢弃的数量
    pub overflowed: usize,
}

/// 到达分类器
#[derive(Debug, Clone)]
pub struct ArrivalClassifier {
    initial_load: bool,
    max_per_snapshot: usize,
    overflow: ArrivalOverflow,
}

impl ArrivalClassifier {
    pub fn new(max_per_snapshot: usize, overflow: ArrivalOverflow) -> Self {
        Self {
            initial_load: true,
            max_per_snapshot: max_per_snapshot.max(1),
            overflow,
        }
    }

    /// 是否还在等待第一份快照
    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    /// 分类一份快照
    ///
    /// 第一份快照的未读 ID 全部记入账本；之后只返回新到达，调用方负责在准入时记账。
    /// 快照内重复的 ID 只取第一次出现。
    pub fn classify(&mut self, snapshot: &[Notification], ledger: &mut DedupLedger) -> Classified {
        let unread = snapshot.iter().filter(|n| !n.is_read);

        if self.initial_load {
            let mut suppressed = 0;
            for n in unread {
                if ledger.insert(&n.id) {
                    suppressed += 1;
                }
            }
            self.initial_load = false;
            info!(suppressed, "Initial snapshot recorded without display");
            return Classified {
                suppressed,
                ..Default::default()
            };
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut fresh: Vec<&Notification> = Vec::new();
        for n in unread {
            if ledger.contains(&n.id) || !seen.insert(n.id.as_str()) {
                continue;
            }
            fresh.push(n);
        }

        let overflowed = fresh.len().saturating_sub(self.max_per_snapshot);
        if overflowed > 0 {
            debug!(
                overflowed,
                limit = self.max_per_snapshot,
                policy = ?self.overflow,
                "Arrival cap reached for snapshot"
            );
            if self.overflow == ArrivalOverflow::Drop {
                for n in &fresh[self.max_per_snapshot..] {
                    ledger.insert(&n.id);
                }
            }
        }

        Classified {
            arrivals: fresh
                .into_iter()
                .take(self.max_per_snapshot)
                .cloned()
                .collect(),
            suppressed: 0,
            overflowed,
        }
    }
}

impl Default for ArrivalClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARRIVALS_PER_SNAPSHOT, ArrivalOverflow::Defer)
    }
}
