//! 去重账本 - 记录已处理过的通知 ID，防止重复弹出
//!
//! 快照轮询可能在上一轮处理完成前再次到达，同一条通知会被看到多次。
//! 账本是防止重复准入的唯一依据。
//!
//! ## 淘汰策略
//! 1. 按插入顺序记录（重复插入不刷新位置）
//! 2. `trim()` 由定时器周期触发（默认 60 秒）
//! 3. 只保留最近插入的 `capacity` 个 ID（滑动窗口）
//!
//! 已知缺口：被裁剪掉的 ID 若再次出现在快照中，会被当作新通知重新准入。

use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// 默认容量
pub const DEFAULT_LEDGER_CAPACITY: usize = 100;

/// 有界、按插入顺序的通知 ID 集合
#[derive(Debug, Clone)]
pub struct DedupLedger {
    /// O(1) 成员检查
    members: HashSet<String>,
    /// 插入顺序，队首最旧
    order: VecDeque<String>,
    /// 裁剪后保留的数量
    capacity: usize,
}

impl DedupLedger {
    /// 创建新的账本，使用默认容量 100
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LEDGER_CAPACITY)
    }

    /// 指定容量
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// 是否已处理
    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// 记录 ID
    ///
    /// 返回 `true` 表示新记录，`false` 表示已存在（位置不变）
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    /// 裁剪到容量以内，淘汰最早插入的 ID
    ///
    /// 返回被淘汰的数量
    pub fn trim(&mut self) -> usize {
        let excess = self.order.len().saturating_sub(self.capacity);
        for _ in 0..excess {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        if excess > 0 {
            debug!(evicted = excess, retained = self.order.len(), "Dedup ledger trimmed");
        }
        excess
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按插入顺序遍历（最旧在前）
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new()
    }
}
