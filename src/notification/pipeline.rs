//! 浮动通知管线 - 准入控制、溢出队列、晋升与用户操作
//!
//! # 模型
//! 所有状态变化都是对四类事件的同步响应：
//! - `ArrivalSnapshot`：外部通知存储推送的新快照
//! - `PreferenceUpdate`：偏好加载 / 失败
//! - `UserAction`：关闭、点击、全部清除
//! - `TrimTick`：账本裁剪定时器
//!
//! `FloatingPipeline::apply` 不做任何 I/O，只返回需要执行的 `Effect`
//! （播放提示音、导航、请求偏好），由调用方（`PipelineRuntime` 或测试）执行。
//!
//! # 不变量
//! 1. 可见集合数量不超过 `max_visible`
//! 2. 同一 ID 不会同时出现在可见集合和队列中，也不会在其中任一处重复
//! 3. 每个被准入的 ID 都已记入账本（直到被裁剪）
//! 4. 队列严格先进先出

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;

use super::classifier::ArrivalClassifier;
use super::kind::{NotificationType, Priority};
use super::ledger::DedupLedger;
use super::model::Notification;
use super::navigation::NavigationRequest;
use super::preferences::{PreferenceLoader, PreferenceSet, ResolvedPreferences};
use super::sound::SoundGate;

/// 偏好更新
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PreferenceUpdate {
    /// 加载完成
    Loaded { preferences: PreferenceSet },
    /// 外部开始加载
    Loading,
    /// 加载失败
    Failed { error: String },
}

/// 用户操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UserAction {
    /// 关闭（仅可见集合中的通知）
    Close { id: String },
    /// 点击：关闭并导航
    Click { id: String },
    /// 清空可见集合和队列
    ClearAll,
}

/// 管线输入事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    ArrivalSnapshot(Vec<Notification>),
    PreferenceUpdate(PreferenceUpdate),
    UserAction(UserAction),
    TrimTick,
}

/// 通知进入可见集合的途径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShownVia {
    /// 新到达直接显示
    Admission,
    /// 从队列晋升
    Promotion,
}

/// 需要调用方执行的副作用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// 通知进入可见集合
    Displayed {
        id: String,
        kind: NotificationType,
        via: ShownVia,
    },
    /// 播放提示音（已经过门控）
    PlaySound { id: String, kind: NotificationType },
    /// 请求路由跳转
    Navigate(NavigationRequest),
    /// 请求加载偏好（一次性）
    FetchPreferences,
}

/// 可见通知（渲染层使用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub icon: &'static str,
    pub color: &'static str,
    pub duration_ms: u64,
    pub priority: Priority,
}

impl From<&Notification> for VisibleNotification {
    fn from(n: &Notification) -> Self {
        let config = n.type_config();
        Self {
            id: n.id.clone(),
            kind: n.kind.clone(),
            message: n.message.clone(),
            icon: config.icon,
            color: config.color,
            duration_ms: config.default_duration_ms,
            priority: config.priority,
        }
    }
}

/// 管线对外视图：可见集合 + 排队数量
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineView {
    pub enabled: bool,
    pub visible: Vec<VisibleNotification>,
    pub queued: usize,
}

impl PipelineView {
    /// 溢出提示，如 "+2 more"
    pub fn overflow_label(&self) -> Option<String> {
        (self.queued > 0).then(|| format!("+{} more", self.queued))
    }
}

/// 浮动通知管线
pub struct FloatingPipeline {
    max_visible: usize,
    preferences: Option<PreferenceSet>,
    resolved: ResolvedPreferences,
    loader: PreferenceLoader,
    ledger: DedupLedger,
    classifier: ArrivalClassifier,
    display: Vec<Notification>,
    queue: VecDeque<Notification>,
}

impl FloatingPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_visible: config.max_visible.max(1),
            preferences: None,
            resolved: ResolvedPreferences::resolve(None),
            loader: PreferenceLoader::new(config.fetch_retries),
            ledger: DedupLedger::with_capacity(config.ledger_capacity),
            classifier: ArrivalClassifier::new(config.max_arrivals_per_snapshot, config.arrival_overflow),
            display: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    /// 挂载时调用：偏好缺失则请求一次
    pub fn mount(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.check_fetch(&mut effects);
        effects
    }

    /// 处理一个事件
    pub fn apply(&mut self, event: PipelineEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            PipelineEvent::ArrivalSnapshot(snapshot) => self.on_snapshot(&snapshot, &mut effects),
            PipelineEvent::PreferenceUpdate(update) => self.on_preferences(update),
            PipelineEvent::UserAction(action) => self.on_action(action, &mut effects),
            PipelineEvent::TrimTick => {
                self.ledger.trim();
            }
        }

        self.check_fetch(&mut effects);
        effects
    }

    fn on_snapshot(&mut self, snapshot: &[Notification], effects: &mut Vec<Effect>) {
        let classified = self.classifier.classify(snapshot, &mut self.ledger);

        for notification in classified.arrivals {
            if !self.resolved.enabled {
                // 禁用期间到达的通知只记账，重新启用后不会补弹
                self.ledger.insert(&notification.id);
                debug!(id = %notification.id, "Floating notifications disabled, arrival suppressed");
                continue;
            }
            if !self.resolved.is_type_enabled(&notification.kind) {
                self.ledger.insert(&notification.id);
                continue;
            }
            self.admit(notification, effects);
        }
    }

    /// 准入：有空位进入可见集合，否则排队
    fn admit(&mut self, notification: Notification, effects: &mut Vec<Effect>) {
        // 账本被裁剪后同一 ID 可能再次出现，仍在界面上的不能重复加入
        if self.is_tracked(&notification.id) {
            self.ledger.insert(&notification.id);
            return;
        }
        if !self.ledger.insert(&notification.id) {
            return;
        }

        if self.display.len() < self.max_visible {
            self.show(notification, ShownVia::Admission, effects);
        } else {
            debug!(id = %notification.id, queued = self.queue.len() + 1, "Display full, notification queued");
            self.queue.push_back(notification);
        }
    }

    /// 有空位时按 FIFO 从队列晋升
    fn promote(&mut self, effects: &mut Vec<Effect>) {
        if !self.resolved.enabled {
            return;
        }
        while self.display.len() < self.max_visible {
            let Some(notification) = self.queue.pop_front() else {
                break;
            };
            self.show(notification, ShownVia::Promotion, effects);
        }
    }

    fn show(&mut self, notification: Notification, via: ShownVia, effects: &mut Vec<Effect>) {
        debug!(id = %notification.id, kind = %notification.kind, ?via, "Notification displayed");
        effects.push(Effect::Displayed {
            id: notification.id.clone(),
            kind: notification.kind.clone(),
            via,
        });
        if SoundGate::should_play(self.resolved.sound_enabled, &notification.kind) {
            effects.push(Effect::PlaySound {
                id: notification.id.clone(),
                kind: notification.kind.clone(),
            });
        }
        self.display.push(notification);
    }

    fn on_action(&mut self, action: UserAction, effects: &mut Vec<Effect>) {
        match action {
            UserAction::Close { id } => {
                self.close(&id, effects);
            }
            UserAction::Click { id } => {
                let Some(notification) = self.close(&id, effects) else {
                    debug!(id = %id, "Clicked notification is not visible, ignoring");
                    return;
                };
                let request = NavigationRequest::for_notification(&notification);
                info!(id = %id, route = %request.route, "Notification clicked");
                effects.push(Effect::Navigate(request));
            }
            UserAction::ClearAll => self.clear_all(),
        }
    }

    /// 关闭可见通知并触发晋升；队列中的通知不能单独关闭
    fn close(&mut self, id: &str, effects: &mut Vec<Effect>) -> Option<Notification> {
        let pos = self.display.iter().position(|n| n.id == id)?;
        let removed = self.display.remove(pos);
        self.promote(effects);
        Some(removed)
    }

    /// 清空可见集合和队列，不触发晋升
    fn clear_all(&mut self) {
        let cleared = self.display.len() + self.queue.len();
        self.display.clear();
        self.queue.clear();
        debug!(cleared, "All floating notifications cleared");
    }

    fn on_preferences(&mut self, update: PreferenceUpdate) {
        match update {
            PreferenceUpdate::Loaded { preferences } => {
                self.loader.on_loaded();
                self.preferences = Some(preferences);
                self.refresh_preferences();
            }
            PreferenceUpdate::Loading => self.loader.on_loading(),
            PreferenceUpdate::Failed { error } => {
                warn!(error = %error, "Failed to load notification preferences");
                self.loader.on_failed();
            }
        }
    }

    /// 重新解析偏好；启用 -> 禁用时立即清空所有状态
    fn refresh_preferences(&mut self) {
        let was_enabled = self.resolved.enabled;
        self.resolved = ResolvedPreferences::resolve(self.preferences.as_ref());

        if was_enabled && !self.resolved.enabled {
            let flushed = self.display.len() + self.queue.len();
            self.display.clear();
            self.queue.clear();
            info!(flushed, "Floating notifications disabled, pipeline flushed");
        } else if !was_enabled && self.resolved.enabled {
            info!(sound = self.resolved.sound_enabled, "Floating notifications enabled");
        }
    }

    fn check_fetch(&mut self, effects: &mut Vec<Effect>) {
        if self.loader.should_fetch(self.preferences.is_some()) {
            debug!("Preferences missing, requesting fetch");
            effects.push(Effect::FetchPreferences);
        }
    }

    fn is_tracked(&self, id: &str) -> bool {
        self.display.iter().any(|n| n.id == id) || self.queue.iter().any(|n| n.id == id)
    }

    /// 当前可见集合（按显示顺序）
    pub fn display(&self) -> &[Notification] {
        &self.display
    }

    /// 排队中的通知（队首在前）
    pub fn queue(&self) -> impl Iterator<Item = &Notification> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn is_enabled(&self) -> bool {
        self.resolved.enabled
    }

    pub fn resolved_preferences(&self) -> &ResolvedPreferences {
        &self.resolved
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    pub fn view(&self) -> PipelineView {
        PipelineView {
            enabled: self.resolved.enabled,
            visible: self.display.iter().map(VisibleNotification::from).collect(),
            queued: self.queue.len(),
        }
    }
}

impl Default for FloatingPipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
