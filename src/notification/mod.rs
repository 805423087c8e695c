//! 浮动通知管线
//!
//! # 数据流
//! 快照 → 偏好过滤 → 到达分类 → 去重账本 → 准入（可见集合 / 队列）→ 关闭时晋升 → 用户操作 → 副作用
//!
//! # 使用示例
//! ```ignore
//! use floating_notify::notification::{FloatingPipeline, PipelineEvent, PreferenceUpdate, PreferenceSet};
//!
//! let mut pipeline = FloatingPipeline::default();
//! pipeline.apply(PipelineEvent::PreferenceUpdate(PreferenceUpdate::Loaded {
//!     preferences: PreferenceSet::all_enabled(),
//! }));
//! pipeline.apply(PipelineEvent::ArrivalSnapshot(history));
//! let effects = pipeline.apply(PipelineEvent::ArrivalSnapshot(latest));
//! ```

pub mod classifier;
pub mod kind;
pub mod ledger;
pub mod model;
pub mod navigation;
pub mod pipeline;
pub mod preferences;
pub mod runtime;
pub mod sound;
pub mod store;

pub use classifier::{ArrivalClassifier, ArrivalOverflow, Classified};
pub use kind::{type_config, Category, NotificationType, NotificationTypeConfig, Priority};
pub use ledger::DedupLedger;
pub use model::{Notification, NotificationPayload, NotificationSnapshot};
pub use navigation::{resolve_route, NavigationRequest, Navigator};
pub use pipeline::{
    Effect, FloatingPipeline, PipelineEvent, PipelineView, PreferenceUpdate, ShownVia, UserAction,
    VisibleNotification,
};
pub use preferences::{
    DeliveryDecode, DeliveryMethods, PreferenceLoader, PreferenceService, PreferenceSet,
    ResolvedPreferences,
};
pub use runtime::{EffectExecutor, PipelineRuntime, RuntimeHandle};
pub use sound::{CommandSoundPlayer, NoopSoundPlayer, SoundGate, SoundPlayer};
pub use store::{DeliveryAction, DeliveryLog, DeliveryRecord};
