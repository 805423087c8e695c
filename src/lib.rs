//! Floating Notify - 浮动通知投递管线（准入、溢出队列、去重、偏好门控）

pub mod cli;
pub mod config;
pub mod notification;

pub use config::PipelineConfig;
pub use notification::{
    DedupLedger, Effect, FloatingPipeline, Notification, NotificationType, PipelineEvent,
    PipelineRuntime, PipelineView, PreferenceSet, PreferenceUpdate, RuntimeHandle, UserAction,
};
