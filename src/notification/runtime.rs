//! 管线运行时 - 驱动 `FloatingPipeline` 并执行副作用
//!
//! 单个 tokio 任务串行处理三类输入：外部事件（快照 / 用户操作）、偏好加载结果、账本裁剪定时器。
//! 所有 `RuntimeHandle` 被 drop 后循环退出，裁剪定时器随之释放。

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;

use super::model::Notification;
use super::navigation::Navigator;
use super::pipeline::{Effect, FloatingPipeline, PipelineEvent, PipelineView, PreferenceUpdate, UserAction};
use super::preferences::PreferenceService;
use super::sound::SoundGate;
use super::store::{DeliveryLog, DeliveryRecord};

/// 裁剪间隔下限，`interval` 不接受零周期
const MIN_TRIM_INTERVAL: Duration = Duration::from_millis(1);

/// 同步副作用执行器（提示音、导航、投递记录）
///
/// `FetchPreferences` 需要异步执行，不在这里处理
pub struct EffectExecutor {
    sound: SoundGate,
    navigator: Arc<dyn Navigator>,
    delivery_log: Option<Arc<DeliveryLog>>,
}

impl EffectExecutor {
    pub fn new(sound: SoundGate, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            sound,
            navigator,
            delivery_log: None,
        }
    }

    /// 启用投递记录
    pub fn with_delivery_log(mut self, log: Arc<DeliveryLog>) -> Self {
        self.delivery_log = Some(log);
        self
    }

    /// 执行副作用；返回 `false` 表示该副作用需要调用方处理
    pub fn execute(&self, effect: &Effect) -> bool {
        if let Some(log) = &self.delivery_log {
            if let Some(record) = DeliveryRecord::from_effect(effect) {
                if let Err(e) = log.append(&record) {
                    warn!(error = %e, path = %log.path().display(), "Failed to append delivery record");
                }
            }
        }

        match effect {
            Effect::Displayed { .. } => true,
            Effect::PlaySound { id, kind } => {
                self.sound.ring(id, kind);
                true
            }
            Effect::Navigate(request) => {
                if let Err(e) = self.navigator.navigate(request) {
                    warn!(route = %request.route, error = %e, "Navigation failed");
                }
                true
            }
            Effect::FetchPreferences => false,
        }
    }
}

/// 运行时句柄：向管线发送事件、订阅视图
#[derive(Clone)]
pub struct RuntimeHandle {
    events: mpsc::UnboundedSender<PipelineEvent>,
    view: watch::Receiver<PipelineView>,
}

impl RuntimeHandle {
    /// 发送事件；运行时已退出时返回 `false`
    pub fn send(&self, event: PipelineEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn snapshot(&self, notifications: Vec<Notification>) -> bool {
        self.send(PipelineEvent::ArrivalSnapshot(notifications))
    }

    pub fn close(&self, id: impl Into<String>) -> bool {
        self.send(PipelineEvent::UserAction(UserAction::Close { id: id.into() }))
    }

    pub fn click(&self, id: impl Into<String>) -> bool {
        self.send(PipelineEvent::UserAction(UserAction::Click { id: id.into() }))
    }

    pub fn clear_all(&self) -> bool {
        self.send(PipelineEvent::UserAction(UserAction::ClearAll))
    }

    /// 订阅视图变化
    pub fn subscribe(&self) -> watch::Receiver<PipelineView> {
        self.view.clone()
    }

    /// 当前视图
    pub fn view(&self) -> PipelineView {
        self.view.borrow().clone()
    }
}

/// 管线运行时
pub struct PipelineRuntime {
    pipeline: FloatingPipeline,
    executor: EffectExecutor,
    preference_service: Arc<dyn PreferenceService>,
    trim_interval: Duration,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    feedback_tx: mpsc::UnboundedSender<PipelineEvent>,
    feedback_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    view_tx: watch::Sender<PipelineView>,
}

impl PipelineRuntime {
    /// 创建运行时和对应的句柄
    pub fn new(
        config: &PipelineConfig,
        executor: EffectExecutor,
        preference_service: Arc<dyn PreferenceService>,
    ) -> (Self, RuntimeHandle) {
        let pipeline = FloatingPipeline::new(config);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(pipeline.view());

        let runtime = Self {
            pipeline,
            executor,
            preference_service,
            trim_interval: config.trim_interval().max(MIN_TRIM_INTERVAL),
            events_rx,
            feedback_tx,
            feedback_rx,
            view_tx,
        };
        let handle = RuntimeHandle {
            events: events_tx,
            view: view_rx,
        };
        (runtime, handle)
    }

    /// 覆盖裁剪间隔
    pub fn with_trim_interval(mut self, trim_interval: Duration) -> Self {
        self.trim_interval = trim_interval.max(MIN_TRIM_INTERVAL);
        self
    }

    /// 运行直到所有句柄被 drop，返回最终的管线状态
    pub async fn run(mut self) -> FloatingPipeline {
        info!(trim_interval_secs = self.trim_interval.as_secs(), "Floating notification runtime started");

        // 裁剪定时器归本 future 所有，退出即释放
        let mut trim = interval_at(Instant::now() + self.trim_interval, self.trim_interval);
        trim.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let effects = self.pipeline.mount();
        self.dispatch(effects);

        loop {
            tokio::select! {
                event = self.events_rx.recv() => match event {
                    Some(event) => self.process(event),
                    None => break,
                },
                Some(event) = self.feedback_rx.recv() => self.process(event),
                _ = trim.tick() => self.process(PipelineEvent::TrimTick),
            }
        }

        info!("Floating notification runtime stopped");
        self.pipeline
    }

    fn process(&mut self, event: PipelineEvent) {
        let effects = self.pipeline.apply(event);
        self.dispatch(effects);

        let view = self.pipeline.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            if !self.executor.execute(&effect) {
                self.spawn_fetch();
            }
        }
    }

    /// 在阻塞线程池中加载偏好，结果作为事件送回
    fn spawn_fetch(&self) {
        let service = self.preference_service.clone();
        let feedback = self.feedback_tx.clone();

        tokio::spawn(async move {
            let update = match tokio::task::spawn_blocking(move || service.fetch()).await {
                Ok(Ok(preferences)) => PreferenceUpdate::Loaded { preferences },
                Ok(Err(e)) => PreferenceUpdate::Failed { error: e.to_string() },
                Err(e) => PreferenceUpdate::Failed {
                    error: format!("preference fetch task failed: {}", e),
                },
            };
            debug!(?update, "Preference fetch finished");
            let _ = feedback.send(PipelineEvent::PreferenceUpdate(update));
        });
    }
}
