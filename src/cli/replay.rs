// src/cli/replay.rs
//! Replay 命令 - 按脚本逐条回放管线事件
//!
//! 脚本为 JSONL，每行一个 `PipelineEvent`，例如：
//! ```text
//! {"event":"preference_update","data":{"status":"loaded","preferences":{"masterEnabled":true}}}
//! {"event":"arrival_snapshot","data":[]}
//! {"event":"arrival_snapshot","data":[{"id":"n-1","type":"chat_message"}]}
//! {"event":"user_action","data":{"action":"click","id":"n-1"}}
//! ```
//! 回放不启动定时器，`trim_tick` 需要写在脚本里。

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::notification::{
    DeliveryLog, Effect, EffectExecutor, FloatingPipeline, PipelineEvent, PipelineView,
};

use super::output::{build_sound_gate, format_output, render_view, PrintNavigator};

/// Replay 命令参数
#[derive(Args)]
pub struct ReplayArgs {
    /// 事件脚本（JSONL）
    pub script: PathBuf,

    /// 输出 JSON 格式（每步一行）
    #[arg(long)]
    pub json: bool,

    /// 写入投递记录
    #[arg(long)]
    pub log: bool,
}

/// 单步输出
#[derive(Debug, Serialize)]
pub struct ReplayStep {
    pub step: usize,
    pub event: PipelineEvent,
    pub effects: Vec<Effect>,
    pub view: PipelineView,
}

/// 解析脚本，空行和 `#` 开头的行忽略
pub fn parse_script(content: &str) -> Result<Vec<PipelineEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid event on line {}", i + 1))
        })
        .collect()
}

/// 回放事件，返回每一步的结果
pub fn replay_events(
    config: &PipelineConfig,
    events: Vec<PipelineEvent>,
    executor: &EffectExecutor,
) -> Vec<ReplayStep> {
    let mut pipeline = FloatingPipeline::new(config);
    // 脚本自己提供偏好，挂载时的请求不执行
    let _ = pipeline.mount();

    events
        .into_iter()
        .enumerate()
        .map(|(i, event)| {
            let effects = pipeline.apply(event.clone());
            for effect in &effects {
                executor.execute(effect);
            }
            ReplayStep {
                step: i + 1,
                event,
                effects,
                view: pipeline.view(),
            }
        })
        .collect()
}

/// 处理 replay 命令
pub fn handle_replay(args: ReplayArgs) -> Result<()> {
    let config = PipelineConfig::load()?;
    let content = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let events = parse_script(&content)?;

    let mut executor = EffectExecutor::new(build_sound_gate(&config), Arc::new(PrintNavigator));
    if args.log {
        executor = executor.with_delivery_log(Arc::new(DeliveryLog::default()));
    }

    for step in replay_events(&config, events, &executor) {
        if args.json {
            println!("{}", serde_json::to_string(&step)?);
        } else {
            println!("── step {} ──", step.step);
            for effect in &step.effects {
                println!("  effect: {}", format_output(effect, true));
            }
            println!("{}", render_view(&step.view));
        }
    }

    Ok(())
}
