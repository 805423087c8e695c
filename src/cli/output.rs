//! Output formatting and console capabilities for CLI commands

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::notification::{CommandSoundPlayer, NavigationRequest, Navigator, PipelineView, SoundGate};

/// Format output as pretty JSON
pub fn format_output<T: Serialize>(data: &T, compact: bool) -> String {
    let result = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    result.unwrap_or_else(|_| "{}".to_string())
}

/// Render the view as the stacked card list plus the "+N more" indicator
pub fn render_view(view: &PipelineView) -> String {
    if !view.enabled {
        return "  (floating notifications disabled)".to_string();
    }
    if view.visible.is_empty() {
        return "  (no floating notifications)".to_string();
    }

    let mut lines: Vec<String> = view
        .visible
        .iter()
        .map(|n| {
            format!(
                "  [{}] {} {} {}",
                n.priority,
                n.id,
                n.kind,
                n.message.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        })
        .collect();
    if let Some(label) = view.overflow_label() {
        lines.push(format!("  {}", label));
    }
    lines.join("\n")
}

/// Router stand-in that prints navigation requests
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, request: &NavigationRequest) -> Result<()> {
        info!(id = %request.id, route = %request.route, "Navigate");
        println!("→ navigate {} ({})", request.route, request.kind);
        Ok(())
    }
}

/// Build the sound gate from `sound_command`, silent when unset
pub fn build_sound_gate(config: &PipelineConfig) -> SoundGate {
    match config.sound_command.as_deref().map(CommandSoundPlayer::from_command_line) {
        Some(Some(player)) => SoundGate::new(Arc::new(player)),
        Some(None) => {
            warn!("Empty sound_command, notification sound disabled");
            SoundGate::default()
        }
        None => SoundGate::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{Notification, VisibleNotification};

    #[test]
    fn test_render_view_with_overflow() {
        let n = Notification::new("n-1", "budget_exceeded").with_message("Over budget");
        let view = PipelineView {
            enabled: true,
            visible: vec![VisibleNotification::from(&n)],
            queued: 3,
        };
        let out = render_view(&view);
        assert!(out.contains("[HIGH] n-1 budget_exceeded Over budget"));
        assert!(out.contains("+3 more"));
    }

    #[test]
    fn test_render_disabled_view() {
        let out = render_view(&PipelineView::default());
        assert!(out.contains("disabled"));
    }

    #[test]
    fn test_format_output_compact() {
        let out = format_output(&serde_json::json!({"a": 1}), true);
        assert_eq!(out, r#"{"a":1}"#);
    }
}
