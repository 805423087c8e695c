//! 提示音门控
//!
//! 准入或晋升时，若用户开启提示音且该类型配置了声音，则播放一次提示音。
//! 播放是尽力而为：任何错误只记录日志，不向上传播。

use anyhow::Result;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

use super::kind::NotificationType;

/// 音频播放能力（单例音频句柄的抽象）
pub trait SoundPlayer: Send + Sync {
    /// 播放位置归零
    fn rewind(&self) -> Result<()>;

    /// 播放（不等待结束）
    fn play(&self) -> Result<()>;
}

/// 静音实现
#[derive(Debug, Default, Clone)]
pub struct NoopSoundPlayer;

impl SoundPlayer for NoopSoundPlayer {
    fn rewind(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self) -> Result<()> {
        Ok(())
    }
}

/// 调用外部播放命令（如 `paplay /usr/share/sounds/notify.oga`）
///
/// 每次播放启动一个新进程，相当于从头播放，`rewind` 无需操作
pub struct CommandSoundPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandSoundPlayer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// 解析 `"paplay /path/to/sound.oga"` 形式的命令行
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts.map(str::to_string).collect()))
    }
}

impl SoundPlayer for CommandSoundPlayer {
    fn rewind(&self) -> Result<()> {
        Ok(())
    }

    fn play(&self) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // 不阻塞调用方，由后台线程回收子进程
        let program = self.program.clone();
        thread::Builder::new()
            .name("floatn-sound-reaper".to_string())
            .spawn(move || match child.wait() {
                Ok(status) if !status.success() => {
                    debug!(program = %program, %status, "Sound command exited with failure");
                }
                Ok(_) => {}
                Err(e) => warn!(program = %program, error = %e, "Failed to wait for sound command"),
            })?;
        Ok(())
    }
}

/// 提示音门控
#[derive(Clone)]
pub struct SoundGate {
    player: Arc<dyn SoundPlayer>,
}

impl SoundGate {
    pub fn new(player: Arc<dyn SoundPlayer>) -> Self {
        Self { player }
    }

    /// 门控条件：用户开启提示音且该类型配置了声音
    pub fn should_play(sound_enabled: bool, kind: &NotificationType) -> bool {
        sound_enabled && kind.config().sound
    }

    /// 播放提示音，返回是否成功
    pub fn ring(&self, id: &str, kind: &NotificationType) -> bool {
        let result = self.player.rewind().and_then(|_| self.player.play());
        match result {
            Ok(()) => {
                debug!(id = %id, kind = %kind, "Notification sound played");
                true
            }
            Err(e) => {
                warn!(id = %id, kind = %kind, error = %e, "Notification sound failed");
                false
            }
        }
    }
}

impl Default for SoundGate {
    fn default() -> Self {
        Self::new(Arc::new(NoopSoundPlayer))
    }
}
