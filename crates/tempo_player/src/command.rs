//! 播放状态与通知定义

use crate::Track;

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// 没有加载任何曲目
    #[default]
    Idle,
    /// 已加载，尚未播放
    Loaded,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// 是否处于活动播放（播放或暂停）
    pub fn is_active(self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }
}

/// 播放通知（引擎 -> 表现层）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PlaybackStarted,
    PlaybackPaused,
    PlaybackStopped,
    /// 播放进度更新（毫秒）
    PositionChanged(u64),
    /// 曲目自然播放结束，每次完整播放只发一次
    PlaybackFinished,
    /// 后端在播放过程中报告的错误
    PlaybackError(String),
}

/// 引擎状态快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub state: PlaybackState,
    pub track: Option<Track>,
    pub position_ms: u64,
    pub paused_position_ms: u64,
    pub duration_ms: u64,
    /// 时长是否由文件大小估算得出
    pub duration_estimated: bool,
    pub volume: u8,
}

/// 把毫秒格式化为 `MM:SS`
pub fn format_time(ms: u64) -> String {
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    format!("{:02}:{:02}", minutes, seconds)
}
