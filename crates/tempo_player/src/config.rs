//! 引擎配置

use std::time::Duration;

use serde::Deserialize;

/// 默认假定码率（128 kbit/s）
pub const DEFAULT_BITRATE_BPS: u32 = 128_000;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// 进度同步间隔（毫秒）
    pub tick_interval_ms: u64,
    /// 估算时长和模拟 seek 时假定的码率
    pub assumed_bitrate_bps: u32,
    /// 后端自行停止时，播放进度达到该比例即视为自然结束
    pub completion_threshold: f32,
    /// 初始音量 (0 - 100)
    pub initial_volume: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            assumed_bitrate_bps: DEFAULT_BITRATE_BPS,
            completion_threshold: 0.95,
            initial_volume: 80,
        }
    }
}

impl PlayerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// 修正越界取值
    pub fn normalized(mut self) -> Self {
        if !(self.completion_threshold > 0.0 && self.completion_threshold <= 1.0) {
            self.completion_threshold = Self::default().completion_threshold;
        }
        if self.assumed_bitrate_bps == 0 {
            self.assumed_bitrate_bps = DEFAULT_BITRATE_BPS;
        }
        self.tick_interval_ms = self.tick_interval_ms.max(1);
        self.initial_volume = self.initial_volume.min(100);
        self
    }
}

/// 按假定码率从字节数估算时长
pub fn estimate_duration_ms(byte_len: u64, bitrate_bps: u32) -> u64 {
    if bitrate_bps == 0 {
        return 0;
    }
    let ms = byte_len as u128 * 8 * 1000 / bitrate_bps as u128;
    ms.min(u64::MAX as u128) as u64
}

/// 模拟 seek 时需要跳过的字节数
pub fn seek_offset_bytes(position_ms: u64, bitrate_bps: u32) -> u64 {
    let bytes = position_ms as u128 * bitrate_bps as u128 / 8 / 1000;
    bytes.min(u64::MAX as u128) as u64
}
