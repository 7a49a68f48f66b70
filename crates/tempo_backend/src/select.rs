//! 后端选择与降级

use tempo_player::{Backend, BackendError};
use tracing::{info, warn};

use crate::{probe_output_device, DecodeBackend, SilentBackend, StreamBackend};

/// 请求的后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// 原生 seek / 音量 / 时长
    #[default]
    Full,
    /// 顺序解码，引擎模拟 seek
    Simple,
}

/// 选择结果
pub struct BackendSelection {
    pub backend: Box<dyn Backend>,
    /// 请求的后端不可用时的原因，已降级为静默后端
    pub unavailable: Option<BackendError>,
}

/// 按请求创建后端。没有音频设备时降级为 [`SilentBackend`]，不会失败。
pub fn select_backend(kind: BackendKind) -> BackendSelection {
    match probe_output_device() {
        Ok(device) => {
            info!("Using output device: {}", device);
            let backend: Box<dyn Backend> = match kind {
                BackendKind::Full => Box::new(DecodeBackend::new(device)),
                BackendKind::Simple => Box::new(StreamBackend::new()),
            };
            BackendSelection {
                backend,
                unavailable: None,
            }
        }
        Err(e) => {
            let reason = BackendError::Unavailable(e.to_string());
            warn!("{}; falling back to silent playback", reason);
            BackendSelection {
                backend: Box::new(SilentBackend::new()),
                unavailable: Some(reason),
            }
        }
    }
}
