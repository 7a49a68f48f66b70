//! tempo_backend - 播放后端
//!
//! 基于 symphonia 解码、cpal 输出的后端实现，以及没有音频设备时的静默降级。

mod decoder;
mod native;
mod output;
mod select;
mod sequential;
mod silent;
mod source;
mod worker;

pub use decoder::*;
pub use native::*;
pub use output::*;
pub use select::*;
pub use sequential::*;
pub use silent::*;
pub use source::*;
