//! tempo_player - 播放控制与进度同步引擎
//!
//! 持有播放状态机，驱动后台进度同步，在不支持原生 seek 的后端上做模拟，
//! 并把后端事件转换为确定性的播放列表推进决策。

mod backend;
mod clock;
mod command;
mod config;
mod engine;
mod error;
mod listener;
mod playlist;
mod sync;
mod track;

pub use backend::*;
pub use clock::*;
pub use command::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use listener::*;
pub use playlist::*;
pub use sync::*;
pub use track::*;
