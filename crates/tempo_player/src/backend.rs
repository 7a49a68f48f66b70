//! 解码/渲染后端能力契约
//!
//! 引擎只依赖这里的 trait。两类后端的能力差异通过 [`Capabilities`] 表达，
//! 每个会话打开时查询一次，引擎据此选择原生实现或模拟实现。

use std::path::PathBuf;

use crossbeam_channel::Sender;
use tracing::debug;

use crate::BackendError;

/// 流能力集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// 原生 seek
    pub seek: bool,
    /// 原生音量
    pub volume: bool,
    /// 能报告总时长
    pub duration: bool,
    /// 支持挂载视频输出
    pub video: bool,
    /// `TimeAdvanced` 事件给出的是真实播放时间
    pub reports_time: bool,
}

impl Capabilities {
    /// 顺序解码流：什么都不支持
    pub const SEQUENTIAL: Self = Self {
        seek: false,
        volume: false,
        duration: false,
        video: false,
        reports_time: false,
    };

    /// 完整解码渲染后端（音频部分）
    pub const NATIVE_AUDIO: Self = Self {
        seek: true,
        volume: true,
        duration: true,
        video: false,
        reports_time: true,
    };
}

/// 后端生命周期事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    Playing,
    Paused,
    Stopped,
    TimeAdvanced(u64),
    Finished,
    Error(String),
}

/// 带流编号的后端事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub stream_id: u64,
    pub event: BackendEvent,
}

/// 后端事件出口
///
/// 后端可以在任意线程上调用 [`EventSink::emit`]，事件会在下一次同步 tick 时处理。
#[derive(Debug, Clone)]
pub struct EventSink {
    stream_id: u64,
    tx: Sender<StreamEvent>,
}

impl EventSink {
    pub fn new(stream_id: u64, tx: Sender<StreamEvent>) -> Self {
        Self { stream_id, tx }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn emit(&self, event: BackendEvent) {
        let event = StreamEvent {
            stream_id: self.stream_id,
            event,
        };
        if let Err(err) = self.tx.send(event) {
            debug!(
                "Engine gone, dropping {:?} from stream #{}",
                err.0.event, self.stream_id
            );
        }
    }
}

/// 打开流的请求
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub path: PathBuf,
    /// 从文件开头跳过的字节数（seek 模拟）
    pub skip_bytes: u64,
    pub events: EventSink,
}

/// 视频输出表面（原生窗口句柄）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoSurface(pub u64);

/// 一个打开的媒体流
pub trait MediaStream: Send {
    fn capabilities(&self) -> Capabilities;

    fn play(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self) -> Result<(), BackendError>;

    fn stop(&mut self) -> Result<(), BackendError>;

    /// 释放流持有的资源，之后流会被丢弃
    fn close(&mut self) {}

    fn seek(&mut self, _position_ms: u64) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("seek"))
    }

    /// 不支持音量的流静默忽略
    fn set_volume(&mut self, _volume: u8) {}

    fn duration_ms(&self) -> Option<u64> {
        None
    }

    fn attach_video_surface(&mut self, _surface: VideoSurface) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("video surface"))
    }
}

/// 解码/渲染后端
pub trait Backend: Send {
    fn name(&self) -> &'static str;

    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn MediaStream>, BackendError>;

    /// 释放全局资源（工厂、设备句柄），关闭时调用一次
    fn release(&mut self) {}
}
