//! 顺序解码后端
//!
//! 只能从头往后读：不支持 seek、音量和时长查询。跳转由引擎按字节偏移重新打开来模拟，
//! 数据读完时只报告 `Stopped`，是否算自然结束由引擎判断。

use tempo_player::{
    Backend, BackendError, BackendEvent, Capabilities, MediaStream, OpenRequest,
};
use tracing::debug;

use crate::worker::{Control, Worker, WorkerOptions};
use crate::AudioDecoder;

/// 顺序解码后端
#[derive(Debug, Default)]
pub struct StreamBackend;

impl StreamBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for StreamBackend {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn MediaStream>, BackendError> {
        let decoder = AudioDecoder::open(&request.path, request.skip_bytes)
            .map_err(|e| BackendError::Open(e.to_string()))?;
        debug!(
            "Opened {} for sequential decode ({}, skip {} bytes)",
            request.path.display(),
            decoder.info.codec,
            request.skip_bytes
        );

        let worker = Worker::spawn(
            decoder,
            request.events,
            WorkerOptions {
                report_time: false,
                end_events: vec![BackendEvent::Stopped],
                volume: 100,
            },
        );
        Ok(Box::new(SequentialStream { worker }))
    }
}

struct SequentialStream {
    worker: Worker,
}

impl MediaStream for SequentialStream {
    fn capabilities(&self) -> Capabilities {
        Capabilities::SEQUENTIAL
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Play)
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Pause)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Pause)
    }

    fn close(&mut self) {
        self.worker.shutdown();
    }
}
