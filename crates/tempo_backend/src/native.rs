//! 完整解码后端
//!
//! 原生支持 seek、音量和时长，播放中定期上报位置，读完时报告 `Finished`。

use tempo_player::{
    Backend, BackendError, BackendEvent, Capabilities, MediaStream, OpenRequest,
};
use tracing::{debug, info};

use crate::worker::{Control, Worker, WorkerOptions};
use crate::AudioDecoder;

/// 完整解码后端
#[derive(Debug)]
pub struct DecodeBackend {
    device: String,
}

impl DecodeBackend {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl Backend for DecodeBackend {
    fn name(&self) -> &'static str {
        "decode"
    }

    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn MediaStream>, BackendError> {
        let decoder = AudioDecoder::open(&request.path, request.skip_bytes)
            .map_err(|e| BackendError::Open(e.to_string()))?;
        let duration = decoder.duration_ms();
        debug!(
            "Opened {} ({}, {} Hz, {} ch)",
            request.path.display(),
            decoder.info.codec,
            decoder.info.sample_rate,
            decoder.info.channels
        );

        let worker = Worker::spawn(
            decoder,
            request.events,
            WorkerOptions {
                report_time: true,
                end_events: vec![BackendEvent::Finished],
                volume: 100,
            },
        );
        Ok(Box::new(NativeStream { worker, duration }))
    }

    fn release(&mut self) {
        info!("Released output device {}", self.device);
    }
}

struct NativeStream {
    worker: Worker,
    duration: Option<u64>,
}

impl MediaStream for NativeStream {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NATIVE_AUDIO
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Play)
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Pause)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.worker.send(Control::Pause)?;
        self.worker.send(Control::Seek(0))
    }

    fn close(&mut self) {
        self.worker.shutdown();
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), BackendError> {
        self.worker.send(Control::Seek(position_ms))
    }

    fn set_volume(&mut self, volume: u8) {
        if self.worker.send(Control::Volume(volume)).is_err() {
            debug!("Volume change dropped: decode thread has exited");
        }
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration
    }
}
