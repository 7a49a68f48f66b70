//! 静默后端
//!
//! 没有可用音频设备时的降级选择：不出声，进度完全由引擎的挂钟推算。

use tempo_player::{
    Backend, BackendError, BackendEvent, Capabilities, EventSink, MediaStream, OpenRequest,
};
use tracing::debug;

use crate::AudioDecoder;

const SILENT_CAPABILITIES: Capabilities = Capabilities {
    seek: true,
    volume: false,
    duration: true,
    video: false,
    reports_time: false,
};

/// 静默后端
#[derive(Debug, Default)]
pub struct SilentBackend;

impl SilentBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SilentBackend {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn MediaStream>, BackendError> {
        // 只用解码器读时长，读不出来就交给引擎估算
        let duration = match AudioDecoder::open(&request.path, 0) {
            Ok(decoder) => decoder.duration_ms(),
            Err(e) => {
                debug!("No duration for {}: {}", request.path.display(), e);
                None
            }
        };

        Ok(Box::new(SilentStream {
            events: request.events,
            duration,
        }))
    }
}

struct SilentStream {
    events: EventSink,
    duration: Option<u64>,
}

impl MediaStream for SilentStream {
    fn capabilities(&self) -> Capabilities {
        SILENT_CAPABILITIES
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.events.emit(BackendEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.events.emit(BackendEvent::Paused);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn seek(&mut self, _position_ms: u64) -> Result<(), BackendError> {
        Ok(())
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempo_player::{
        Engine, ManualClock, Notification, PlaybackState, PlayerConfig, RecordingListener, Track,
    };

    use crate::testutil::write_wav;

    fn engine() -> (Arc<Engine>, Arc<ManualClock>, Arc<RecordingListener>) {
        let clock = Arc::new(ManualClock::new());
        let engine = Arc::new(Engine::with_clock(
            Box::new(SilentBackend::new()),
            PlayerConfig::default(),
            clock.clone(),
        ));
        let recorder = RecordingListener::new();
        engine.add_listener(recorder.clone());
        (engine, clock, recorder)
    }

    #[test]
    fn test_reads_real_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8_000, 16_000);

        let (engine, _, _) = engine();
        engine.load(Track::new(path)).unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.duration_ms, 2_000);
        assert!(!snapshot.duration_estimated);
    }

    #[test]
    fn test_undecodable_file_uses_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.mp3");
        std::fs::write(&path, vec![0u8; 16_000]).unwrap();

        let (engine, _, _) = engine();
        engine.load(Track::new(path)).unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.duration_ms, 1_000);
        assert!(snapshot.duration_estimated);
    }

    #[test]
    fn test_clock_driven_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8_000, 16_000);

        let (engine, clock, recorder) = engine();
        engine.load(Track::new(path)).unwrap();
        engine.play().unwrap();
        engine.seek_to(1_500).unwrap();

        clock.advance(600);
        engine.tick();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        assert_eq!(recorder.count(&Notification::PlaybackFinished), 1);
    }
}
