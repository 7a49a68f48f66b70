//! 测试用脚本化后端
#![allow(dead_code)]

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::TempDir;
use tempo_player::{
    Backend, BackendError, BackendEvent, Capabilities, Engine, EventSink, ManualClock,
    MediaStream, OpenRequest, PlayerConfig, RecordingListener, Track, VideoSurface,
};

/// 后端调用记录
#[derive(Default)]
pub struct MockLog {
    pub opens: Vec<(PathBuf, u64)>,
    pub sinks: Vec<EventSink>,
    pub live: usize,
    pub max_live: usize,
    pub calls: Vec<String>,
    pub volumes: Vec<u8>,
    pub seeks: Vec<u64>,
    pub surfaces: Vec<VideoSurface>,
    pub released: usize,
    pub fail_open: bool,
    pub fail_play: bool,
}

pub type SharedLog = Arc<Mutex<MockLog>>;

pub struct MockBackend {
    caps: Capabilities,
    duration: Option<u64>,
    log: SharedLog,
}

impl MockBackend {
    pub fn new(caps: Capabilities, duration: Option<u64>, log: SharedLog) -> Self {
        Self { caps, duration, log }
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, request: OpenRequest) -> Result<Box<dyn MediaStream>, BackendError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_open {
            return Err(BackendError::Open("scripted failure".into()));
        }
        log.opens.push((request.path.clone(), request.skip_bytes));
        log.sinks.push(request.events.clone());
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        drop(log);

        Ok(Box::new(MockStream {
            caps: self.caps,
            duration: self.duration,
            log: self.log.clone(),
        }))
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released += 1;
    }
}

struct MockStream {
    caps: Capabilities,
    duration: Option<u64>,
    log: SharedLog,
}

impl MockStream {
    fn record(&self, call: &str) {
        self.log.lock().unwrap().calls.push(call.to_string());
    }
}

impl MediaStream for MockStream {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.record("play");
        if self.log.lock().unwrap().fail_play {
            return Err(BackendError::Stream("device lost".into()));
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.record("pause");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.record("stop");
        Ok(())
    }

    fn close(&mut self) {
        self.record("close");
    }

    fn seek(&mut self, position_ms: u64) -> Result<(), BackendError> {
        if !self.caps.seek {
            return Err(BackendError::Unsupported("seek"));
        }
        self.log.lock().unwrap().seeks.push(position_ms);
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        if self.caps.volume {
            self.log.lock().unwrap().volumes.push(volume);
        }
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration
    }

    fn attach_video_surface(&mut self, surface: VideoSurface) -> Result<(), BackendError> {
        if !self.caps.video {
            return Err(BackendError::Unsupported("video surface"));
        }
        self.log.lock().unwrap().surfaces.push(surface);
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.log.lock().unwrap().live -= 1;
    }
}

/// 引擎 + 手动时钟 + 记录监听器
pub struct Harness {
    pub engine: Arc<Engine>,
    pub clock: Arc<ManualClock>,
    pub log: SharedLog,
    pub recorder: Arc<RecordingListener>,
    pub dir: TempDir,
}

impl Harness {
    /// 顺序流后端（无 seek / 音量 / 时长）
    pub fn sequential() -> Self {
        Self::with_caps(Capabilities::SEQUENTIAL, None)
    }

    pub fn with_caps(caps: Capabilities, duration: Option<u64>) -> Self {
        Self::with_config(caps, duration, PlayerConfig::default())
    }

    pub fn with_config(caps: Capabilities, duration: Option<u64>, config: PlayerConfig) -> Self {
        let log = SharedLog::default();
        let clock = Arc::new(ManualClock::new());
        let backend = MockBackend::new(caps, duration, log.clone());
        let engine = Arc::new(Engine::with_clock(Box::new(backend), config, clock.clone()));
        let recorder = RecordingListener::new();
        engine.add_listener(recorder.clone());

        Self {
            engine,
            clock,
            log,
            recorder,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// 在临时目录里创建指定大小的文件
    pub fn file(&self, name: &str, len: u64) -> Track {
        let path = self.dir.path().join(name);
        File::create(&path).unwrap().set_len(len).unwrap();
        Track::new(path)
    }

    /// 推进时钟并执行一次同步
    pub fn advance(&self, ms: u64) {
        self.clock.advance(ms);
        self.engine.tick();
    }

    /// 从最近打开的流发出后端事件
    pub fn emit(&self, event: BackendEvent) {
        let sink = self.log().sinks.last().cloned().expect("no stream opened");
        sink.emit(event);
    }

    pub fn log(&self) -> MutexGuard<'_, MockLog> {
        self.log.lock().unwrap()
    }
}

/// 128 kbit/s 下 `ms` 毫秒对应的字节数
pub fn bytes_for_ms(ms: u64) -> u64 {
    ms * 16
}
