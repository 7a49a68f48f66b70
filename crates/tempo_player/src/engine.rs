//! 播放引擎
//!
//! 命令在调用者线程上同步执行；会话的可变字段由一把互斥锁保护，
//! 与同步线程的 tick 互斥。通知在释放锁之后投递，监听器可以回调引擎。

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::{
    estimate_duration_ms, seek_offset_bytes, Backend, BackendError, BackendEvent, Capabilities,
    Clock, EngineSnapshot, EventSink, LoadError, MediaStream, Notification, OpenRequest,
    PlaybackListener, PlaybackState, PlayerConfig, PlayerError, Listeners, StreamEvent,
    Synchronizer, SystemClock, Track, VideoSurface,
};

/// 播放引擎句柄（引擎 + 后台进度同步）
pub struct PlayerHandle {
    engine: Arc<Engine>,
    sync: Synchronizer,
    shut_down: AtomicBool,
}

/// 创建引擎并启动进度同步线程
pub fn spawn_player(backend: Box<dyn Backend>, config: PlayerConfig) -> PlayerHandle {
    let engine = Arc::new(Engine::new(backend, config));
    let sync = Synchronizer::spawn(engine.clone());
    PlayerHandle {
        engine,
        sync,
        shut_down: AtomicBool::new(false),
    }
}

impl PlayerHandle {
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    /// 先停同步线程，再释放后端全局资源。重复调用无效果。
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sync.stop();
        self.engine.release_backend();
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 播放引擎
pub struct Engine {
    core: Mutex<Core>,
    listeners: Listeners,
    events_tx: Sender<StreamEvent>,
    events_rx: Receiver<StreamEvent>,
    clock: Arc<dyn Clock>,
    config: PlayerConfig,
    backend_name: &'static str,
}

impl Engine {
    pub fn new(backend: Box<dyn Backend>, config: PlayerConfig) -> Self {
        Self::with_clock(backend, config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(
        backend: Box<dyn Backend>,
        config: PlayerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config.normalized();
        let (events_tx, events_rx) = unbounded();
        let backend_name = backend.name();
        info!("Playback engine using backend: {}", backend_name);

        Self {
            core: Mutex::new(Core::new(backend, config.initial_volume)),
            listeners: Listeners::new(),
            events_tx,
            events_rx,
            clock,
            config,
            backend_name,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn add_listener(&self, listener: Arc<dyn PlaybackListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PlaybackListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// 注册视频输出表面；当前若是视频会话会立即挂载
    pub fn set_video_surface(&self, surface: Option<VideoSurface>) {
        self.lock().set_video_surface(surface);
    }

    /// 加载曲目。先拆除旧会话，失败时引擎处于 `Idle`。
    pub fn load(&self, track: Track) -> Result<(), LoadError> {
        let mut out = Vec::new();
        let result = {
            let mut core = self.lock();
            let ctx = self.ctx();
            core.load(track, &ctx, &mut out)
        };
        self.listeners.dispatch(&out);
        result
    }

    /// 拆除会话回到 `Idle`
    pub fn unload(&self) {
        let mut out = Vec::new();
        self.lock().teardown(&mut out);
        self.listeners.dispatch(&out);
    }

    pub fn play(&self) -> Result<(), PlayerError> {
        self.run(|core, ctx, out| core.play(ctx, out))
    }

    pub fn pause(&self) -> Result<(), PlayerError> {
        self.run(|core, ctx, out| core.pause(ctx, out))
    }

    pub fn stop(&self) {
        let mut out = Vec::new();
        self.lock().stop(&mut out);
        self.listeners.dispatch(&out);
    }

    /// 跳转；越界位置被钳制到 `[0, 总时长]`
    pub fn seek_to(&self, position_ms: i64) -> Result<(), PlayerError> {
        self.run(|core, ctx, out| core.seek_to(position_ms, ctx, out))
    }

    /// 设置音量，钳制到 0 - 100
    pub fn set_volume(&self, volume: i32) {
        let volume = volume.clamp(0, 100) as u8;
        self.lock().set_volume(volume);
    }

    /// 一次进度同步：处理积压的后端事件，然后对齐播放位置
    pub fn tick(&self) {
        let mut out = Vec::new();
        {
            let mut core = self.lock();
            let ctx = self.ctx();
            for event in self.events_rx.try_iter() {
                core.handle_backend_event(event, &ctx, &mut out);
            }
            core.reconcile(ctx.now_ms, self.config.completion_threshold, &mut out);
        }
        self.listeners.dispatch(&out);
    }

    /// 释放后端全局资源，只生效一次
    pub fn release_backend(&self) {
        let mut out = Vec::new();
        self.lock().release(&mut out);
        self.listeners.dispatch(&out);
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn position_ms(&self) -> u64 {
        self.lock()
            .session
            .as_ref()
            .map_or(0, |s| s.current_position_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        self.lock()
            .session
            .as_ref()
            .map_or(0, |s| s.total_duration_ms)
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().session.as_ref().map(|s| s.track.clone())
    }

    pub fn volume(&self) -> u8 {
        self.lock().volume
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let core = self.lock();
        let mut snapshot = EngineSnapshot {
            state: core.state,
            volume: core.volume,
            ..Default::default()
        };
        if let Some(session) = &core.session {
            snapshot.track = Some(session.track.clone());
            snapshot.position_ms = session.current_position_ms;
            snapshot.paused_position_ms = session.paused_position_ms;
            snapshot.duration_ms = session.total_duration_ms;
            snapshot.duration_estimated = session.duration_estimated;
        }
        snapshot
    }

    fn run(
        &self,
        op: impl FnOnce(&mut Core, &Ctx<'_>, &mut Vec<Notification>) -> Result<(), PlayerError>,
    ) -> Result<(), PlayerError> {
        let mut out = Vec::new();
        let result = {
            let mut core = self.lock();
            let ctx = self.ctx();
            op(&mut *core, &ctx, &mut out)
        };
        self.listeners.dispatch(&out);
        result
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ctx(&self) -> Ctx<'_> {
        Ctx {
            events: &self.events_tx,
            config: &self.config,
            now_ms: self.clock.now_ms(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release_backend();
    }
}

pub(crate) struct Ctx<'a> {
    events: &'a Sender<StreamEvent>,
    config: &'a PlayerConfig,
    pub(crate) now_ms: u64,
}

pub(crate) struct Core {
    backend: Box<dyn Backend>,
    pub(crate) state: PlaybackState,
    pub(crate) session: Option<Session>,
    volume: u8,
    surface: Option<VideoSurface>,
    next_stream_id: u64,
    released: bool,
}

pub(crate) struct Session {
    pub(crate) track: Track,
    byte_len: u64,
    stream: Option<ActiveStream>,
    /// 打开会话时查询一次
    caps: Capabilities,
    pub(crate) total_duration_ms: u64,
    duration_estimated: bool,
    pub(crate) current_position_ms: u64,
    pub(crate) paused_position_ms: u64,
    pub(crate) progress: Progress,
    /// 本次完整播放已经发过 `PlaybackFinished`
    pub(crate) finished: bool,
}

struct ActiveStream {
    id: u64,
    inner: Box<dyn MediaStream>,
}

/// 基于挂钟的进度跟踪
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    /// 最近一次 play/resume 时的时钟读数，暂停或停止时为 None
    pub(crate) anchor_ms: Option<u64>,
    /// 开始计时时的播放位置
    pub(crate) base_ms: u64,
    pub(crate) was_playing: bool,
    pub(crate) last_playing_ms: u64,
    /// 后端自行停止（不是用户停止），迟到的 `Finished` 仍然有效
    pub(crate) backend_stopped: bool,
}

impl Progress {
    fn start(&mut self, from_ms: u64, now_ms: u64) {
        self.anchor_ms = Some(now_ms);
        self.base_ms = from_ms;
        self.was_playing = true;
        self.last_playing_ms = from_ms;
        self.backend_stopped = false;
    }

    /// 冻结在给定位置
    fn freeze(&mut self, at_ms: u64) {
        self.anchor_ms = None;
        self.base_ms = at_ms;
    }

    pub(crate) fn position_at(&self, now_ms: u64) -> u64 {
        match self.anchor_ms {
            Some(anchor) => self.base_ms + now_ms.saturating_sub(anchor),
            None => self.base_ms,
        }
    }
}

impl Session {
    pub(crate) fn clamp_position(&self, ms: u64) -> u64 {
        if self.total_duration_ms > 0 {
            ms.min(self.total_duration_ms)
        } else {
            ms
        }
    }

    pub(crate) fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.inner.close();
            debug!("Closed stream #{} for {}", stream.id, self.track.display_name());
        }
    }

    fn reset_position(&mut self) {
        self.current_position_ms = 0;
        self.paused_position_ms = 0;
    }

    fn active_stream_id(&self) -> Option<u64> {
        self.stream.as_ref().map(|s| s.id)
    }
}

impl Core {
    fn new(backend: Box<dyn Backend>, volume: u8) -> Self {
        Self {
            backend,
            state: PlaybackState::Idle,
            session: None,
            volume,
            surface: None,
            next_stream_id: 1,
            released: false,
        }
    }

    fn allocate_stream_id(&mut self) -> u64 {
        let id = self.next_stream_id;
        self.next_stream_id += 1;
        id
    }

    fn load(
        &mut self,
        track: Track,
        ctx: &Ctx<'_>,
        out: &mut Vec<Notification>,
    ) -> Result<(), LoadError> {
        self.teardown(out);

        let path = track.path().to_path_buf();
        if self.released {
            return Err(LoadError::Rejected {
                path,
                source: BackendError::Unavailable("backend already released".into()),
            });
        }

        let byte_len = probe_file(&path)?;

        let stream_id = self.allocate_stream_id();
        let request = OpenRequest {
            path: path.clone(),
            skip_bytes: 0,
            events: EventSink::new(stream_id, ctx.events.clone()),
        };
        let mut stream = self
            .backend
            .open(request)
            .map_err(|source| LoadError::Rejected {
                path: path.clone(),
                source,
            })?;

        let caps = stream.capabilities();
        let reported = if caps.duration { stream.duration_ms() } else { None };
        let (total_duration_ms, duration_estimated) = match reported {
            Some(ms) if ms > 0 => (ms, false),
            _ => (
                estimate_duration_ms(byte_len, ctx.config.assumed_bitrate_bps),
                true,
            ),
        };

        if caps.volume {
            stream.set_volume(self.volume);
        }
        attach_surface(&track, caps, self.surface, stream.as_mut());

        info!(
            "Loaded {} ({:?}), duration {}ms{}",
            track.display_name(),
            track.kind(),
            total_duration_ms,
            if duration_estimated { " (estimated)" } else { "" }
        );

        self.session = Some(Session {
            track,
            byte_len,
            stream: Some(ActiveStream {
                id: stream_id,
                inner: stream,
            }),
            caps,
            total_duration_ms,
            duration_estimated,
            current_position_ms: 0,
            paused_position_ms: 0,
            progress: Progress::default(),
            finished: false,
        });
        self.state = PlaybackState::Loaded;
        out.push(Notification::PositionChanged(0));
        Ok(())
    }

    pub(crate) fn teardown(&mut self, out: &mut Vec<Notification>) {
        let was_active = self.state.is_active();
        if let Some(mut session) = self.session.take() {
            session.close_stream();
            debug!("Session for {} torn down", session.track.display_name());
        }
        self.state = PlaybackState::Idle;
        if was_active {
            out.push(Notification::PlaybackStopped);
        }
    }

    fn play(&mut self, ctx: &Ctx<'_>, out: &mut Vec<Notification>) -> Result<(), PlayerError> {
        let from_ms = match (self.state, self.session.as_mut()) {
            (PlaybackState::Loaded | PlaybackState::Stopped, Some(session)) => {
                // 新的一次完整播放
                session.finished = false;
                session.progress = Progress::default();
                0
            }
            (PlaybackState::Paused, Some(session)) => session.paused_position_ms,
            _ => return Ok(()),
        };

        if let Err(err) = self.start_playback(from_ms, ctx) {
            self.fail_playback(err.to_string(), out);
            return Err(err.into());
        }

        info!("Playback started at {}ms", from_ms);
        out.push(Notification::PlaybackStarted);
        Ok(())
    }

    /// 在 `from_ms` 处开始播放。原生 seek 的流就地跳转，其余重新打开。
    fn start_playback(&mut self, from_ms: u64, ctx: &Ctx<'_>) -> Result<(), BackendError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        let reuse = match (&session.stream, session.caps.seek) {
            (None, _) => false,
            (Some(_), true) => true,
            // 刚加载的顺序流还停在开头
            (Some(_), false) => self.state == PlaybackState::Loaded && from_ms == 0,
        };
        let native_seek = session.caps.seek;

        if !reuse {
            self.open_stream(from_ms, ctx)?;
        } else if native_seek && from_ms > 0 {
            self.with_stream(|s| s.seek(from_ms))?;
        }
        self.with_stream(|s| s.play())?;

        if let Some(session) = self.session.as_mut() {
            session.current_position_ms = from_ms;
            session.progress.start(from_ms, ctx.now_ms);
        }
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// 关闭旧流后打开新流。没有原生 seek 时按假定码率跳过字节来模拟。
    fn open_stream(&mut self, start_ms: u64, ctx: &Ctx<'_>) -> Result<(), BackendError> {
        let stream_id = self.allocate_stream_id();
        let volume = self.volume;
        let surface = self.surface;
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        session.close_stream();

        let skip_bytes = if session.caps.seek {
            0
        } else {
            seek_offset_bytes(start_ms, ctx.config.assumed_bitrate_bps).min(session.byte_len)
        };
        if skip_bytes > 0 {
            debug!(
                "Emulating seek to {}ms by skipping {} bytes",
                start_ms, skip_bytes
            );
        }

        let request = OpenRequest {
            path: session.track.path().to_path_buf(),
            skip_bytes,
            events: EventSink::new(stream_id, ctx.events.clone()),
        };
        let mut stream = self.backend.open(request)?;

        if session.caps.seek && start_ms > 0 {
            stream.seek(start_ms)?;
        }
        if session.caps.volume {
            stream.set_volume(volume);
        }
        attach_surface(&session.track, session.caps, surface, stream.as_mut());

        session.stream = Some(ActiveStream {
            id: stream_id,
            inner: stream,
        });
        Ok(())
    }

    fn with_stream(
        &mut self,
        op: impl FnOnce(&mut dyn MediaStream) -> Result<(), BackendError>,
    ) -> Result<(), BackendError> {
        match self.session.as_mut().and_then(|s| s.stream.as_mut()) {
            Some(stream) => op(stream.inner.as_mut()),
            None => Ok(()),
        }
    }

    fn pause(&mut self, ctx: &Ctx<'_>, out: &mut Vec<Notification>) -> Result<(), PlayerError> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let position = session.clamp_position(session.progress.position_at(ctx.now_ms));
        session.current_position_ms = position;
        session.paused_position_ms = position;
        session.progress.freeze(position);
        session.progress.was_playing = false;

        let result = if session.caps.seek {
            match session.stream.as_mut() {
                Some(stream) => stream.inner.pause(),
                None => Ok(()),
            }
        } else {
            // 顺序流无法原地暂停，恢复时从暂停位置重新打开
            session.close_stream();
            Ok(())
        };

        if let Err(err) = result {
            self.fail_playback(err.to_string(), out);
            return Err(err.into());
        }

        self.state = PlaybackState::Paused;
        info!("Playback paused at {}ms", position);
        out.push(Notification::PlaybackPaused);
        Ok(())
    }

    fn stop(&mut self, out: &mut Vec<Notification>) {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return;
        };

        session.reset_position();
        session.progress = Progress::default();

        if !state.is_active() {
            return;
        }

        if let Some(stream) = session.stream.as_mut() {
            if let Err(err) = stream.inner.stop() {
                warn!("Backend failed to stop cleanly: {}", err);
            }
        }
        session.close_stream();
        self.state = PlaybackState::Stopped;

        info!("Playback stopped");
        out.push(Notification::PlaybackStopped);
        out.push(Notification::PositionChanged(0));
    }

    fn seek_to(
        &mut self,
        position_ms: i64,
        ctx: &Ctx<'_>,
        out: &mut Vec<Notification>,
    ) -> Result<(), PlayerError> {
        let (target, native) = match self.session.as_ref() {
            Some(session) => (
                clamp_seek(position_ms, session.total_duration_ms),
                session.caps.seek && session.stream.is_some(),
            ),
            None => return Ok(()),
        };

        if self.state == PlaybackState::Playing {
            let result = if native {
                self.with_stream(|s| s.seek(target))
            } else {
                self.open_stream(target, ctx)
                    .and_then(|()| self.with_stream(|s| s.play()))
            };
            if let Err(err) = result {
                self.fail_playback(err.to_string(), out);
                return Err(err.into());
            }

            if let Some(session) = self.session.as_mut() {
                session.current_position_ms = target;
                session.progress.start(target, ctx.now_ms);
            }
            debug!("Seeked to {}ms while playing", target);
            out.push(Notification::PositionChanged(target));
            return Ok(());
        }

        if native {
            if let Err(err) = self.with_stream(|s| s.seek(target)) {
                self.fail_playback(err.to_string(), out);
                return Err(err.into());
            }
        }

        let previous = self.state;
        if let Some(session) = self.session.as_mut() {
            session.paused_position_ms = target;
            session.current_position_ms = target;
            session.progress.freeze(target);
            session.progress.was_playing = false;
            session.progress.backend_stopped = false;
            if matches!(previous, PlaybackState::Loaded | PlaybackState::Stopped) {
                // 从停止状态定位后播放算新的一次完整播放
                session.finished = false;
            }
        }

        self.state = PlaybackState::Paused;
        debug!("Seek position set to {}ms (paused)", target);
        if previous != PlaybackState::Paused {
            out.push(Notification::PlaybackPaused);
        }
        out.push(Notification::PositionChanged(target));
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.caps.volume {
            debug!("Volume {} ignored: stream has no volume control", volume);
            return;
        }
        if let Some(stream) = session.stream.as_mut() {
            stream.inner.set_volume(volume);
        }
    }

    fn set_video_surface(&mut self, surface: Option<VideoSurface>) {
        self.surface = surface;
        let Some(surface) = surface else {
            return;
        };
        if let Some(session) = self.session.as_mut() {
            let caps = session.caps;
            if let Some(stream) = session.stream.as_mut() {
                attach_surface(&session.track, caps, Some(surface), stream.inner.as_mut());
            }
        }
    }

    pub(crate) fn handle_backend_event(
        &mut self,
        event: StreamEvent,
        ctx: &Ctx<'_>,
        out: &mut Vec<Notification>,
    ) {
        let state = self.state;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.active_stream_id() != Some(event.stream_id) {
            debug!(
                "Dropping {:?} from closed stream #{}",
                event.event, event.stream_id
            );
            return;
        }

        match event.event {
            BackendEvent::Playing => debug!("Backend reported playing"),
            BackendEvent::Paused => debug!("Backend reported paused"),
            BackendEvent::TimeAdvanced(ms) => {
                if state == PlaybackState::Playing && session.caps.reports_time {
                    let ms = session.clamp_position(ms);
                    session.progress.base_ms = ms;
                    session.progress.anchor_ms = Some(ctx.now_ms);
                }
            }
            BackendEvent::Stopped => {
                if state == PlaybackState::Playing {
                    // 后端自己停了：记下最后位置，交给同步器判断是否算自然结束
                    let position = session.clamp_position(session.progress.position_at(ctx.now_ms));
                    session.progress.last_playing_ms = position;
                    session.progress.was_playing = true;
                    session.progress.backend_stopped = true;
                    session.progress.anchor_ms = None;
                    session.reset_position();
                    self.state = PlaybackState::Stopped;
                    info!("Backend stopped on its own at {}ms", position);
                    out.push(Notification::PlaybackStopped);
                }
            }
            BackendEvent::Finished => {
                let ended = state == PlaybackState::Playing
                    || (state == PlaybackState::Stopped
                        && (session.progress.was_playing || session.progress.backend_stopped));
                if ended {
                    self.complete(out);
                }
            }
            BackendEvent::Error(message) => {
                self.fail_playback(message, out);
            }
        }
    }

    /// 自然播放结束。每次完整播放只触发一次。
    pub(crate) fn complete(&mut self, out: &mut Vec<Notification>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.finished {
            return;
        }
        session.finished = true;
        session.close_stream();
        session.reset_position();
        session.progress = Progress::default();
        info!("Playback finished: {}", session.track.display_name());

        let was_playing = self.state == PlaybackState::Playing;
        self.state = PlaybackState::Stopped;
        if was_playing {
            out.push(Notification::PlaybackStopped);
        }
        out.push(Notification::PlaybackFinished);
    }

    /// 后端播放失败：强制进入 `Stopped`，不自动重试
    fn fail_playback(&mut self, message: String, out: &mut Vec<Notification>) {
        warn!("Playback error: {}", message);
        let previous = self.state;
        if let Some(session) = self.session.as_mut() {
            session.close_stream();
            session.reset_position();
            session.progress = Progress::default();
            self.state = PlaybackState::Stopped;
        }
        out.push(Notification::PlaybackError(message));
        if previous.is_active() {
            out.push(Notification::PlaybackStopped);
        }
    }

    fn release(&mut self, out: &mut Vec<Notification>) {
        if self.released {
            return;
        }
        self.teardown(out);
        self.backend.release();
        self.released = true;
        info!("Backend {} released", self.backend.name());
    }
}

fn attach_surface(
    track: &Track,
    caps: Capabilities,
    surface: Option<VideoSurface>,
    stream: &mut dyn MediaStream,
) {
    if !track.is_video() {
        return;
    }
    match surface {
        None => debug!("No video surface registered, {} plays audio-only", track.display_name()),
        Some(_) if !caps.video => {
            info!("Backend has no video output, {} plays audio-only", track.display_name());
        }
        Some(surface) => {
            if let Err(err) = stream.attach_video_surface(surface) {
                warn!("Failed to attach video surface, playing audio-only: {}", err);
            }
        }
    }
}

/// 检查文件存在且可读，返回字节数
fn probe_file(path: &Path) -> Result<u64, LoadError> {
    let metadata = fs::metadata(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    if !metadata.is_file() {
        return Err(LoadError::NotAFile(path.to_path_buf()));
    }
    File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(metadata.len())
}

fn clamp_seek(position_ms: i64, total_ms: u64) -> u64 {
    if position_ms <= 0 {
        0
    } else {
        (position_ms as u64).min(total_ms)
    }
}
