//! 进度同步器
//!
//! 后台线程按固定间隔调用 [`Engine::tick`]，把显示进度与后端对齐，
//! 并检测自然播放结束。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::engine::Core;
use crate::{Engine, Notification, PlaybackState};

/// 进度同步线程
pub struct Synchronizer {
    stop_tx: Sender<()>,
    stopped: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Synchronizer {
    /// 启动同步线程，间隔取自引擎配置
    pub fn spawn(engine: Arc<Engine>) -> Self {
        let interval = engine.config().tick_interval();
        let (stop_tx, stop_rx) = bounded(1);
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();

        let worker = thread::spawn(move || {
            run_sync(engine, interval, stop_rx, flag);
        });
        info!("Progress synchronizer started ({:?} interval)", interval);

        Self {
            stop_tx,
            stopped,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// 停止同步线程。返回后不会再有 tick 产生的通知；重复调用无效果。
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.stop_tx.try_send(());

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            // 监听器在同步线程上调用 stop 时不能 join 自己
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                warn!("Progress synchronizer thread panicked");
            }
        }
        info!("Progress synchronizer stopped");
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_sync(
    engine: Arc<Engine>,
    interval: Duration,
    stop_rx: Receiver<()>,
    stopped: Arc<AtomicBool>,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                engine.tick();
            }
        }
    }
    debug!("Progress synchronizer thread exiting");
}

impl Core {
    /// 单次对齐
    ///
    /// - 播放中：位置 = 恢复位置 + 挂钟流逝，发 `PositionChanged`；到达总时长即自然结束。
    /// - 暂停：冻结挂钟参考点。
    /// - 后端自行停止：若停止前进度达到 `threshold` 比例，补发一次 `PlaybackFinished`。
    pub(crate) fn reconcile(&mut self, now_ms: u64, threshold: f32, out: &mut Vec<Notification>) {
        match self.state {
            PlaybackState::Playing => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                let position = session.progress.position_at(now_ms);
                let reported = session.clamp_position(position);
                session.current_position_ms = reported;
                session.progress.was_playing = true;
                session.progress.last_playing_ms = reported;
                out.push(Notification::PositionChanged(reported));

                let total = session.total_duration_ms;
                if total > 0 && position >= total {
                    self.complete(out);
                }
            }
            PlaybackState::Paused => {
                if let Some(session) = self.session.as_mut() {
                    session.progress.anchor_ms = None;
                }
            }
            PlaybackState::Stopped => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if !session.progress.was_playing {
                    return;
                }
                // 只在停止后的第一次 tick 判断
                session.progress.was_playing = false;

                let total = session.total_duration_ms;
                if session.finished || total == 0 {
                    return;
                }
                let reached = session.progress.last_playing_ms as f64;
                if reached >= total as f64 * threshold as f64 {
                    session.finished = true;
                    session.close_stream();
                    info!(
                        "Treating stop at {}ms of {}ms as natural completion",
                        session.progress.last_playing_ms, total
                    );
                    out.push(Notification::PlaybackFinished);
                }
            }
            PlaybackState::Idle | PlaybackState::Loaded => {}
        }
    }
}
