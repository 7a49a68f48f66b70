//! 事件分发协议

use std::sync::{Arc, PoisonError, RwLock};

use crate::Notification;

/// 播放监听器
///
/// 回调在产生通知的线程上执行（命令线程或同步线程），需要在 UI 线程处理的
/// 表现层自行转发。
pub trait PlaybackListener: Send + Sync {
    fn on_playback_started(&self) {}

    fn on_playback_paused(&self) {}

    fn on_playback_stopped(&self) {}

    fn on_position_changed(&self, _position_ms: u64) {}

    fn on_playback_finished(&self) {}

    fn on_playback_error(&self, _message: &str) {}
}

/// 已注册的监听器集合
#[derive(Default)]
pub struct Listeners {
    inner: RwLock<Vec<Arc<dyn PlaybackListener>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn PlaybackListener>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// 按指针移除，返回是否找到
    pub fn remove(&self, listener: &Arc<dyn PlaybackListener>) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = inner.len();
        inner.retain(|l| !Arc::ptr_eq(l, listener));
        inner.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次投递。先复制一份列表，回调里注册新监听器不会死锁。
    pub fn dispatch(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        let listeners: Vec<_> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for notification in notifications {
            for listener in &listeners {
                deliver(listener.as_ref(), notification);
            }
        }
    }
}

fn deliver(listener: &dyn PlaybackListener, notification: &Notification) {
    match notification {
        Notification::PlaybackStarted => listener.on_playback_started(),
        Notification::PlaybackPaused => listener.on_playback_paused(),
        Notification::PlaybackStopped => listener.on_playback_stopped(),
        Notification::PositionChanged(ms) => listener.on_position_changed(*ms),
        Notification::PlaybackFinished => listener.on_playback_finished(),
        Notification::PlaybackError(message) => listener.on_playback_error(message),
    }
}

/// 把通知原样收集起来的监听器
#[derive(Default)]
pub struct RecordingListener {
    seen: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 某类通知出现的次数
    pub fn count(&self, wanted: &Notification) -> usize {
        self.snapshot().iter().filter(|n| *n == wanted).count()
    }

    fn record(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

impl PlaybackListener for RecordingListener {
    fn on_playback_started(&self) {
        self.record(Notification::PlaybackStarted);
    }

    fn on_playback_paused(&self) {
        self.record(Notification::PlaybackPaused);
    }

    fn on_playback_stopped(&self) {
        self.record(Notification::PlaybackStopped);
    }

    fn on_position_changed(&self, position_ms: u64) {
        self.record(Notification::PositionChanged(position_ms));
    }

    fn on_playback_finished(&self) {
        self.record(Notification::PlaybackFinished);
    }

    fn on_playback_error(&self, message: &str) {
        self.record(Notification::PlaybackError(message.to_string()));
    }
}
