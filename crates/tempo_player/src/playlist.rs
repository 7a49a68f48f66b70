//! 播放列表与曲目推进

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, warn};

use crate::{Engine, PlaybackListener, PlayerError, Track};

/// 删除条目后需要做的事
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// 索引无效，什么都没删
    Missing,
    /// 删除的不是当前曲目
    Removed,
    /// 删除了当前曲目，需要加载新的当前曲目
    LoadCurrent(usize),
    /// 列表已空，需要停止播放
    Emptied,
}

/// 播放列表状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: Option<usize>,
    repeat: bool,
    shuffle: bool,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    /// 只是一个标记，顺序由调用方在添加前自行打乱
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn set_shuffle(&mut self, shuffle: bool) {
        self.shuffle = shuffle;
    }

    /// 追加曲目，路径重复时忽略。第一首成为当前曲目。
    pub fn add(&mut self, track: Track) -> bool {
        if self.tracks.iter().any(|t| t.path() == track.path()) {
            return false;
        }
        self.tracks.push(track);
        if self.tracks.len() == 1 {
            self.current = Some(0);
        }
        true
    }

    pub fn remove(&mut self, index: usize) -> RemoveOutcome {
        if index >= self.tracks.len() {
            return RemoveOutcome::Missing;
        }
        self.tracks.remove(index);

        match self.current {
            Some(current) if current == index => {
                if index < self.tracks.len() {
                    self.current = Some(index);
                    RemoveOutcome::LoadCurrent(index)
                } else if !self.tracks.is_empty() {
                    let last = self.tracks.len() - 1;
                    self.current = Some(last);
                    RemoveOutcome::LoadCurrent(last)
                } else {
                    self.current = None;
                    RemoveOutcome::Emptied
                }
            }
            Some(current) if current > index => {
                self.current = Some(current - 1);
                RemoveOutcome::Removed
            }
            _ => RemoveOutcome::Removed,
        }
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
        self.current = None;
    }

    /// 选中指定条目
    pub fn select(&mut self, index: usize) -> Option<&Track> {
        let track = self.tracks.get(index)?;
        self.current = Some(index);
        Some(track)
    }

    /// 下一首：末尾时仅在 repeat 下回到 0
    pub fn next_index(&self) -> Option<usize> {
        let current = self.current?;
        if current + 1 < self.tracks.len() {
            Some(current + 1)
        } else if self.repeat && !self.tracks.is_empty() {
            Some(0)
        } else {
            None
        }
    }

    /// 上一首：不回绕
    pub fn previous_index(&self) -> Option<usize> {
        match self.current {
            Some(current) if current > 0 => Some(current - 1),
            _ => None,
        }
    }

    /// 下一首按钮是否可用
    pub fn can_go_next(&self) -> bool {
        self.next_index().is_some()
    }

    pub fn can_go_previous(&self) -> bool {
        self.previous_index().is_some()
    }
}

/// 曲目推进器：维护播放列表，响应导航命令和播放结束通知
pub struct Sequencer {
    engine: Arc<Engine>,
    playlist: Mutex<Playlist>,
}

impl Sequencer {
    /// 创建推进器并注册为引擎监听器
    pub fn new(engine: Arc<Engine>) -> Arc<Self> {
        let sequencer = Arc::new(Self {
            engine: engine.clone(),
            playlist: Mutex::new(Playlist::new()),
        });
        engine.add_listener(Arc::new(FinishedListener {
            sequencer: Arc::downgrade(&sequencer),
        }));
        sequencer
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn snapshot(&self) -> Playlist {
        self.lock().clone()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lock().current_index()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn set_repeat(&self, repeat: bool) {
        self.lock().set_repeat(repeat);
        info!("Repeat {}", if repeat { "enabled" } else { "disabled" });
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.lock().set_shuffle(shuffle);
        info!("Shuffle {}", if shuffle { "enabled" } else { "disabled" });
    }

    pub fn toggle_repeat(&self) -> bool {
        let repeat = !self.lock().repeat();
        self.set_repeat(repeat);
        repeat
    }

    pub fn toggle_shuffle(&self) -> bool {
        let shuffle = !self.lock().shuffle();
        self.set_shuffle(shuffle);
        shuffle
    }

    /// 添加曲目，不会自动加载
    pub fn add(&self, track: Track) -> bool {
        let name = track.display_name();
        let added = self.lock().add(track);
        if added {
            debug!("Added {} to playlist", name);
        }
        added
    }

    /// 删除条目。返回是否加载了新曲目。
    pub fn remove(&self, index: usize) -> Result<bool, PlayerError> {
        let (outcome, track) = {
            let mut playlist = self.lock();
            let outcome = playlist.remove(index);
            let track = match outcome {
                RemoveOutcome::LoadCurrent(i) => playlist.tracks().get(i).cloned(),
                _ => None,
            };
            (outcome, track)
        };

        match (outcome, track) {
            (RemoveOutcome::LoadCurrent(_), Some(track)) => {
                self.load_and_play(track)?;
                Ok(true)
            }
            (RemoveOutcome::Emptied, _) => {
                self.engine.stop();
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    pub fn clear(&self) {
        let had_items = {
            let mut playlist = self.lock();
            let had_items = !playlist.is_empty();
            playlist.clear();
            had_items
        };
        if had_items {
            self.engine.stop();
        }
    }

    pub fn next(&self) -> Result<bool, PlayerError> {
        let track = {
            let mut playlist = self.lock();
            match playlist.next_index() {
                Some(index) => playlist.select(index).cloned(),
                None => None,
            }
        };
        self.load_if_some(track)
    }

    pub fn previous(&self) -> Result<bool, PlayerError> {
        let track = {
            let mut playlist = self.lock();
            match playlist.previous_index() {
                Some(index) => playlist.select(index).cloned(),
                None => None,
            }
        };
        self.load_if_some(track)
    }

    pub fn select_and_load(&self, index: usize) -> Result<bool, PlayerError> {
        let track = self.lock().select(index).cloned();
        if track.is_none() {
            debug!("Ignoring selection of missing index {}", index);
        }
        self.load_if_some(track)
    }

    /// 当前曲目自然结束
    pub fn on_playback_finished(&self) -> Result<bool, PlayerError> {
        let index = self.lock().next_index();
        match index {
            Some(index) => self.select_and_load(index),
            None => {
                info!("Reached end of playlist");
                Ok(false)
            }
        }
    }

    fn load_if_some(&self, track: Option<Track>) -> Result<bool, PlayerError> {
        match track {
            Some(track) => {
                self.load_and_play(track)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn load_and_play(&self, track: Track) -> Result<(), PlayerError> {
        self.engine.load(track)?;
        self.engine.play()
    }

    fn lock(&self) -> MutexGuard<'_, Playlist> {
        self.playlist.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 把 `PlaybackFinished` 转给推进器。持弱引用，避免引擎与推进器互相持有。
struct FinishedListener {
    sequencer: Weak<Sequencer>,
}

impl PlaybackListener for FinishedListener {
    fn on_playback_finished(&self) {
        let Some(sequencer) = self.sequencer.upgrade() else {
            return;
        };
        if let Err(err) = sequencer.on_playback_finished() {
            warn!("Failed to advance playlist: {}", err);
        }
    }
}
