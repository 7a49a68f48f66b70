//! 解码线程
//!
//! 每个打开的流对应一个线程：持有解码器和音频输出，按命令播放、暂停、跳转，
//! 通过 [`EventSink`] 上报状态。

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tempo_player::{BackendError, BackendEvent, EventSink};
use tracing::{debug, warn};

use crate::{apply_gain, AudioDecoder, AudioOutput, OutputConfig};

/// 位置上报间隔
const TIME_REPORT_INTERVAL: Duration = Duration::from_millis(250);

/// 缓冲区满时的等待间隔
const IDLE_WAIT: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Play,
    Pause,
    Seek(u64),
    Volume(u8),
    Shutdown,
}

/// 解码线程行为
#[derive(Debug, Clone)]
pub(crate) struct WorkerOptions {
    /// 上报 `TimeAdvanced`
    pub report_time: bool,
    /// 数据读完后发出的事件
    pub end_events: Vec<BackendEvent>,
    pub volume: u8,
}

pub(crate) struct Worker {
    control_tx: Sender<Control>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn spawn(decoder: AudioDecoder, events: EventSink, options: WorkerOptions) -> Self {
        let (control_tx, control_rx) = unbounded();
        let handle = thread::spawn(move || {
            run_worker(decoder, control_rx, events, options);
        });

        Self {
            control_tx,
            handle: Some(handle),
        }
    }

    pub(crate) fn send(&self, control: Control) -> Result<(), BackendError> {
        self.control_tx
            .send(control)
            .map_err(|_| BackendError::Stream("decode thread has exited".into()))
    }

    /// 结束线程并等待退出
    pub(crate) fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.control_tx.send(Control::Shutdown);
        if handle.join().is_err() {
            warn!("Decode thread panicked");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerState {
    decoder: AudioDecoder,
    output: AudioOutput,
    events: EventSink,
    options: WorkerOptions,
    playing: bool,
    /// 解码已到文件末尾
    exhausted: bool,
    /// 已经发出过结束事件
    ended: bool,
    /// 最近一次跳转的位置
    base_ms: u64,
    last_report: Instant,
}

fn run_worker(
    decoder: AudioDecoder,
    control_rx: Receiver<Control>,
    events: EventSink,
    options: WorkerOptions,
) {
    let output_config = OutputConfig {
        sample_rate: decoder.info.sample_rate,
        channels: decoder.info.channels as u16,
        buffer_size: 8192,
    };
    let output = match AudioOutput::new(output_config) {
        Ok(o) => o,
        Err(e) => {
            events.emit(BackendEvent::Error(format!("Audio output error: {}", e)));
            return;
        }
    };

    let mut state = WorkerState {
        decoder,
        output,
        events,
        options,
        playing: false,
        exhausted: false,
        ended: false,
        base_ms: 0,
        last_report: Instant::now(),
    };

    loop {
        // 不在播放时阻塞等待命令
        let control = if state.playing {
            match control_rx.try_recv() {
                Ok(c) => Some(c),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        } else {
            match control_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(c) => Some(c),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        };

        if let Some(control) = control {
            if !state.apply(control) {
                break;
            }
            continue;
        }

        if state.playing && !state.step() {
            break;
        }
    }

    state.output.set_playing(false);
    debug!("Decode thread #{} exiting", state.events.stream_id());
}

impl WorkerState {
    /// 返回 false 表示线程应当退出
    fn apply(&mut self, control: Control) -> bool {
        match control {
            Control::Play => {
                if !self.playing {
                    self.playing = true;
                    self.output.set_playing(true);
                    self.last_report = Instant::now();
                    self.events.emit(BackendEvent::Playing);
                }
            }
            Control::Pause => {
                if self.playing {
                    self.playing = false;
                    self.output.set_playing(false);
                    self.events.emit(BackendEvent::Paused);
                }
            }
            Control::Seek(ms) => {
                if let Err(e) = self.decoder.seek_ms(ms) {
                    self.events
                        .emit(BackendEvent::Error(format!("Seek error: {}", e)));
                    return false;
                }
                self.output.clear();
                self.output.reset_position();
                self.base_ms = ms;
                self.exhausted = false;
                self.ended = false;
            }
            Control::Volume(volume) => {
                self.options.volume = volume;
            }
            Control::Shutdown => return false,
        }
        true
    }

    /// 播放中的一步：解码一批送入输出，或等待缓冲播完。返回 false 表示出错退出。
    fn step(&mut self) -> bool {
        if self.exhausted {
            if self.output.is_drained() && !self.ended {
                self.ended = true;
                self.playing = false;
                self.output.set_playing(false);
                debug!("Stream #{} reached end of data", self.events.stream_id());
                for event in &self.options.end_events {
                    self.events.emit(event.clone());
                }
            } else {
                thread::sleep(IDLE_WAIT);
            }
            return true;
        }

        if !self.output.has_room(self.output_chunk_hint()) {
            thread::sleep(IDLE_WAIT);
            self.report_time();
            return true;
        }

        match self.decoder.decode_next() {
            Ok(Some(mut samples)) => {
                apply_gain(&mut samples, self.options.volume);
                self.output.write(&samples);
            }
            Ok(None) => self.exhausted = true,
            Err(e) => {
                self.events
                    .emit(BackendEvent::Error(format!("Decode error: {}", e)));
                return false;
            }
        }
        self.report_time();
        true
    }

    /// 一个包大致的采样数
    fn output_chunk_hint(&self) -> usize {
        4096 * self.output.channels().max(1) as usize
    }

    fn report_time(&mut self) {
        if !self.options.report_time || self.last_report.elapsed() < TIME_REPORT_INTERVAL {
            return;
        }
        self.last_report = Instant::now();
        let position = self.base_ms + self.output.position_ms();
        self.events.emit(BackendEvent::TimeAdvanced(position));
    }
}
