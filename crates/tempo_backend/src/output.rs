//! 音频输出
//!
//! 使用 cpal 进行音频播放。cpal 的流不能跨线程移动，
//! 输出必须在解码线程内创建和销毁。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use tracing::warn;

/// 音频输出错误
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("No output device available")]
    NoDevice,
    #[error("No supported config")]
    NoConfig,
    #[error("Stream error: {0}")]
    Stream(String),
}

/// 音频输出配置
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 8192,
        }
    }
}

/// 检查是否有默认输出设备
pub fn probe_output_device() -> Result<String, OutputError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or(OutputError::NoDevice)?;
    Ok(device.name().unwrap_or_else(|_| "unknown".to_string()))
}

/// 音频输出流
pub struct AudioOutput {
    _stream: Stream,
    ring: Arc<RingBuffer>,
    is_playing: Arc<AtomicBool>,
    position_samples: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// 在默认设备上创建音频输出
    pub fn new(config: OutputConfig) -> Result<Self, OutputError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(OutputError::NoDevice)?;

        Self::with_device(&device, config)
    }

    /// 使用指定设备创建音频输出
    pub fn with_device(device: &Device, config: OutputConfig) -> Result<Self, OutputError> {
        let supported_config = device
            .supported_output_configs()
            .map_err(|e| OutputError::Stream(e.to_string()))?
            .find(|c| {
                c.channels() == config.channels
                    && c.min_sample_rate().0 <= config.sample_rate
                    && c.max_sample_rate().0 >= config.sample_rate
                    && c.sample_format() == SampleFormat::F32
            })
            .ok_or(OutputError::NoConfig)?;

        let stream_config: StreamConfig = supported_config
            .with_sample_rate(cpal::SampleRate(config.sample_rate))
            .into();

        let ring = Arc::new(RingBuffer::new(config.buffer_size * 4));
        let is_playing = Arc::new(AtomicBool::new(false));
        let position_samples = Arc::new(AtomicU64::new(0));

        let ring_clone = ring.clone();
        let is_playing_clone = is_playing.clone();
        let position_clone = position_samples.clone();
        let channels = config.channels.max(1) as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if is_playing_clone.load(Ordering::Relaxed) {
                        let read = ring_clone.read(data);
                        // 未填满部分补静音
                        for sample in &mut data[read..] {
                            *sample = 0.0;
                        }
                        position_clone.fetch_add((read / channels) as u64, Ordering::Relaxed);
                    } else {
                        for sample in data.iter_mut() {
                            *sample = 0.0;
                        }
                    }
                },
                |err| {
                    warn!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| OutputError::Stream(e.to_string()))?;

        stream.play().map_err(|e| OutputError::Stream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            ring,
            is_playing,
            position_samples,
            sample_rate: config.sample_rate,
            channels: config.channels,
        })
    }

    /// 写入采样数据。缓冲区满时丢弃最旧的数据，调用方应先检查 [`Self::has_room`]。
    pub fn write(&self, samples: &[f32]) {
        self.ring.write(samples);
    }

    /// 缓冲区是否还能容纳一批采样
    pub fn has_room(&self, samples: usize) -> bool {
        self.ring.len() + samples <= self.ring.capacity()
    }

    /// 缓冲区已全部播出
    pub fn is_drained(&self) -> bool {
        self.ring.len() == 0
    }

    /// 丢弃缓冲中尚未播放的采样
    pub fn clear(&self) {
        self.ring.clear();
    }

    pub fn set_playing(&self, playing: bool) {
        self.is_playing.store(playing, Ordering::Relaxed);
    }

    /// 自上次重置以来播出的毫秒数
    pub fn position_ms(&self) -> u64 {
        let samples = self.position_samples.load(Ordering::Relaxed);
        samples * 1000 / self.sample_rate.max(1) as u64
    }

    pub fn reset_position(&self) {
        self.position_samples.store(0, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// 简单的环形缓冲区
pub(crate) struct RingBuffer {
    buffer: Mutex<VecDeque<f32>>,
    capacity: usize,
}

impl RingBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    pub(crate) fn write(&self, data: &[f32]) {
        let mut buf = self.lock();
        if data.len() >= self.capacity {
            buf.clear();
            buf.extend(data[data.len() - self.capacity..].iter().copied());
            return;
        }

        // 满了就丢弃旧数据
        let needed = buf.len() + data.len();
        if needed > self.capacity {
            let drain_count = needed - self.capacity;
            buf.drain(..drain_count);
        }

        buf.extend(data.iter().copied());
    }

    pub(crate) fn read(&self, output: &mut [f32]) -> usize {
        let mut buf = self.lock();
        let to_read = output.len().min(buf.len());

        let (a, b) = buf.as_slices();
        let a_len = a.len().min(to_read);
        output[..a_len].copy_from_slice(&a[..a_len]);
        let b_len = to_read - a_len;
        if b_len > 0 {
            output[a_len..to_read].copy_from_slice(&b[..b_len]);
        }

        buf.drain(..to_read);
        to_read
    }
}

/// 按音量缩放采样（0 - 100）
pub fn apply_gain(samples: &mut [f32], volume: u8) {
    if volume >= 100 {
        return;
    }
    let gain = volume as f32 / 100.0;
    for sample in samples {
        *sample *= gain;
    }
}
