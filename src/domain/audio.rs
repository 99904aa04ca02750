//! 音频缓冲区
//!
//! 单声道、归一化浮点样本（[-1.0, 1.0]）加采样率。
//! 负责样本级拼接和 16-bit PCM WAV 编码。

use std::path::Path;
use thiserror::Error;

/// WAV 固定头长度
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const NUM_CHANNELS: u16 = 1;
const PCM_FORMAT: u16 = 1;

/// 音频拼接错误
#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("Cannot concatenate an empty sequence of audio buffers")]
    Empty,

    #[error("Sample rate mismatch at chunk {index}: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },
}

/// 单声道音频缓冲区
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 时长（秒）
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// 编码为 16-bit PCM WAV
    pub fn to_wav_bytes(&self) -> Vec<u8> {
        encode_wav(&self.samples, self.sample_rate)
    }

    /// 写入 WAV 文件
    pub async fn persist(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_wav_bytes()).await
    }
}

/// 校验所有缓冲区采样率一致，返回该采样率
pub fn common_sample_rate(buffers: &[AudioBuffer]) -> Result<u32, AudioError> {
    let first = buffers.first().ok_or(AudioError::Empty)?;
    let expected = first.sample_rate;

    for (index, buffer) in buffers.iter().enumerate().skip(1) {
        if buffer.sample_rate != expected {
            return Err(AudioError::SampleRateMismatch {
                index,
                expected,
                found: buffer.sample_rate,
            });
        }
    }

    Ok(expected)
}

/// 按输入顺序逐样本拼接
///
/// 不插入间隔，不做交叉淡化
pub fn concat(buffers: &[AudioBuffer]) -> Result<AudioBuffer, AudioError> {
    let sample_rate = common_sample_rate(buffers)?;
    let total: usize = buffers.iter().map(AudioBuffer::len).sum();

    let mut samples = Vec::with_capacity(total);
    for buffer in buffers {
        samples.extend_from_slice(&buffer.samples);
    }

    Ok(AudioBuffer::new(samples, sample_rate))
}

/// 16-bit PCM 满幅值
pub const I16_FULL_SCALE: f32 = 32767.0;

/// f32 样本转 i16，超出范围的样本先截断
///
/// 四舍五入保证 `i16 / 32767` 的样本重新编码后不变
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clamped * I16_FULL_SCALE).round() as i16
}

/// 将 PCM f32 样本编码为单声道 16-bit WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let byte_rate = sample_rate * NUM_CHANNELS as u32 * (BITS_PER_SAMPLE / 8) as u32;
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);

    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    wav.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    for &sample in samples {
        wav.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }

    wav
}
