//! WAV Codec - 基于 symphonia 的 WAV 编解码器
//!
//! 编码使用领域层的 16-bit PCM 写入器；
//! 解码先校验 RIFF 头，再交给 symphonia 解出 f32 样本并混为单声道。

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, CodecError};
use crate::domain::audio::{I16_FULL_SCALE, WAV_HEADER_LEN};
use crate::domain::AudioBuffer;

/// WAV 编解码器
#[derive(Debug, Clone, Default)]
pub struct WavCodec;

#[derive(Debug)]
struct WavHeader {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    data_size: usize,
}

impl WavCodec {
    pub fn new() -> Self {
        Self
    }

    /// 解析 WAV 文件头
    fn parse_wav_header(&self, data: &[u8]) -> Result<WavHeader, CodecError> {
        if data.len() < WAV_HEADER_LEN {
            return Err(CodecError::InvalidInput("WAV data too short".to_string()));
        }

        // 验证 RIFF 头
        if &data[0..4] != b"RIFF" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing RIFF header".to_string(),
            ));
        }

        // 验证 WAVE 标识
        if &data[8..12] != b"WAVE" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing WAVE identifier".to_string(),
            ));
        }

        let mut pos = 12;
        let mut format: Option<(u16, u32, u16)> = None;
        let mut data_size: Option<usize> = None;

        while pos + 8 <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size =
                u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                    as usize;

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || pos + 8 + 16 > data.len() {
                        return Err(CodecError::InvalidInput(
                            "Invalid fmt chunk size".to_string(),
                        ));
                    }
                    let fmt = &data[pos + 8..pos + 8 + 16];
                    let num_channels = u16::from_le_bytes([fmt[2], fmt[3]]);
                    let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
                    let bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
                    format = Some((num_channels, sample_rate, bits_per_sample));
                }
                b"data" => {
                    data_size = Some(chunk_size);
                    break;
                }
                _ => {}
            }

            pos += 8 + chunk_size;
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos += 1;
            }
        }

        let (num_channels, sample_rate, bits_per_sample) = format.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
        })?;
        let data_size = data_size.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing data chunk".to_string())
        })?;

        if num_channels == 0 || sample_rate == 0 {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: zero channels or sample rate".to_string(),
            ));
        }

        Ok(WavHeader {
            num_channels,
            sample_rate,
            bits_per_sample,
            data_size,
        })
    }

    /// 使用 symphonia 解码 WAV，返回交错样本和采样率
    fn decode_to_pcm(&self, data: &[u8]) -> Result<(Vec<f32>, u32, usize), CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("wav");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let track_id = track.id;
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| CodecError::DecodingError(format!("Decode failed: {}", e)))?;

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        Ok((samples, sample_rate, channels))
    }
}

/// 交错多声道样本按帧取平均
fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

impl AudioCodecPort for WavCodec {
    fn extension(&self) -> &'static str {
        "wav"
    }

    fn encode(&self, buffer: &AudioBuffer) -> Vec<u8> {
        buffer.to_wav_bytes()
    }

    fn decode(&self, data: &[u8]) -> Result<AudioBuffer, CodecError> {
        let header = self.parse_wav_header(data)?;

        if header.data_size == 0 {
            return Ok(AudioBuffer::new(Vec::new(), header.sample_rate));
        }

        let (samples, sample_rate, channels) = self.decode_to_pcm(data)?;
        tracing::trace!(
            channels = channels,
            header_channels = header.num_channels,
            sample_rate = sample_rate,
            samples = samples.len(),
            "Decoded WAV payload"
        );

        let mut samples = downmix(samples, channels);

        // symphonia 按 1/32768 缩放 16-bit 样本，编码端按 32767 缩放
        if header.bits_per_sample == 16 {
            let scale = 32768.0 / I16_FULL_SCALE;
            for s in samples.iter_mut() {
                *s = (*s * scale).clamp(-1.0, 1.0);
            }
        }

        Ok(AudioBuffer::new(samples, sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::encode_wav;

    #[test]
    fn test_decode_recovers_samples() {
        let codec = WavCodec::new();
        let original = AudioBuffer::new(vec![0.0, 0.25, -0.5, 0.75, -1.0], 22050);

        let decoded = codec.decode(&codec.encode(&original)).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.len(), original.len());
        for (a, b) in decoded.samples.iter().zip(&original.samples) {
            assert!((a - b).abs() < 1e-3, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_reencoding_cached_payload_is_lossless() {
        let codec = WavCodec::new();
        let original = AudioBuffer::new(vec![0.9, -0.9, 0.123, -0.456, 1.0, -1.0], 24000);

        let first = codec.encode(&original);
        let second = codec.encode(&codec.decode(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_empty_payload() {
        let codec = WavCodec::new();
        let decoded = codec.decode(&encode_wav(&[], 16000)).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.sample_rate, 16000);
    }

    #[test]
    fn test_rejects_garbage() {
        let codec = WavCodec::new();
        assert!(codec.decode(b"short").is_err());

        let mut not_riff = encode_wav(&[0.1; 8], 16000);
        not_riff[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            codec.decode(&not_riff),
            Err(CodecError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_downmix_averages_frames() {
        assert_eq!(downmix(vec![0.25, 0.75, -1.0, 1.0], 2), vec![0.5, 0.0]);
        assert_eq!(downmix(vec![0.1, 0.2], 1), vec![0.1, 0.2]);
    }
}
