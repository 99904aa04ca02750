//! WAV Stitcher - 音频块拼接
//!
//! 将按顺序生成的音频块逐样本拼接为单个 16-bit PCM WAV 文件。
//! 整个音频在内存中完成拼接后一次写出。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::application::ports::{AudioStitcherPort, StitchError, StitchOptions, StitchResult};
use crate::domain::{concat, AudioBuffer};

/// WAV 拼接器
#[derive(Debug, Clone, Default)]
pub struct WavStitcher;

impl WavStitcher {
    pub fn new() -> Self {
        Self
    }

    /// 音频块默认保存目录：`<output_dir>/<output_stem>_chunks`
    fn default_chunk_dir(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        output_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!("{}_chunks", stem))
    }

    async fn ensure_parent(path: &Path) -> Result<(), StitchError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// 写出最终文件
    ///
    /// 提供临时目录时先写临时文件再移动，避免目标路径出现写了一半的文件
    async fn write_output(
        &self,
        bytes: &[u8],
        output_path: &Path,
        temp_dir: Option<&Path>,
    ) -> Result<(), StitchError> {
        Self::ensure_parent(output_path).await?;

        let Some(temp_dir) = temp_dir else {
            fs::write(output_path, bytes).await?;
            return Ok(());
        };

        fs::create_dir_all(temp_dir).await?;
        let tmp_path = temp_dir.join(format!(".stitch-{}.wav.part", Uuid::new_v4()));
        fs::write(&tmp_path, bytes).await?;

        if let Err(e) = fs::rename(&tmp_path, output_path).await {
            // 跨文件系统时 rename 会失败，退化为复制
            tracing::debug!(error = %e, "Rename failed, falling back to copy");
            let copied = fs::copy(&tmp_path, output_path).await;
            let _ = fs::remove_file(&tmp_path).await;
            copied?;
        }

        Ok(())
    }

    /// 逐个保存音频块：chunk_001.wav, chunk_002.wav, ...
    async fn write_chunks(
        &self,
        chunks: &[AudioBuffer],
        chunk_dir: &Path,
    ) -> Result<Vec<PathBuf>, StitchError> {
        fs::create_dir_all(chunk_dir).await?;

        let mut paths = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let path = chunk_dir.join(format!("chunk_{:03}.wav", i + 1));
            chunk.persist(&path).await?;
            paths.push(path);
        }

        tracing::debug!(
            chunk_dir = %chunk_dir.display(),
            count = paths.len(),
            "Saved individual chunks"
        );

        Ok(paths)
    }
}

#[async_trait]
impl AudioStitcherPort for WavStitcher {
    async fn stitch(
        &self,
        chunks: &[AudioBuffer],
        output_path: &Path,
        options: &StitchOptions,
    ) -> Result<StitchResult, StitchError> {
        if chunks.is_empty() {
            return Err(StitchError::EmptyInput);
        }

        let (bytes, total_samples, total_duration_secs) = if chunks.len() == 1 {
            let only = &chunks[0];
            (only.to_wav_bytes(), only.len(), only.duration_secs())
        } else {
            let joined = concat(chunks)?;
            (joined.to_wav_bytes(), joined.len(), joined.duration_secs())
        };

        // 音频块先于最终文件写出，失败时目标路径保持不变
        let chunk_paths = if options.keep_chunks {
            let chunk_dir = options
                .chunk_dir
                .clone()
                .unwrap_or_else(|| Self::default_chunk_dir(output_path));
            self.write_chunks(chunks, &chunk_dir).await?
        } else {
            Vec::new()
        };

        self.write_output(&bytes, output_path, options.temp_dir.as_deref())
            .await?;

        tracing::info!(
            output = %output_path.display(),
            chunks = chunks.len(),
            total_samples = total_samples,
            duration_secs = total_duration_secs,
            "Audio stitched"
        );

        Ok(StitchResult {
            output_path: output_path.to_path_buf(),
            chunk_paths,
            total_duration_secs,
            total_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::{sample_to_i16, WAV_HEADER_LEN};
    use tempfile::tempdir;

    /// 直接读取 data 段的 i16 样本
    fn read_pcm(bytes: &[u8]) -> (u32, Vec<i16>) {
        let sample_rate = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        let samples = bytes[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        (sample_rate, samples)
    }

    fn to_pcm(samples: &[f32]) -> Vec<i16> {
        samples.iter().map(|&s| sample_to_i16(s)).collect()
    }

    #[tokio::test]
    async fn test_single_chunk() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("single.wav");
        let chunk = AudioBuffer::new(vec![0.1; 8000], 16000);

        let result = WavStitcher::new()
            .stitch(&[chunk.clone()], &output, &StitchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.total_samples, 8000);
        assert!((result.total_duration_secs - 0.5).abs() < 1e-9);
        assert!(result.chunk_paths.is_empty());

        let bytes = fs::read(&output).await.unwrap();
        assert_eq!(bytes, chunk.to_wav_bytes());
    }

    #[tokio::test]
    async fn test_multi_chunk_order() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("joined.wav");

        let a = AudioBuffer::new(vec![0.1, 0.2, 0.3], 24000);
        let b = AudioBuffer::new(vec![-0.4, -0.5], 24000);
        let c = AudioBuffer::new(vec![0.6, 0.7, 0.8, 0.9], 24000);

        let result = WavStitcher::new()
            .stitch(&[a.clone(), b.clone(), c.clone()], &output, &StitchOptions::default())
            .await
            .unwrap();

        assert_eq!(result.total_samples, 9);

        let (sample_rate, pcm) = read_pcm(&fs::read(&output).await.unwrap());
        assert_eq!(sample_rate, 24000);

        let mut expected = to_pcm(&a.samples);
        expected.extend(to_pcm(&b.samples));
        expected.extend(to_pcm(&c.samples));
        assert_eq!(pcm, expected);
    }

    #[tokio::test]
    async fn test_rate_mismatch_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("bad.wav");

        let chunks = [
            AudioBuffer::new(vec![0.1], 24000),
            AudioBuffer::new(vec![0.1], 22050),
        ];
        let err = WavStitcher::new()
            .stitch(&chunks, &output, &StitchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StitchError::SampleRateMismatch {
                index: 1,
                expected: 24000,
                found: 22050
            }
        ));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("empty.wav");

        let err = WavStitcher::new()
            .stitch(&[], &output, &StitchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StitchError::EmptyInput));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_keep_chunks() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("story.wav");
        let chunks = [
            AudioBuffer::new(vec![0.1; 4], 16000),
            AudioBuffer::new(vec![0.2; 6], 16000),
        ];

        let options = StitchOptions {
            keep_chunks: true,
            ..Default::default()
        };
        let result = WavStitcher::new()
            .stitch(&chunks, &output, &options)
            .await
            .unwrap();

        let chunk_dir = dir.path().join("story_chunks");
        assert_eq!(
            result.chunk_paths,
            vec![chunk_dir.join("chunk_001.wav"), chunk_dir.join("chunk_002.wav")]
        );
        for (path, chunk) in result.chunk_paths.iter().zip(&chunks) {
            assert_eq!(fs::read(path).await.unwrap(), chunk.to_wav_bytes());
        }
    }

    #[tokio::test]
    async fn test_chunk_write_failure_leaves_no_output() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("story.wav");

        // 普通文件占用音频块目录路径
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, b"not a directory").await.unwrap();

        let options = StitchOptions {
            temp_dir: Some(dir.path().join("tmp")),
            keep_chunks: true,
            chunk_dir: Some(blocked),
        };
        let result = WavStitcher::new()
            .stitch(
                &[AudioBuffer::new(vec![0.1; 4], 8000), AudioBuffer::new(vec![0.2; 4], 8000)],
                &output,
                &options,
            )
            .await;

        assert!(matches!(result, Err(StitchError::IoError(_))));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_temp_dir_is_cleaned_up() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("tmp");
        let output = dir.path().join("nested/out/final.wav");

        let options = StitchOptions {
            temp_dir: Some(temp.clone()),
            keep_chunks: true,
            chunk_dir: Some(dir.path().join("pieces")),
        };
        let result = WavStitcher::new()
            .stitch(
                &[AudioBuffer::new(vec![0.3; 10], 8000), AudioBuffer::new(vec![0.4; 10], 8000)],
                &output,
                &options,
            )
            .await
            .unwrap();

        assert!(output.exists());
        assert_eq!(result.chunk_paths.len(), 2);
        assert!(dir.path().join("pieces/chunk_002.wav").exists());

        let mut leftovers = fs::read_dir(&temp).await.unwrap();
        assert!(leftovers.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_samples_are_clamped() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("loud.wav");

        WavStitcher::new()
            .stitch(
                &[AudioBuffer::new(vec![1.5, -2.0], 8000), AudioBuffer::new(vec![0.0], 8000)],
                &output,
                &StitchOptions::default(),
            )
            .await
            .unwrap();

        let (_, pcm) = read_pcm(&fs::read(&output).await.unwrap());
        assert_eq!(pcm, vec![32767, -32767, 0]);
    }
}
