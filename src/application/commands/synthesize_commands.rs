//! Synthesize Commands - 合成相关命令

use std::path::PathBuf;

use crate::application::ports::StitchResult;
use crate::domain::VoiceParams;

/// 合成长文本命令
#[derive(Debug, Clone)]
pub struct SynthesizeCommand {
    pub text: String,
    pub voice: VoiceParams,
    pub output_path: PathBuf,
    /// 额外保存每个音频块
    pub keep_chunks: bool,
    /// 使用流式生成
    pub streaming: bool,
}

impl SynthesizeCommand {
    pub fn new(text: impl Into<String>, voice: VoiceParams, output_path: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            voice,
            output_path: output_path.into(),
            keep_chunks: false,
            streaming: false,
        }
    }
}

/// 合成响应
#[derive(Debug, Clone)]
pub struct SynthesizeResponse {
    pub stitch: StitchResult,
    pub chunk_count: usize,
    pub cache_hits: usize,
    pub generated: usize,
}
