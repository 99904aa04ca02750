//! 缓存指纹
//!
//! 将 (文本, 音色, 生成参数, 引擎输出签名) 映射为稳定的 SHA-256 十六进制指纹。
//! 所有影响生成音频的参数都必须参与计算，否则缓存会返回错误的音频。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 默认语速
pub const DEFAULT_SPEED: f32 = 1.0;
/// 默认采样温度
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// 默认 top-p
pub const DEFAULT_TOP_P: f32 = 0.9;

/// 指纹格式版本，修改序列化方式时递增
const FINGERPRINT_VERSION: &str = "v2";

/// 生成参数（未设置的字段使用默认值）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationParams {
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// 用默认值补齐缺省字段
    pub fn normalized(&self) -> NormalizedParams {
        NormalizedParams {
            speed: self.speed.unwrap_or(DEFAULT_SPEED),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.unwrap_or(DEFAULT_TOP_P),
        }
    }
}

/// 补齐默认值后的生成参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedParams {
    pub speed: f32,
    pub temperature: f32,
    pub top_p: f32,
}

/// 引擎输出签名
///
/// 同一文本和音色在不同引擎或采样率下生成的音频不同
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSignature {
    pub engine_id: String,
    pub sample_rate: u32,
}

impl EngineSignature {
    pub fn new(engine_id: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            engine_id: engine_id.into(),
            sample_rate,
        }
    }
}

/// 音色 + 生成参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub voice_id: String,
    #[serde(default)]
    pub params: GenerationParams,
    /// 生成该音色的引擎，由调用方在查缓存前填入
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSignature>,
}

impl VoiceParams {
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            params: GenerationParams::default(),
            engine: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_engine(mut self, engine: EngineSignature) -> Self {
        self.engine = Some(engine);
        self
    }
}

/// 浮点参数的规范文本形式
///
/// 固定 6 位小数，并把 -0.0 归一为 0.0
fn canonical_f32(value: f32) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.6}", value)
}

/// 计算缓存指纹
///
/// 字段按固定顺序写入，每个字段带长度前缀，避免拼接歧义
pub fn derive_fingerprint(text: &str, voice: &VoiceParams) -> String {
    let normalized = voice.params.normalized();
    let speed = canonical_f32(normalized.speed);
    let temperature = canonical_f32(normalized.temperature);
    let top_p = canonical_f32(normalized.top_p);
    let (engine_id, sample_rate) = match &voice.engine {
        Some(engine) => (engine.engine_id.as_str(), engine.sample_rate.to_string()),
        None => ("", String::new()),
    };

    let fields: [&str; 8] = [
        FINGERPRINT_VERSION,
        text,
        &voice.voice_id,
        &speed,
        &temperature,
        &top_p,
        engine_id,
        &sample_rate,
    ];

    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}
