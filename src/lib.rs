//! VoxStitch - 长文本语音合成与音频缓存
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - 文本分段、缓存指纹、音频缓冲区与 WAV 编码
//!
//! 应用层 (application/):
//! - Ports: 端口定义（AudioCache, TtsEngine, AudioStitcher, AudioCodec, DirectoryProvider）
//! - Commands: 合成命令处理器
//!
//! 基础设施层 (infrastructure/):
//! - Persistence: 文件系统 LRU 音频缓存
//! - Adapters: WAV 编解码、拼接、目录供给、Fake TTS 引擎

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
