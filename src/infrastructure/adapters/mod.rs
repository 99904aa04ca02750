//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod codec;
pub mod stitcher;
pub mod storage;
pub mod tts;

pub use codec::*;
pub use stitcher::*;
pub use storage::*;
pub use tts::*;
