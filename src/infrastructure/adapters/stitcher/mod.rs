//! Stitcher Adapter - 音频拼接

mod wav_stitcher;

pub use wav_stitcher::WavStitcher;
