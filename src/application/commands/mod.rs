//! 应用层 - 命令

mod synthesize_commands;

pub mod handlers;

pub use synthesize_commands::*;
