//! Storage Adapter - 文件系统目录

mod file_storage;

pub use file_storage::FileDirectoryProvider;
