// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod library_store;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegMediaAdapter;
pub use library_store::DirectoryAssetStore;
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::TracingLogAdapter;
