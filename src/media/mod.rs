//! Adapters for the external media tooling (ffmpeg/ffprobe).

pub mod engine;
pub mod probe;

pub use engine::{EngineInput, EngineJob, FfmpegEngine, MediaEngine, ensure_parent_dir};
pub use probe::{FfprobeProbe, MediaProbe, StreamInfo};
