#![forbid(unsafe_code)]

//! chorale composites independently recorded choir parts into one
//! synchronized, laid-out, watermarked, reverb-mastered performance video.
//! All pixel and sample processing is delegated to the system media engine;
//! this crate computes layouts, generates filter graphs, and drives the
//! multi-stage render over a resumable on-disk artifact cache.

pub mod artifact;
pub mod config;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod layout;
pub mod media;
pub mod model;
pub mod pack;
pub mod pipeline;
pub mod runbook;

pub use artifact::ArtifactStore;
pub use config::{RenderOptions, ReverbType};
pub use error::{ChoraleError, ChoraleResult};
pub use filter::{FilterGraph, FilterNode, FilterOptions};
pub use layout::{layout_song, plan_song, shuffle_key};
pub use media::{
    EngineInput, EngineJob, FfmpegEngine, FfprobeProbe, MediaEngine, MediaProbe, StreamInfo,
};
pub use model::{PositionedInput, Recipe, Song, Track};
pub use pack::{Container, PackedRect, Rect, RectanglePacker, ShelfPacker};
pub use pipeline::{Pipeline, StageKind, StageOutcome, StagePolicy, continuation};
pub use runbook::{AUDIO_ONLY_ROW, RowKey, Runbook};
