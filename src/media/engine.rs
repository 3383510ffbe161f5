use std::{
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::Context as _;

use crate::{
    error::{ChoraleError, ChoraleResult},
    filter::FilterGraph,
};

/// One ordered input to a transcoding job.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineInput {
    /// A media file, with per-input options placed before `-i`.
    File {
        path: PathBuf,
        options: Vec<String>,
    },
    /// A synthesized source (black frames, silence).
    Lavfi { source: String },
}

impl EngineInput {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            options: Vec::new(),
        }
    }

    pub fn file_with_options(path: impl Into<PathBuf>, options: &[&str]) -> Self {
        Self::File {
            path: path.into(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn lavfi(source: impl Into<String>) -> Self {
        Self::Lavfi {
            source: source.into(),
        }
    }
}

/// A complete transcoding submission: ordered inputs, an optional filter
/// graph (or simple per-stream filters), stream maps, and the output spec.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EngineJob {
    pub inputs: Vec<EngineInput>,
    pub filtergraph: Option<FilterGraph>,
    /// Simple video filter chain, comma-joined into `-vf`.
    pub video_filters: Vec<String>,
    /// Simple audio filter chain, comma-joined into `-af`.
    pub audio_filters: Vec<String>,
    pub no_video: bool,
    /// Explicit stream maps for jobs without a filter graph (remuxing).
    pub maps: Vec<String>,
    /// Output container format (`-f`).
    pub format: Option<String>,
    /// Flat output option tokens, e.g. `["-vcodec", "libx264"]`.
    pub output_options: Vec<String>,
    pub output: PathBuf,
}

impl EngineJob {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// The full argument vector submitted to the engine binary. Kept as data
    /// so adapters and tests can inspect exactly what would run.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        for input in &self.inputs {
            match input {
                EngineInput::File { path, options } => {
                    args.extend(options.iter().cloned());
                    args.push("-i".into());
                    args.push(path.to_string_lossy().into_owned());
                }
                EngineInput::Lavfi { source } => {
                    args.push("-f".into());
                    args.push("lavfi".into());
                    args.push("-i".into());
                    args.push(source.clone());
                }
            }
        }
        if self.no_video {
            args.push("-vn".into());
        }
        if !self.video_filters.is_empty() {
            args.push("-vf".into());
            args.push(self.video_filters.join(","));
        }
        if !self.audio_filters.is_empty() {
            args.push("-af".into());
            args.push(self.audio_filters.join(","));
        }
        if let Some(graph) = &self.filtergraph {
            args.push("-filter_complex".into());
            args.push(graph.to_filter_complex());
            for label in &graph.outputs {
                args.push("-map".into());
                args.push(format!("[{label}]"));
            }
        }
        for map in &self.maps {
            args.push("-map".into());
            args.push(map.clone());
        }
        if let Some(format) = &self.format {
            args.push("-f".into());
            args.push(format.clone());
        }
        args.extend(self.output_options.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// The external transcoding engine contract: submit a job, block until it
/// completes, fail on non-zero exit.
pub trait MediaEngine {
    fn submit(&mut self, job: &EngineJob) -> ChoraleResult<()>;
}

/// Runs jobs through the system `ffmpeg` binary. We deliberately shell out
/// rather than link the native libraries, so the only requirement is a
/// working binary on PATH.
#[derive(Debug, Default)]
pub struct FfmpegEngine;

impl FfmpegEngine {
    pub fn new() -> ChoraleResult<Self> {
        if !is_ffmpeg_on_path() {
            return Err(ChoraleError::engine(
                "ffmpeg is required but was not found on PATH",
            ));
        }
        Ok(Self)
    }
}

impl MediaEngine for FfmpegEngine {
    fn submit(&mut self, job: &EngineJob) -> ChoraleResult<()> {
        ensure_parent_dir(&job.output)?;
        let args = job.to_args();
        tracing::debug!(output = %job.output.display(), "submitting ffmpeg job");

        let out = Command::new("ffmpeg")
            .args(&args)
            .output()
            .map_err(|e| ChoraleError::engine(format!("failed to spawn ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(ChoraleError::engine(format!(
                "ffmpeg exited with status {} writing '{}': {}",
                out.status,
                job.output.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> ChoraleResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}
