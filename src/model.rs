use std::collections::BTreeSet;

use crate::{
    config::{RenderOptions, ReverbType},
    error::{ChoraleError, ChoraleResult},
    runbook::Runbook,
};

pub const DEFAULT_TILE_WIDTH: u32 = 640;
pub const DEFAULT_TILE_HEIGHT: u32 = 480;

/// One song's worth of recorded parts, as supplied by the metadata service.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub tracks: Vec<Track>,
}

/// One recorded clip plus its placement/timing metadata.
///
/// `hidden` parts carry audio only: they are mixed into the soundtrack but
/// never packed onto the canvas.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub part_id: String,
    /// Sync offset into the clip, in milliseconds. The upstream document may
    /// carry this as a number, a numeric string, null, or not at all.
    #[serde(default, deserialize_with = "de_offset_ms")]
    pub offset: f64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub hidden: bool,
    /// Object-storage key of the raw clip, relative to the media root.
    /// Defaults to `<song_id>/<part_id>.webm` when absent.
    #[serde(default)]
    pub key: Option<String>,
}

fn default_volume() -> f64 {
    1.0
}

impl Track {
    pub fn tile_width(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_TILE_WIDTH)
    }

    pub fn tile_height(&self) -> u32 {
        self.height.unwrap_or(DEFAULT_TILE_HEIGHT)
    }

    /// Offset in seconds, as used by trim filters.
    pub fn offset_secs(&self) -> f64 {
        self.offset / 1000.0
    }
}

/// Tolerant offset parsing: numbers pass through, numeric strings parse,
/// anything else (null, garbage) defaults to 0. Negative offsets clamp to 0.
fn de_offset_ms<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    let raw = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &raw {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if parsed.is_finite() { parsed.max(0.0) } else { 0.0 })
}

impl Song {
    pub fn validate(&self) -> ChoraleResult<()> {
        if self.id.is_empty() {
            return Err(ChoraleError::validation("song id is empty"));
        }
        if self.tracks.is_empty() {
            return Err(ChoraleError::validation(format!(
                "song '{}' has no tracks",
                self.id
            )));
        }
        let mut seen = BTreeSet::new();
        for track in &self.tracks {
            if track.part_id.is_empty() {
                return Err(ChoraleError::validation(format!(
                    "song '{}' has a track with an empty part id",
                    self.id
                )));
            }
            if !seen.insert(track.part_id.as_str()) {
                return Err(ChoraleError::validation(format!(
                    "duplicate part id '{}' in song '{}'",
                    track.part_id, self.id
                )));
            }
            if !(0.0..=1.0).contains(&track.volume) {
                return Err(ChoraleError::validation(format!(
                    "part '{}' volume must be within 0..1, got {}",
                    track.part_id, track.volume
                )));
            }
        }
        Ok(())
    }
}

/// A track after layout: sized, optionally positioned, optionally panned.
/// `position`/`pan` are absent for hidden (audio-only) parts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PositionedInput {
    pub part_id: String,
    pub size: [u32; 2],
    pub volume: f64,
    /// Milliseconds.
    pub offset: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[i64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
}

impl PositionedInput {
    pub fn offset_secs(&self) -> f64 {
        self.offset / 1000.0
    }

    /// Tile height rounded down to even, matching what the scale filter emits.
    pub fn even_height(&self) -> i64 {
        (i64::from(self.size[1]) / 2) * 2
    }
}

/// Output parameters echoed into the recipe document.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OutputSpec {
    pub size: [u32; 2],
    pub reverb: f64,
    pub reverb_type: ReverbType,
    pub panning: bool,
    pub watermark: String,
}

impl From<&RenderOptions> for OutputSpec {
    fn from(opts: &RenderOptions) -> Self {
        Self {
            size: [opts.width, opts.height],
            reverb: opts.reverb,
            reverb_type: opts.reverb_type,
            panning: opts.panning,
            watermark: opts.watermark.clone(),
        }
    }
}

/// The full layout+grouping plan for one song's render.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    pub song_id: String,
    pub output: OutputSpec,
    pub inputs: Vec<PositionedInput>,
    pub runbook: Runbook,
}
