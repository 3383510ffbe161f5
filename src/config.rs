use std::path::{Path, PathBuf};

use crate::error::{ChoraleError, ChoraleResult};

/// Reverb character applied during post-production. Each variant maps to an
/// impulse-response file shipped alongside the watermark in the assets dir.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReverbType {
    #[default]
    Hall,
    Church,
    Room,
    Plate,
}

impl ReverbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hall => "hall",
            Self::Church => "church",
            Self::Room => "room",
            Self::Plate => "plate",
        }
    }

    pub fn impulse_file(&self) -> String {
        format!("{}.wav", self.as_str())
    }
}

impl std::fmt::Display for ReverbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Output canvas width in pixels.
    pub width: u32,
    /// Output canvas height in pixels.
    pub height: u32,
    /// Wet mix weight for the reverb, 0..1.
    pub reverb: f64,
    pub reverb_type: ReverbType,
    /// Derive stereo pan from each tile's horizontal position.
    pub panning: bool,
    /// Watermark image file, resolved against `assets_dir`.
    pub watermark: String,
    /// Margin passed to the rectangle packer, in pixels.
    pub margin: u32,
    /// Ask the packer to center the packed block on the canvas.
    pub center: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            reverb: 0.05,
            reverb_type: ReverbType::Hall,
            panning: true,
            watermark: "watermark.png".to_string(),
            margin: 25,
            center: true,
        }
    }
}

impl RenderOptions {
    pub fn validate(&self) -> ChoraleResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ChoraleError::validation(
                "output width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // The mastered mp4 targets yuv420p, which needs even dimensions.
            return Err(ChoraleError::validation(
                "output width/height must be even (required for yuv420p output)",
            ));
        }
        if !(0.0..=1.0).contains(&self.reverb) {
            return Err(ChoraleError::validation(format!(
                "reverb level must be within 0..1, got {}",
                self.reverb
            )));
        }
        if self.watermark.is_empty() {
            return Err(ChoraleError::validation("watermark file name is empty"));
        }
        Ok(())
    }

    pub fn watermark_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(&self.watermark)
    }

    pub fn impulse_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(self.reverb_type.impulse_file())
    }
}
