use std::path::Path;

use crate::error::{ChoraleError, ChoraleResult};

/// Which stream kinds a source clip carries. Browser recordings regularly
/// arrive with one of the two missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub has_video: bool,
    pub has_audio: bool,
}

pub trait MediaProbe {
    fn probe(&self, path: &Path) -> ChoraleResult<StreamInfo>;
}

/// Probes via the system `ffprobe` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfprobeProbe;

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ChoraleResult<StreamInfo> {
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        let out = std::process::Command::new("ffprobe")
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| ChoraleError::probe(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(ChoraleError::probe(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| ChoraleError::probe(format!("ffprobe json parse failed: {e}")))?;
        let has_video = parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("video"));
        let has_audio = parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));
        Ok(StreamInfo {
            has_video,
            has_audio,
        })
    }
}
