//! On-disk artifact layout and freshness.
//!
//! One directory per song id; file names per stage and part/row. The names
//! are the resumability contract: re-runs address the same paths and skip
//! stages whose target is already fresh. Freshness is existence plus an
//! optional `.fp` sidecar holding the fingerprint of the stage's inputs;
//! artifacts without a sidecar (produced by earlier tooling) count as fresh,
//! a mismatching sidecar marks the artifact stale.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{error::ChoraleResult, runbook::RowKey};

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn song_dir(&self, song_id: &str) -> PathBuf {
        self.root.join(song_id)
    }

    /// Raw upload for one part, as delivered by object storage.
    pub fn source_clip(&self, song_id: &str, part_id: &str) -> PathBuf {
        self.song_dir(song_id).join(format!("{part_id}.webm"))
    }

    pub fn normalized_clip(&self, song_id: &str, part_id: &str) -> PathBuf {
        self.song_dir(song_id).join(format!("{part_id}_converted.nut"))
    }

    pub fn stripped_audio(&self, song_id: &str, part_id: &str) -> PathBuf {
        self.song_dir(song_id).join(format!("{part_id}_audio.wav"))
    }

    pub fn row_composite(&self, song_id: &str, row: RowKey) -> PathBuf {
        self.song_dir(song_id).join(format!("slice_{row}.nut"))
    }

    pub fn final_composite(&self, song_id: &str) -> PathBuf {
        self.song_dir(song_id).join("final.nut")
    }

    pub fn mastered(&self, song_id: &str) -> PathBuf {
        self.song_dir(song_id).join("final.mp4")
    }

    /// Externally supplied mastered audio; an input, never written by us.
    pub fn master_audio(&self, song_id: &str) -> PathBuf {
        self.song_dir(song_id).join("masteraudio.wav")
    }

    pub fn audio_remastered(&self, song_id: &str) -> PathBuf {
        self.song_dir(song_id).join("audiomaster.mp4")
    }

    pub fn is_fresh(&self, artifact: &Path, fingerprint: &str) -> bool {
        if !artifact.exists() {
            return false;
        }
        match std::fs::read_to_string(sidecar_path(artifact)) {
            Ok(recorded) => recorded.trim() == fingerprint,
            Err(_) => true,
        }
    }

    /// Records the input fingerprint after a stage wrote its artifact.
    pub fn commit(&self, artifact: &Path, fingerprint: &str) -> ChoraleResult<()> {
        let sidecar = sidecar_path(artifact);
        std::fs::write(&sidecar, fingerprint)
            .with_context(|| format!("write fingerprint sidecar '{}'", sidecar.display()))?;
        Ok(())
    }
}

fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".fp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_reproduces_the_stage_table() {
        let store = ArtifactStore::new("../videos");
        let song = "1767801950583";
        let part = "1768318213747";
        assert_eq!(
            store.source_clip(song, part),
            Path::new("../videos/1767801950583/1768318213747.webm")
        );
        assert_eq!(
            store.normalized_clip(song, part),
            Path::new("../videos/1767801950583/1768318213747_converted.nut")
        );
        assert_eq!(
            store.stripped_audio(song, part),
            Path::new("../videos/1767801950583/1768318213747_audio.wav")
        );
        assert_eq!(
            store.row_composite(song, 480),
            Path::new("../videos/1767801950583/slice_480.nut")
        );
        assert_eq!(
            store.row_composite(song, -1),
            Path::new("../videos/1767801950583/slice_-1.nut")
        );
        assert_eq!(
            store.final_composite(song),
            Path::new("../videos/1767801950583/final.nut")
        );
        assert_eq!(
            store.mastered(song),
            Path::new("../videos/1767801950583/final.mp4")
        );
        assert_eq!(
            store.master_audio(song),
            Path::new("../videos/1767801950583/masteraudio.wav")
        );
        assert_eq!(
            store.audio_remastered(song),
            Path::new("../videos/1767801950583/audiomaster.mp4")
        );
    }

    #[test]
    fn freshness_follows_sidecar_state() {
        let dir = PathBuf::from("target").join("artifact_test");
        std::fs::create_dir_all(&dir).unwrap();
        let store = ArtifactStore::new(&dir);
        let artifact = dir.join("final.nut");
        let _ = std::fs::remove_file(&artifact);
        let _ = std::fs::remove_file(sidecar_path(&artifact));

        // Missing artifact is never fresh.
        assert!(!store.is_fresh(&artifact, "abc"));

        // Present without a sidecar: fresh (legacy contract).
        std::fs::write(&artifact, b"media").unwrap();
        assert!(store.is_fresh(&artifact, "abc"));

        // Matching sidecar: fresh; mismatching: stale.
        store.commit(&artifact, "abc").unwrap();
        assert!(store.is_fresh(&artifact, "abc"));
        assert!(!store.is_fresh(&artifact, "other"));
    }
}
