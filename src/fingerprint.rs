//! Short content fingerprints used for the runbook hash and for artifact
//! freshness sidecars. Media files are stamped by path, size, and mtime
//! rather than hashed by content, which keeps re-runs cheap.

use std::path::Path;
use std::time::UNIX_EPOCH;

use anyhow::Context as _;
use xxhash_rust::xxh3::{Xxh3, xxh3_64};

use crate::error::ChoraleResult;

/// 8-hex-char diagnostic fingerprint, as carried by the runbook.
pub fn short_hex(text: &str) -> String {
    format!("{:08x}", xxh3_64(text.as_bytes()) as u32)
}

/// Accumulates the identity of a stage's inputs into one 16-hex-char digest.
pub struct InputStamp {
    hasher: Xxh3,
}

impl Default for InputStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl InputStamp {
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
        }
    }

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.hasher.update(&(s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.hasher.update(&v.to_le_bytes());
        self
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.hasher.update(&v.to_bits().to_le_bytes());
        self
    }

    /// Folds a file's path, byte length, and mtime into the stamp.
    pub fn file(&mut self, path: &Path) -> ChoraleResult<&mut Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("stat input '{}'", path.display()))?;
        let mtime_nanos = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.text(&path.to_string_lossy());
        self.u64(meta.len());
        self.u64(mtime_nanos);
        Ok(self)
    }

    pub fn finish(&self) -> String {
        format!("{:016x}", self.hasher.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hex_is_stable_and_eight_chars() {
        let a = short_hex("0-480-960");
        assert_eq!(a.len(), 8);
        assert_eq!(a, short_hex("0-480-960"));
        assert_ne!(a, short_hex("0-480"));
    }

    #[test]
    fn stamp_distinguishes_field_order_and_values() {
        let mut a = InputStamp::new();
        a.text("x").u64(1);
        let mut b = InputStamp::new();
        b.u64(1).text("x");
        assert_ne!(a.finish(), b.finish());

        let mut c = InputStamp::new();
        c.text("x").u64(2);
        let mut d = InputStamp::new();
        d.text("x").u64(1);
        assert_ne!(c.finish(), d.finish());
    }

    #[test]
    fn file_stamp_tracks_content_length() {
        let dir = std::path::PathBuf::from("target").join("fingerprint_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("input.bin");

        std::fs::write(&path, b"aa").unwrap();
        let mut first = InputStamp::new();
        first.file(&path).unwrap();

        std::fs::write(&path, b"aaaa").unwrap();
        let mut second = InputStamp::new();
        second.file(&path).unwrap();

        assert_ne!(first.finish(), second.finish());
    }

    #[test]
    fn file_stamp_errors_on_missing_file() {
        let mut stamp = InputStamp::new();
        assert!(stamp.file(Path::new("target/does-not-exist.bin")).is_err());
    }
}
