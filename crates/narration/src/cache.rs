//! Content-addressed narration audio cache.
//!
//! One WAV file per (narration text, voice id) pair under a caller-supplied
//! cache root. The key is a SHA-256 over the UTF-8 text, a separator byte,
//! and the voice id, so identical narration is synthesized once and reused
//! across exports. Duration is always re-derived from the stored file's own
//! header; the byte store and the reported duration cannot diverge.
//!
//! Concurrent exports racing on the same key are tolerated: the content for
//! identical (text, voice) is idempotent, so last writer wins.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use kamishibai_common::{KamishibaiError, KamishibaiResult};

/// Separator between text and voice id in the hashed key material.
const KEY_SEPARATOR: u8 = 0x1f;

/// On-disk cache of synthesized narration audio.
#[derive(Debug, Clone)]
pub struct AudioCache {
    root: PathBuf,
}

impl AudioCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> KamishibaiResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            KamishibaiError::cache(format!("failed to create cache root {}: {e}", root.display()))
        })?;
        Ok(Self { root })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache key for a (text, voice) pair.
    pub fn key(text: &str, voice: u32) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update([KEY_SEPARATOR]);
        hasher.update(voice.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// File path an entry for (text, voice) lives at, whether or not it exists.
    pub fn path(&self, text: &str, voice: u32) -> PathBuf {
        self.root.join(format!("{}.wav", Self::key(text, voice)))
    }

    /// Whether an entry exists for (text, voice).
    pub fn exists(&self, text: &str, voice: u32) -> bool {
        self.path(text, voice).exists()
    }

    /// Store synthesized audio bytes, returning the cache file path.
    pub fn save(&self, text: &str, voice: u32, audio: &[u8]) -> KamishibaiResult<PathBuf> {
        let path = self.path(text, voice);
        std::fs::write(&path, audio).map_err(|e| {
            KamishibaiError::cache(format!("failed to write {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), bytes = audio.len(), "Cached narration audio");
        Ok(path)
    }

    /// Load cached audio bytes. `None` on a miss.
    pub fn load(&self, text: &str, voice: u32) -> KamishibaiResult<Option<Vec<u8>>> {
        let path = self.path(text, voice);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| {
            KamishibaiError::cache(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(Some(bytes))
    }

    /// Duration in seconds of the cached entry, derived from the WAV header.
    /// `None` on a miss.
    pub fn duration(&self, text: &str, voice: u32) -> KamishibaiResult<Option<f64>> {
        let path = self.path(text, voice);
        if !path.exists() {
            return Ok(None);
        }
        let reader = hound::WavReader::open(&path).map_err(|e| {
            KamishibaiError::cache(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(Some(wav_reader_duration(&reader)))
    }

    /// Remove every cached entry.
    pub fn clear(&self) -> KamishibaiResult<()> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            KamishibaiError::cache(format!("failed to list {}: {e}", self.root.display()))
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| KamishibaiError::cache(e.to_string()))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "wav") {
                std::fs::remove_file(&path).map_err(|e| {
                    KamishibaiError::cache(format!("failed to remove {}: {e}", path.display()))
                })?;
            }
        }
        Ok(())
    }
}

/// Duration in seconds of a WAV byte buffer, from its own container header.
pub fn wav_duration_secs(audio: &[u8]) -> KamishibaiResult<f64> {
    let reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| KamishibaiError::cache(format!("malformed WAV data: {e}")))?;
    Ok(wav_reader_duration(&reader))
}

fn wav_reader_duration<R: std::io::Read>(reader: &hound::WavReader<R>) -> f64 {
    let frames = reader.duration() as f64;
    let rate = reader.spec().sample_rate as f64;
    frames / rate
}
