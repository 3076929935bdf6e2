//! Narration synthesis capability.
//!
//! The actual speech engine (network protocol, process management) lives
//! outside this crate; the pipeline only needs "text + voice in, WAV bytes
//! out". Implementations must return an uncompressed PCM container whose
//! header describes its own duration.

use kamishibai_common::{KamishibaiError, KamishibaiResult};

/// Capability for turning narration text into audio bytes.
pub trait NarrationSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice, returning WAV bytes.
    fn synthesize(&self, text: &str, voice: u32) -> KamishibaiResult<Vec<u8>>;

    /// Whether the backing engine is reachable right now.
    fn is_available(&self) -> bool;

    /// Engine name for diagnostics.
    fn name(&self) -> &str;
}

/// Placeholder used when no speech engine is configured. Every request
/// fails, so exports with uncached narration abort with a clear message.
#[derive(Debug, Default)]
pub struct NullSynthesizer;

impl NarrationSynthesizer for NullSynthesizer {
    fn synthesize(&self, text: &str, _voice: u32) -> KamishibaiResult<Vec<u8>> {
        let preview: String = text.chars().take(20).collect();
        Err(KamishibaiError::synthesis(format!(
            "no speech engine configured (narration {preview:?} is not cached)"
        )))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_synthesizer_always_fails() {
        let synth = NullSynthesizer;
        assert!(!synth.is_available());
        let err = synth.synthesize("こんにちは", 1).unwrap_err();
        assert!(matches!(err, KamishibaiError::Synthesis { .. }));
    }
}
