//! Kamishibai Narration
//!
//! Narration audio plumbing for the export pipeline:
//! - `NarrationSynthesizer` capability trait (text + voice -> WAV bytes)
//! - content-addressed on-disk audio cache keyed by (text, voice)

pub mod cache;
pub mod synth;

pub use cache::{wav_duration_secs, AudioCache};
pub use synth::{NarrationSynthesizer, NullSynthesizer};
