//! Kamishibai Project Model
//!
//! Data types for the scene timeline and project file:
//! scenes (media + narration + subtitle + duration policy),
//! output settings, and JSON persistence.

pub mod project;
pub mod scene;

pub use project::{OutputConfig, Project, Resolution, MAX_FPS, MIN_FPS};
pub use scene::{DurationMode, MediaKind, Scene};
