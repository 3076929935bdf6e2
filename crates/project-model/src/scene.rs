//! Scene data model.
//!
//! A scene is one narration+media+subtitle unit in the project's ordered
//! timeline. Scenes are created and edited by an external editor and persist
//! across exports; the render pipeline only reads them (plus the resolved
//! duration write-back).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of media attached to a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    #[default]
    None,
}

/// Policy for computing a scene's final length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    /// Follow the narration audio length (plus silence padding).
    #[default]
    Auto,
    /// Manual fixed length in seconds.
    Fixed,
}

/// One scene in the project timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Unique scene identifier (UUID).
    #[serde(default = "new_scene_id")]
    pub id: String,

    /// Source media file, if any.
    #[serde(default)]
    pub media_path: Option<PathBuf>,

    /// What `media_path` points at.
    #[serde(default)]
    pub media_kind: MediaKind,

    /// Narration text spoken over the scene.
    #[serde(default)]
    pub narration_text: String,

    /// Subtitle text burned into the frame.
    #[serde(default)]
    pub subtitle_text: String,

    /// How the scene duration is computed.
    #[serde(default)]
    pub duration_mode: DurationMode,

    /// Scene length in seconds when `duration_mode` is `Fixed`, and the
    /// fallback length for auto scenes without narration.
    #[serde(default = "default_fixed_seconds")]
    pub fixed_seconds: f64,

    /// Keep the source video's own audio track and natural length.
    /// Mutually exclusive with narration audio.
    #[serde(default)]
    pub retain_media_audio: bool,

    /// Mix narration into the base clip's audio instead of replacing it.
    #[serde(default)]
    pub mix_narration: bool,

    /// Last resolved duration, written back by the duration resolver.
    #[serde(default)]
    pub resolved_seconds: Option<f64>,

    /// Rendered per-scene clip from the current export, if any.
    #[serde(default)]
    pub clip_path: Option<PathBuf>,
}

fn new_scene_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_fixed_seconds() -> f64 {
    3.0
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            id: new_scene_id(),
            media_path: None,
            media_kind: MediaKind::None,
            narration_text: String::new(),
            subtitle_text: String::new(),
            duration_mode: DurationMode::Auto,
            fixed_seconds: default_fixed_seconds(),
            retain_media_audio: false,
            mix_narration: false,
            resolved_seconds: None,
            clip_path: None,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a media file is attached.
    pub fn has_media(&self) -> bool {
        self.media_kind != MediaKind::None && self.media_path.is_some()
    }

    /// Whether there is narration text to speak.
    pub fn has_narration(&self) -> bool {
        !self.narration_text.trim().is_empty()
    }

    /// Whether there is subtitle text to burn in.
    pub fn has_subtitle(&self) -> bool {
        !self.subtitle_text.trim().is_empty()
    }
}
