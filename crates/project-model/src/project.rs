//! Project metadata and output configuration.
//!
//! A project is the top-level container that ties together the ordered scene
//! list and the export output settings. Projects are stored as a single JSON
//! file and edited by the external editor surface.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use kamishibai_common::{KamishibaiError, KamishibaiResult};

use crate::scene::Scene;

/// Lowest accepted output frame rate.
pub const MIN_FPS: u32 = 15;
/// Highest accepted output frame rate.
pub const MAX_FPS: u32 = 60;

/// Output resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Vertical/social preset (9:16).
    pub const PORTRAIT: Resolution = Resolution {
        width: 1080,
        height: 1920,
    };

    /// Standard landscape preset (16:9).
    pub const LANDSCAPE: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = KamishibaiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| KamishibaiError::invalid_input(format!("bad resolution: {s:?}")))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| KamishibaiError::invalid_input(format!("bad resolution width: {s:?}")))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| KamishibaiError::invalid_input(format!("bad resolution height: {s:?}")))?;
        if width == 0 || height == 0 {
            return Err(KamishibaiError::invalid_input(format!(
                "resolution must be non-zero: {s:?}"
            )));
        }
        Ok(Resolution { width, height })
    }
}

/// Export output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output resolution.
    pub resolution: Resolution,

    /// Output frame rate.
    pub fps: u32,

    /// Destination file for the final video.
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::PORTRAIT,
            fps: 30,
            path: PathBuf::from("output.mp4"),
        }
    }
}

impl OutputConfig {
    /// Reject malformed output settings before any encoder is invoked.
    pub fn validate(&self) -> KamishibaiResult<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(KamishibaiError::invalid_input(format!(
                "resolution must be non-zero, got {}",
                self.resolution
            )));
        }
        if !(MIN_FPS..=MAX_FPS).contains(&self.fps) {
            return Err(KamishibaiError::invalid_input(format!(
                "fps must be within {MIN_FPS}-{MAX_FPS}, got {}",
                self.fps
            )));
        }
        Ok(())
    }
}

/// Top-level project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier (UUID).
    pub id: String,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Last modified timestamp (ISO 8601).
    pub modified_at: String,

    /// Ordered scene timeline.
    #[serde(default)]
    pub scenes: Vec<Scene>,

    /// Export output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1".to_string(),
            name: name.into(),
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.clone(),
            modified_at: now,
            scenes: Vec::new(),
            output: OutputConfig::default(),
        }
    }

    /// Load a project from a JSON file.
    pub fn load(path: &Path) -> KamishibaiResult<Self> {
        if !path.exists() {
            return Err(KamishibaiError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let project: Project = serde_json::from_str(&content)
            .map_err(|e| KamishibaiError::project(format!("failed to parse {}: {e}", path.display())))?;
        Ok(project)
    }

    /// Save the project as pretty JSON, refreshing the modified timestamp.
    pub fn save(&mut self, path: &Path) -> KamishibaiResult<()> {
        self.modified_at = chrono::Utc::now().to_rfc3339();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Append a new empty scene and return a reference to it.
    pub fn add_scene(&mut self) -> &mut Scene {
        self.scenes.push(Scene::new());
        self.scenes.last_mut().unwrap()
    }

    /// Remove the scene at `index`, if it exists.
    pub fn remove_scene(&mut self, index: usize) -> Option<Scene> {
        if index < self.scenes.len() {
            Some(self.scenes.remove(index))
        } else {
            None
        }
    }

    /// Move the scene at `index` one slot up (-1) or down (+1).
    /// Returns the new index when a move happened.
    pub fn move_scene(&mut self, index: usize, direction: i32) -> Option<usize> {
        let len = self.scenes.len();
        if index >= len {
            return None;
        }
        let target = match direction {
            d if d < 0 && index > 0 => index - 1,
            d if d > 0 && index + 1 < len => index + 1,
            _ => return None,
        };
        self.scenes.swap(index, target);
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MediaKind;

    #[test]
    fn test_resolution_parse_and_display() {
        let r: Resolution = "1080x1920".parse().unwrap();
        assert_eq!(r, Resolution::PORTRAIT);
        assert_eq!(r.to_string(), "1080x1920");
        assert_eq!("1920x1080".parse::<Resolution>().unwrap(), Resolution::LANDSCAPE);
    }

    #[test]
    fn test_resolution_rejects_garbage() {
        assert!("1080".parse::<Resolution>().is_err());
        assert!("x1920".parse::<Resolution>().is_err());
        assert!("1080xABC".parse::<Resolution>().is_err());
        assert!("0x1920".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_output_validate_fps_bounds() {
        let mut output = OutputConfig::default();
        output.fps = 14;
        assert!(output.validate().is_err());
        output.fps = 61;
        assert!(output.validate().is_err());
        output.fps = 15;
        assert!(output.validate().is_ok());
        output.fps = 60;
        assert!(output.validate().is_ok());
    }

    #[test]
    fn test_move_scene_bounds() {
        let mut project = Project::new("test");
        project.add_scene().narration_text = "a".into();
        project.add_scene().narration_text = "b".into();

        assert_eq!(project.move_scene(0, -1), None);
        assert_eq!(project.move_scene(1, 1), None);
        assert_eq!(project.move_scene(0, 1), Some(1));
        assert_eq!(project.scenes[1].narration_text, "a");
    }

    #[test]
    fn test_project_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");

        let mut project = Project::new("demo");
        let scene = project.add_scene();
        scene.media_kind = MediaKind::Image;
        scene.media_path = Some(PathBuf::from("/media/slide.png"));
        scene.subtitle_text = "テスト字幕".to_string();
        project.save(&path).unwrap();

        let loaded = Project::load(&path).unwrap();
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.scenes.len(), 1);
        assert_eq!(loaded.scenes[0].subtitle_text, "テスト字幕");
        assert_eq!(loaded.output.resolution, Resolution::PORTRAIT);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = Project::load(Path::new("/nonexistent/project.json")).unwrap_err();
        assert!(matches!(err, KamishibaiError::FileNotFound { .. }));
    }
}
