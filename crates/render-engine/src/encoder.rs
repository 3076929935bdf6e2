//! Encoder capability and the ffmpeg implementation.
//!
//! The pipeline drives an external encoder through plain argument lists;
//! everything it needs from the binary is captured by the [`Encoder`] trait
//! so tests can substitute a scripted fake. Invocations are synchronous and
//! carry no timeout: a hung encoder blocks the export until the process is
//! killed externally.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use kamishibai_common::{KamishibaiError, KamishibaiResult};

/// Capability for running the external encoder.
pub trait Encoder: Send + Sync {
    /// Execute one encoder invocation. Inputs and outputs are referenced by
    /// filesystem paths inside `args`. A non-zero exit is an error carrying
    /// the encoder's diagnostic text verbatim.
    fn run(&self, args: &[String]) -> KamishibaiResult<()>;

    /// Container duration of a media file in seconds, `None` when the
    /// encoder cannot determine it.
    fn probe_duration(&self, path: &Path) -> KamishibaiResult<Option<f64>>;

    /// Whether the encoder binary responds right now.
    fn is_available(&self) -> bool;

    /// Encoder name for diagnostics.
    fn name(&self) -> &str;
}

/// Install locations probed when ffmpeg is not on PATH.
const COMMON_FFMPEG_PATHS: &[&str] = &[
    "C:\\ffmpeg\\bin\\ffmpeg.exe",
    "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

/// The real encoder: an ffmpeg binary on disk.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    path: PathBuf,
}

impl FfmpegEncoder {
    /// Use the binary at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locate ffmpeg on PATH, falling back to common install locations.
    pub fn discover() -> KamishibaiResult<Self> {
        if let Ok(path) = which::which("ffmpeg") {
            return Ok(Self { path });
        }
        for candidate in COMMON_FFMPEG_PATHS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(Self { path });
            }
        }
        Err(KamishibaiError::encoder_unavailable(
            "ffmpeg not found on PATH or in common install locations",
        ))
    }

    /// Path to the binary.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `ffmpeg -version`, if the binary responds.
    pub fn version(&self) -> Option<String> {
        let output = Command::new(&self.path).arg("-version").output().ok()?;
        if !output.status.success() {
            return None;
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        raw.lines().next().map(|line| line.trim().to_string())
    }
}

impl Encoder for FfmpegEncoder {
    fn run(&self, args: &[String]) -> KamishibaiResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");

        let output = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                KamishibaiError::encoder_unavailable(format!(
                    "failed to start {}: {e}",
                    self.path.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KamishibaiError::Other(anyhow::anyhow!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> KamishibaiResult<Option<f64>> {
        // ffmpeg prints stream info (including `Duration:`) on stderr.
        let output = Command::new(&self.path)
            .args(["-hide_banner", "-i"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                KamishibaiError::encoder_unavailable(format!(
                    "failed to start {}: {e}",
                    self.path.display()
                ))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(parse_duration_line(&stderr))
    }

    fn is_available(&self) -> bool {
        self.version().is_some()
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Extract seconds from an ffmpeg `Duration: HH:MM:SS.cc` stderr line.
fn parse_duration_line(stderr: &str) -> Option<f64> {
    let rest = stderr.split("Duration: ").nth(1)?;
    let field = rest.split([',', '\n']).next()?.trim();
    if field.starts_with("N/A") {
        return None;
    }
    let mut parts = field.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
