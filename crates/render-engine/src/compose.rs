//! Final assembly: concatenate scene clips into the output video.
//!
//! The clips all come out of the same render settings, so the default path
//! is the stream-copy concat demuxer. A re-encoding variant exists for
//! stitching clips of mixed provenance.

use std::io::Write;
use std::path::{Path, PathBuf};

use kamishibai_common::{KamishibaiError, KamishibaiResult};
use kamishibai_project_model::Resolution;

use crate::encoder::Encoder;
use crate::scene::{scale_pad_filter, AUDIO_BITRATE};

/// Joins rendered scene clips in order.
pub struct VideoComposer<'a> {
    encoder: &'a dyn Encoder,
}

impl<'a> VideoComposer<'a> {
    pub fn new(encoder: &'a dyn Encoder) -> Self {
        Self { encoder }
    }

    /// Concatenate `clips` into `output` without re-encoding.
    ///
    /// A single clip is copied directly. An empty list is an error: the
    /// caller decides what an empty timeline means, not this layer.
    pub fn concat(&self, clips: &[PathBuf], output: &Path) -> KamishibaiResult<()> {
        match clips {
            [] => Err(KamishibaiError::invalid_input(
                "cannot compose a video from zero clips",
            )),
            [single] => {
                std::fs::copy(single, output)?;
                Ok(())
            }
            many => {
                // NamedTempFile removes the manifest when this scope ends,
                // on success and on failure alike.
                let manifest = write_manifest(many)?;
                let args: Vec<String> = [
                    "-f",
                    "concat",
                    "-safe",
                    "0",
                    "-i",
                    &manifest.path().display().to_string(),
                    "-c",
                    "copy",
                    "-y",
                    &output.display().to_string(),
                ]
                .into_iter()
                .map(str::to_string)
                .collect();

                self.encoder.run(&args).map_err(|err| match err {
                    unavailable @ KamishibaiError::EncoderUnavailable { .. } => unavailable,
                    other => KamishibaiError::stage("concat", other.to_string()),
                })
            }
        }
    }

    /// Concatenate clips that may disagree on codec or geometry: each clip
    /// is first re-encoded to the target resolution and frame rate, then
    /// the normalized copies are concatenated.
    pub fn concat_reencode(
        &self,
        clips: &[PathBuf],
        output: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> KamishibaiResult<()> {
        if clips.is_empty() {
            return Err(KamishibaiError::invalid_input(
                "cannot compose a video from zero clips",
            ));
        }

        let work_dir = tempfile::Builder::new()
            .prefix("kamishibai-concat-")
            .tempdir()?;

        let mut normalized = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            let target = work_dir.path().join(format!("normalized_{index:03}.mp4"));
            let args: Vec<String> = vec![
                "-i".into(),
                clip.display().to_string(),
                "-vf".into(),
                scale_pad_filter(resolution),
                "-r".into(),
                fps.to_string(),
                "-c:v".into(),
                "libx264".into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                AUDIO_BITRATE.into(),
                "-ar".into(),
                "44100".into(),
                "-y".into(),
                target.display().to_string(),
            ];
            self.encoder.run(&args).map_err(|err| match err {
                unavailable @ KamishibaiError::EncoderUnavailable { .. } => unavailable,
                other => KamishibaiError::stage("concat", other.to_string()),
            })?;
            normalized.push(target);
        }

        self.concat(&normalized, output)
    }
}

/// Write a concat-demuxer manifest: one `file '<path>'` line per clip, in
/// order, with absolute forward-slash paths so the demuxer never resolves
/// anything relative to the manifest's own location.
fn write_manifest(clips: &[PathBuf]) -> KamishibaiResult<tempfile::NamedTempFile> {
    let mut manifest = tempfile::Builder::new()
        .prefix("kamishibai-concat-")
        .suffix(".txt")
        .tempfile()?;

    for clip in clips {
        let absolute = if clip.is_absolute() {
            clip.clone()
        } else {
            std::env::current_dir()?.join(clip)
        };
        let line = absolute.to_string_lossy().replace('\\', "/");
        writeln!(manifest, "file '{line}'")?;
    }
    manifest.flush()?;
    Ok(manifest)
}
