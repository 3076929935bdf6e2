//! Per-scene clip rendering.
//!
//! Each scene becomes one encoded clip through three ordered stages:
//! base clip (media -> normalized video), subtitle burn-in, audio mux.
//! Every stage is a single encoder invocation producing a new temp file and
//! deleting its predecessor on success.

use std::path::{Path, PathBuf};

use kamishibai_common::{KamishibaiError, KamishibaiResult};
use kamishibai_project_model::{MediaKind, Resolution, Scene};

use crate::duration::SILENCE_PAD_SECS;
use crate::encoder::Encoder;
use crate::subtitle::{escape_filter_path, wrap_subtitle};

/// Audio codec bitrate for muxed narration.
pub const AUDIO_BITRATE: &str = "192k";

/// Working sample rate for generated silence and narration resampling.
const MUX_SAMPLE_RATE: u32 = 44_100;

/// Subtitle band height as a fraction of frame height (fits two lines).
const SUBTITLE_BAND_FRAC: f64 = 0.12;
/// Safety margin kept between the band and the bottom edge.
const SUBTITLE_MARGIN_FRAC: f64 = 0.03;
/// Subtitle font size as a fraction of frame height.
const SUBTITLE_FONT_FRAC: f64 = 0.035;

/// The three encoder stages of a scene render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    BaseClip,
    SubtitleBurnIn,
    AudioMux,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::BaseClip => "base clip",
            RenderStage::SubtitleBurnIn => "subtitle burn-in",
            RenderStage::AudioMux => "audio mux",
        }
    }
}

/// What the final clip's audio track is built from.
///
/// Modeled as a tagged variant so "retain original audio" and "add
/// narration" cannot be combined by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPolicy {
    /// No audio track beyond the silent base clip.
    Silent,
    /// Narration (with silence padding) replaces any source audio.
    Narration(PathBuf),
    /// The source video's own audio passes through untouched.
    KeepOriginal,
    /// Narration (with silence padding) mixed into the source audio.
    Mixed(PathBuf),
}

impl AudioPolicy {
    /// Derive the audio policy for a scene from its flags and the resolved
    /// narration audio file, rejecting invalid combinations.
    pub fn for_scene(scene: &Scene, narration_audio: Option<PathBuf>) -> KamishibaiResult<Self> {
        if scene.retain_media_audio {
            if scene.media_kind != MediaKind::Video {
                return Err(KamishibaiError::invalid_input(format!(
                    "scene {}: retain_media_audio requires video media",
                    scene.id
                )));
            }
            if narration_audio.is_some() || scene.has_narration() {
                return Err(KamishibaiError::invalid_input(format!(
                    "scene {}: retain_media_audio and narration are mutually exclusive",
                    scene.id
                )));
            }
            return Ok(AudioPolicy::KeepOriginal);
        }
        match narration_audio {
            Some(audio) if scene.mix_narration && scene.media_kind == MediaKind::Video => {
                Ok(AudioPolicy::Mixed(audio))
            }
            Some(audio) => Ok(AudioPolicy::Narration(audio)),
            None => Ok(AudioPolicy::Silent),
        }
    }

    /// Whether the base clip must carry the source's own audio forward.
    fn keeps_source_audio(&self) -> bool {
        matches!(self, AudioPolicy::KeepOriginal | AudioPolicy::Mixed(_))
    }
}

/// Everything needed to render one scene clip. Ephemeral: built per scene
/// per export and discarded once the clip exists (or the scene failed).
#[derive(Debug)]
pub struct RenderJob<'a> {
    pub scene: &'a Scene,
    pub duration_secs: f64,
    pub resolution: Resolution,
    pub fps: u32,
    pub audio: AudioPolicy,
    /// Export-owned scratch directory for stage temp files and the clip.
    pub work_dir: &'a Path,
    /// File stem for this scene's artifacts, e.g. `scene_001`.
    pub clip_stem: String,
}

/// Renders one scene into one encoded clip.
pub struct SceneRenderer<'a> {
    encoder: &'a dyn Encoder,
    font_path: PathBuf,
}

impl<'a> SceneRenderer<'a> {
    pub fn new(encoder: &'a dyn Encoder, font_path: PathBuf) -> Self {
        Self { encoder, font_path }
    }

    /// Run the stage chain. `on_stage` fires as each stage starts.
    pub fn render(
        &self,
        job: &RenderJob<'_>,
        on_stage: &mut dyn FnMut(RenderStage),
    ) -> KamishibaiResult<PathBuf> {
        on_stage(RenderStage::BaseClip);
        let mut current = self.base_clip(job)?;

        if job.scene.has_subtitle() {
            on_stage(RenderStage::SubtitleBurnIn);
            current = self.burn_subtitle(job, &current)?;
        }

        on_stage(RenderStage::AudioMux);
        let clip = self.mux_audio(job, &current)?;

        tracing::debug!(clip = %clip.display(), "Scene clip rendered");
        Ok(clip)
    }

    /// Stage 1: normalize the scene media into a silent (or
    /// source-audio-carrying) video of the resolved duration.
    fn base_clip(&self, job: &RenderJob<'_>) -> KamishibaiResult<PathBuf> {
        let output = job.work_dir.join(format!("{}_base.mp4", job.clip_stem));
        let args = self.build_base_args(job, &output)?;
        self.run_stage(RenderStage::BaseClip, &args, &output)?;
        Ok(output)
    }

    fn build_base_args(&self, job: &RenderJob<'_>, output: &Path) -> KamishibaiResult<Vec<String>> {
        let Resolution { width, height } = job.resolution;
        let duration = format_secs(job.duration_secs);
        let scale_pad = scale_pad_filter(job.resolution);
        let fps = job.fps.to_string();

        let mut args: Vec<String> = Vec::new();
        match job.scene.media_kind {
            MediaKind::Image => {
                let media = self.require_media(job.scene)?;
                args.extend(str_args(["-loop", "1", "-i"]));
                args.push(media.display().to_string());
                args.extend(str_args(["-t"]));
                args.push(duration);
                args.extend(str_args(["-vf"]));
                args.push(scale_pad);
                args.extend(str_args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-r"]));
                args.push(fps);
            }
            MediaKind::Video => {
                let media = self.require_media(job.scene)?;
                if job.audio == AudioPolicy::KeepOriginal {
                    // Natural length, own audio: no trim, no loop.
                    args.extend(str_args(["-i"]));
                    args.push(media.display().to_string());
                    args.extend(str_args(["-vf"]));
                    args.push(scale_pad);
                    args.extend(str_args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-r"]));
                    args.push(fps);
                    args.extend(str_args(["-c:a", "copy"]));
                } else {
                    let source_secs = self.encoder.probe_duration(&media)?;
                    let loop_source = match source_secs {
                        Some(secs) => secs < job.duration_secs,
                        None => {
                            tracing::warn!(
                                media = %media.display(),
                                "Could not probe source duration; trimming without loop"
                            );
                            false
                        }
                    };
                    if loop_source {
                        args.extend(str_args(["-stream_loop", "-1"]));
                    }
                    args.extend(str_args(["-i"]));
                    args.push(media.display().to_string());
                    args.extend(str_args(["-t"]));
                    args.push(duration);
                    args.extend(str_args(["-vf"]));
                    args.push(scale_pad);
                    args.extend(str_args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-r"]));
                    args.push(fps);
                    if job.audio.keeps_source_audio() {
                        args.extend(str_args(["-c:a", "aac"]));
                    } else {
                        args.push("-an".to_string());
                    }
                }
            }
            MediaKind::None => {
                args.extend(str_args(["-f", "lavfi", "-i"]));
                args.push(format!(
                    "color=c=black:s={width}x{height}:d={duration}:r={fps}"
                ));
                args.extend(str_args(["-c:v", "libx264", "-pix_fmt", "yuv420p"]));
            }
        }

        args.push("-y".to_string());
        args.push(output.display().to_string());
        Ok(args)
    }

    /// Stage 2: draw an opaque band near the bottom of the frame and center
    /// the wrapped subtitle text in it. Video re-encodes, audio copies.
    fn burn_subtitle(&self, job: &RenderJob<'_>, input: &Path) -> KamishibaiResult<PathBuf> {
        let output = job.work_dir.join(format!("{}_sub.mp4", job.clip_stem));
        let text_file = job.work_dir.join(format!("{}_subtitle.txt", job.clip_stem));

        let wrapped = wrap_subtitle(job.scene.subtitle_text.trim());
        std::fs::write(&text_file, &wrapped)?;

        let filter = subtitle_filter(job.resolution, &self.font_path, &text_file);
        let mut args: Vec<String> = vec!["-i".into(), input.display().to_string()];
        args.extend(str_args(["-vf"]));
        args.push(filter);
        args.extend(str_args([
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "copy", "-y",
        ]));
        args.push(output.display().to_string());

        let result = self.run_stage(RenderStage::SubtitleBurnIn, &args, &output);
        let _ = std::fs::remove_file(&text_file);
        result?;

        let _ = std::fs::remove_file(input);
        Ok(output)
    }

    /// Stage 3: attach the audio track chosen by the scene's policy.
    fn mux_audio(&self, job: &RenderJob<'_>, input: &Path) -> KamishibaiResult<PathBuf> {
        let output = job.work_dir.join(format!("{}.mp4", job.clip_stem));

        match &job.audio {
            // Already final: silent base or retained source audio.
            AudioPolicy::Silent | AudioPolicy::KeepOriginal => {
                std::fs::copy(input, &output)?;
            }
            AudioPolicy::Narration(audio) => {
                let args = build_mux_args(input, audio, &output, false);
                self.run_stage(RenderStage::AudioMux, &args, &output)?;
            }
            AudioPolicy::Mixed(audio) => {
                let args = build_mux_args(input, audio, &output, true);
                self.run_stage(RenderStage::AudioMux, &args, &output)?;
            }
        }

        let _ = std::fs::remove_file(input);
        Ok(output)
    }

    fn require_media(&self, scene: &Scene) -> KamishibaiResult<PathBuf> {
        let path = scene.media_path.clone().ok_or_else(|| {
            KamishibaiError::invalid_input(format!("scene {}: media kind set but no path", scene.id))
        })?;
        if !path.exists() {
            return Err(KamishibaiError::FileNotFound { path });
        }
        Ok(path)
    }

    fn run_stage(
        &self,
        stage: RenderStage,
        args: &[String],
        output: &Path,
    ) -> KamishibaiResult<()> {
        if let Err(err) = self.encoder.run(args) {
            let _ = std::fs::remove_file(output);
            return Err(match err {
                unavailable @ KamishibaiError::EncoderUnavailable { .. } => unavailable,
                other => KamishibaiError::stage(stage.as_str(), other.to_string()),
            });
        }
        Ok(())
    }
}

/// Scale into the target frame preserving aspect ratio, pad the rest.
pub(crate) fn scale_pad_filter(resolution: Resolution) -> String {
    let Resolution { width, height } = resolution;
    format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
    )
}

fn subtitle_filter(resolution: Resolution, font_path: &Path, text_file: &Path) -> String {
    let Resolution { width, height } = resolution;
    let band_h = (height as f64 * SUBTITLE_BAND_FRAC).round() as u32;
    let margin = (height as f64 * SUBTITLE_MARGIN_FRAC).round() as u32;
    let band_y = height - band_h - margin;
    let font_size = (height as f64 * SUBTITLE_FONT_FRAC).round() as u32;

    let font = escape_filter_path(font_path);
    let text = escape_filter_path(text_file);

    format!(
        "drawbox=x=0:y={band_y}:w={width}:h={band_h}:color=black@0.7:t=fill,\
         drawtext=fontfile='{font}':textfile='{text}':\
         fontcolor=white:fontsize={font_size}:\
         x=(w-text_w)/2:y={band_y}+({band_h}-text_h)/2"
    )
}

/// Arguments for the narration mux: leading and trailing silence generated
/// around the spoken segment, optionally mixed with the clip's own audio.
/// `-shortest` enforces the resolved duration (shortest stream wins).
fn build_mux_args(input: &Path, audio: &Path, output: &Path, mix: bool) -> Vec<String> {
    let pad = format_secs(SILENCE_PAD_SECS);
    let mut filter = format!(
        "aevalsrc=0:d={pad}:s={rate}[pre];\
         aevalsrc=0:d={pad}:s={rate}[post];\
         [1:a]aresample={rate}[spoken];\
         [pre][spoken][post]concat=n=3:v=0:a=1",
        rate = MUX_SAMPLE_RATE,
    );
    if mix {
        filter.push_str(&format!(
            "[nar];[0:a]aresample={rate}[own];\
             [own][nar]amix=inputs=2:duration=first[aout]",
            rate = MUX_SAMPLE_RATE,
        ));
    } else {
        filter.push_str("[aout]");
    }

    let mut args: Vec<String> = vec!["-i".into(), input.display().to_string()];
    args.push("-i".into());
    args.push(audio.display().to_string());
    args.extend(str_args(["-filter_complex"]));
    args.push(filter);
    args.extend(str_args(["-map", "0:v", "-map", "[aout]"]));
    args.extend(str_args(["-c:v", "copy", "-c:a", "aac", "-b:a"]));
    args.push(AUDIO_BITRATE.to_string());
    args.extend(str_args(["-shortest", "-y"]));
    args.push(output.display().to_string());
    args
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}")
}

fn str_args<const N: usize>(args: [&str; N]) -> impl Iterator<Item = String> + '_ {
    args.into_iter().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::testing::ScriptedEncoder;
    use kamishibai_project_model::DurationMode;

    fn image_scene(dir: &Path) -> Scene {
        let media = dir.join("slide.png");
        std::fs::write(&media, b"png").unwrap();
        Scene {
            media_path: Some(media),
            media_kind: MediaKind::Image,
            ..Scene::new()
        }
    }

    fn video_scene(dir: &Path) -> Scene {
        let media = dir.join("clip.mp4");
        std::fs::write(&media, b"mp4").unwrap();
        Scene {
            media_path: Some(media),
            media_kind: MediaKind::Video,
            ..Scene::new()
        }
    }

    fn job<'a>(scene: &'a Scene, dir: &'a Path, audio: AudioPolicy) -> RenderJob<'a> {
        RenderJob {
            scene,
            duration_secs: 3.0,
            resolution: Resolution::PORTRAIT,
            fps: 30,
            audio,
            work_dir: dir,
            clip_stem: "scene_001".to_string(),
        }
    }

    fn render(encoder: &ScriptedEncoder, job: &RenderJob<'_>) -> KamishibaiResult<PathBuf> {
        let renderer = SceneRenderer::new(encoder, PathBuf::from("/fonts/test.ttc"));
        let mut stages = Vec::new();
        renderer.render(job, &mut |s| stages.push(s))
    }

    #[test]
    fn test_image_scene_loops_still_for_duration() {
        let dir = tempfile::tempdir().unwrap();
        let scene = image_scene(dir.path());
        let encoder = ScriptedEncoder::new();

        let clip = render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        assert!(clip.exists());
        assert_eq!(encoder.call_count(), 1);

        let args = encoder.call(0);
        assert_eq!(&args[..2], &["-loop".to_string(), "1".to_string()]);
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"3.000".to_string()));
        assert!(args.iter().any(|a| a.contains("force_original_aspect_ratio=decrease")));
        // Silent scene: the base clip is copied through, predecessor removed.
        assert!(!dir.path().join("scene_001_base.mp4").exists());
    }

    #[test]
    fn test_blank_scene_generates_filler() {
        let dir = tempfile::tempdir().unwrap();
        let scene = Scene::new();
        let encoder = ScriptedEncoder::new();

        let clip = render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        assert!(clip.exists());
        let args = encoder.call(0);
        assert_eq!(&args[..2], &["-f".to_string(), "lavfi".to_string()]);
        assert!(args.iter().any(|a| a.contains("color=c=black:s=1080x1920:d=3.000:r=30")));
    }

    #[test]
    fn test_short_video_source_is_looped() {
        let dir = tempfile::tempdir().unwrap();
        let scene = video_scene(dir.path());
        let media = scene.media_path.clone().unwrap();
        let encoder = ScriptedEncoder::new().with_duration(&media, 1.0);

        render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        let args = encoder.call(0);
        assert_eq!(&args[..2], &["-stream_loop".to_string(), "-1".to_string()]);
        assert!(args.contains(&"-an".to_string()));
    }

    #[test]
    fn test_long_video_source_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let scene = video_scene(dir.path());
        let media = scene.media_path.clone().unwrap();
        let encoder = ScriptedEncoder::new().with_duration(&media, 10.0);

        render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        let args = encoder.call(0);
        assert!(!args.contains(&"-stream_loop".to_string()));
        assert!(args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_keep_original_passes_source_through_untrimmed() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = video_scene(dir.path());
        scene.retain_media_audio = true;
        let encoder = ScriptedEncoder::new();

        render(&encoder, &job(&scene, dir.path(), AudioPolicy::KeepOriginal)).unwrap();
        // Pass-through keeps natural length and own audio; mux stage copies.
        assert_eq!(encoder.call_count(), 1);
        let args = encoder.call(0);
        assert!(!args.contains(&"-t".to_string()));
        assert!(!args.contains(&"-an".to_string()));
        let pos = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[pos + 1], "copy");
    }

    #[test]
    fn test_subtitle_stage_burns_band_and_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = image_scene(dir.path());
        scene.subtitle_text = "こんにちは".to_string();
        let encoder = ScriptedEncoder::new();

        render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        assert_eq!(encoder.call_count(), 2);

        let args = encoder.call(1);
        let vf = args[args.iter().position(|a| a == "-vf").unwrap() + 1].clone();
        assert!(vf.contains("drawbox="));
        assert!(vf.contains("color=black@0.7"));
        assert!(vf.contains("drawtext=fontfile='/fonts/test.ttc'"));
        assert!(vf.contains("textfile="));
        // Audio copies untouched during burn-in.
        let pos = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[pos + 1], "copy");
        // Stage scratch files are gone.
        assert!(!dir.path().join("scene_001_subtitle.txt").exists());
        assert!(!dir.path().join("scene_001_base.mp4").exists());
    }

    #[test]
    fn test_narration_mux_pads_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let scene = image_scene(dir.path());
        let audio = dir.path().join("narration.wav");
        std::fs::write(&audio, b"wav").unwrap();
        let encoder = ScriptedEncoder::new();

        render(
            &encoder,
            &job(&scene, dir.path(), AudioPolicy::Narration(audio)),
        )
        .unwrap();
        assert_eq!(encoder.call_count(), 2);

        let args = encoder.call(1);
        let fc = args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1].clone();
        assert!(fc.contains("aevalsrc=0:d=1.000"));
        assert!(fc.contains("concat=n=3:v=0:a=1"));
        assert!(!fc.contains("amix"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"[aout]".to_string()));
        let pos = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[pos + 1], "copy");
    }

    #[test]
    fn test_mixed_policy_amixes_source_audio() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = video_scene(dir.path());
        scene.mix_narration = true;
        let media = scene.media_path.clone().unwrap();
        let audio = dir.path().join("narration.wav");
        std::fs::write(&audio, b"wav").unwrap();
        let encoder = ScriptedEncoder::new().with_duration(&media, 10.0);

        render(&encoder, &job(&scene, dir.path(), AudioPolicy::Mixed(audio))).unwrap();

        // Base stage keeps the source audio for the mix.
        let base_args = encoder.call(0);
        assert!(!base_args.contains(&"-an".to_string()));

        let mux_args = encoder.call(1);
        let fc = mux_args
            [mux_args.iter().position(|a| a == "-filter_complex").unwrap() + 1]
            .clone();
        assert!(fc.contains("amix=inputs=2:duration=first"));
    }

    #[test]
    fn test_stage_failure_names_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let scene = image_scene(dir.path());
        let encoder = ScriptedEncoder::failing_on(1);

        let err = render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap_err();
        match err {
            KamishibaiError::Stage { stage, message } => {
                assert_eq!(stage, "base clip");
                assert!(message.contains("scripted failure"));
            }
            other => panic!("expected stage error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_media_is_rejected_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let scene = Scene {
            media_path: Some(dir.path().join("gone.png")),
            media_kind: MediaKind::Image,
            ..Scene::new()
        };
        let encoder = ScriptedEncoder::new();

        let err = render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap_err();
        assert!(matches!(err, KamishibaiError::FileNotFound { .. }));
        assert_eq!(encoder.call_count(), 0);
    }

    #[test]
    fn test_audio_policy_rejects_retain_plus_narration() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = video_scene(dir.path());
        scene.retain_media_audio = true;
        scene.narration_text = "こんにちは".to_string();

        let err = AudioPolicy::for_scene(&scene, None).unwrap_err();
        assert!(matches!(err, KamishibaiError::InvalidInput { .. }));
    }

    #[test]
    fn test_audio_policy_rejects_retain_on_non_video() {
        let mut scene = Scene::new();
        scene.retain_media_audio = true;
        assert!(AudioPolicy::for_scene(&scene, None).is_err());
    }

    #[test]
    fn test_audio_policy_mix_requires_video() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = image_scene(dir.path());
        scene.mix_narration = true;
        let policy = AudioPolicy::for_scene(&scene, Some(PathBuf::from("/a.wav"))).unwrap();
        // An image has no audio to mix into; narration replaces silence.
        assert!(matches!(policy, AudioPolicy::Narration(_)));
    }

    #[test]
    fn test_fixed_scene_duration_mode_does_not_change_args() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = image_scene(dir.path());
        scene.duration_mode = DurationMode::Fixed;
        let encoder = ScriptedEncoder::new();
        render(&encoder, &job(&scene, dir.path(), AudioPolicy::Silent)).unwrap();
        assert!(encoder.call(0).contains(&"3.000".to_string()));
    }
}
