//! Export orchestration: project in, finished video out.
//!
//! The pipeline walks the scene list in order, resolves narration and
//! durations, renders each scene into a clip, and concatenates the clips.
//! All intermediate files live in one scratch directory that is removed
//! when the export ends, successfully or not.

use std::path::{Path, PathBuf};

use kamishibai_common::{KamishibaiError, KamishibaiResult};
use kamishibai_narration::{AudioCache, NarrationSynthesizer};
use kamishibai_project_model::{MediaKind, Project, Scene};

use crate::compose::VideoComposer;
use crate::duration::{resolve_scene, SILENCE_PAD_SECS};
use crate::encoder::Encoder;
use crate::font::{select_font, FontResolver};
use crate::scene::{AudioPolicy, RenderJob, RenderStage, SceneRenderer};

/// Stages of an export, in order of first appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Narration,
    BaseClip,
    SubtitleBurnIn,
    AudioMux,
    Compose,
    Complete,
}

impl ExportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStage::Narration => "narration",
            ExportStage::BaseClip => "base clip",
            ExportStage::SubtitleBurnIn => "subtitle burn-in",
            ExportStage::AudioMux => "audio mux",
            ExportStage::Compose => "compose",
            ExportStage::Complete => "complete",
        }
    }
}

impl From<RenderStage> for ExportStage {
    fn from(stage: RenderStage) -> Self {
        match stage {
            RenderStage::BaseClip => ExportStage::BaseClip,
            RenderStage::SubtitleBurnIn => ExportStage::SubtitleBurnIn,
            RenderStage::AudioMux => ExportStage::AudioMux,
        }
    }
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// 1-based scene number, 0 for export-level stages.
    pub scene_index: usize,

    /// Total scene count.
    pub scene_count: usize,

    /// Current stage.
    pub stage: ExportStage,

    /// Human-readable detail for display.
    pub detail: String,
}

/// An export job ready to run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// The project to export.
    pub project: Project,

    /// Voice identifier passed to the synthesizer.
    pub voice: u32,

    /// Overrides the project's configured output path.
    pub output_override: Option<PathBuf>,
}

/// The collaborators an export needs. Callers inject every external
/// capability so tests run without an encoder or a synthesizer installed.
pub struct ExportContext<'a> {
    pub encoder: &'a dyn Encoder,
    pub synthesizer: &'a dyn NarrationSynthesizer,
    pub cache: &'a AudioCache,
    pub font: &'a dyn FontResolver,
    /// Explicit font file, taking precedence over the resolver.
    pub font_override: Option<PathBuf>,
}

/// Export the project to a video file.
///
/// This is the main entry point for rendering.
pub async fn export_project(
    ctx: &ExportContext<'_>,
    job: &ExportJob,
    progress: Option<ProgressCallback>,
) -> KamishibaiResult<PathBuf> {
    tracing::info!(
        project = %job.project.name,
        scenes = job.project.scenes.len(),
        "Starting export"
    );
    export(ctx, job, progress)
}

/// Blocking export implementation.
pub fn export(
    ctx: &ExportContext<'_>,
    job: &ExportJob,
    progress: Option<ProgressCallback>,
) -> KamishibaiResult<PathBuf> {
    let output = job
        .output_override
        .clone()
        .unwrap_or_else(|| job.project.output.path.clone());

    validate(&job.project)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let work_dir = tempfile::Builder::new()
        .prefix("kamishibai-export-")
        .tempdir()?;
    let scene_count = job.project.scenes.len();
    let font_path = select_font(ctx.font_override.as_deref(), ctx.font);
    let renderer = SceneRenderer::new(ctx.encoder, font_path);

    let report = |scene_index: usize, stage: ExportStage, detail: String| {
        if let Some(cb) = &progress {
            cb(ExportProgress {
                scene_index,
                scene_count,
                stage,
                detail,
            });
        }
    };

    let mut clips = Vec::with_capacity(scene_count);
    for (index, source) in job.project.scenes.iter().enumerate() {
        let scene_number = index + 1;
        let mut scene = source.clone();

        report(
            scene_number,
            ExportStage::Narration,
            format!("scene {scene_number}/{scene_count}"),
        );
        let narration = prepare_narration(ctx, &scene, job.voice)?;
        let narration_secs = narration.as_ref().map(|n| n.seconds);

        let duration = resolve_scene(&mut scene, narration_secs);
        if let Some(audio_secs) = narration_secs {
            let needed = audio_secs + 2.0 * SILENCE_PAD_SECS;
            if needed > duration + 1e-6 {
                tracing::warn!(
                    scene = %scene.id,
                    audio_secs,
                    duration,
                    "Fixed duration shorter than narration; audio will be cut off"
                );
            }
        }

        let render_job = RenderJob {
            scene: &scene,
            duration_secs: duration,
            resolution: job.project.output.resolution,
            fps: job.project.output.fps,
            audio: AudioPolicy::for_scene(&scene, narration.map(|n| n.path))?,
            work_dir: work_dir.path(),
            clip_stem: format!("scene_{scene_number:03}"),
        };

        let clip = renderer.render(&render_job, &mut |stage| {
            report(
                scene_number,
                stage.into(),
                format!("scene {scene_number}/{scene_count}"),
            );
        })?;
        scene.clip_path = Some(clip.clone());
        clips.push(clip);
    }

    report(0, ExportStage::Compose, format!("{scene_count} clips"));
    VideoComposer::new(ctx.encoder).concat(&clips, &output)?;

    report(0, ExportStage::Complete, output.display().to_string());
    tracing::info!(output = %output.display(), "Export complete");
    Ok(output)
}

struct NarrationAudio {
    path: PathBuf,
    seconds: f64,
}

/// Resolve a scene's narration to a cached audio file, synthesizing on a
/// cache miss. Scenes without narration (or retaining their own audio)
/// yield nothing.
fn prepare_narration(
    ctx: &ExportContext<'_>,
    scene: &Scene,
    voice: u32,
) -> KamishibaiResult<Option<NarrationAudio>> {
    let text = scene.narration_text.trim();
    if text.is_empty() || scene.retain_media_audio {
        return Ok(None);
    }

    if let Some(seconds) = ctx.cache.duration(text, voice)? {
        tracing::debug!(scene = %scene.id, seconds, "Narration cache hit");
        return Ok(Some(NarrationAudio {
            path: ctx.cache.path(text, voice),
            seconds,
        }));
    }

    tracing::debug!(scene = %scene.id, "Narration cache miss, synthesizing");
    let wav = ctx.synthesizer.synthesize(text, voice)?;
    let path = ctx.cache.save(text, voice, &wav)?;
    let seconds = ctx.cache.duration(text, voice)?.ok_or_else(|| {
        KamishibaiError::synthesis("synthesizer returned unreadable audio data")
    })?;
    Ok(Some(NarrationAudio { path, seconds }))
}

/// Reject projects that cannot possibly export before any encoder work.
fn validate(project: &Project) -> KamishibaiResult<()> {
    if project.scenes.is_empty() {
        return Err(KamishibaiError::invalid_input(
            "project has no scenes to export",
        ));
    }
    project.output.validate()?;

    for (index, scene) in project.scenes.iter().enumerate() {
        let label = format!("scene {}", index + 1);
        if scene.fixed_seconds <= 0.0 {
            return Err(KamishibaiError::invalid_input(format!(
                "{label}: fixed duration must be positive"
            )));
        }
        if scene.media_kind != MediaKind::None {
            let path = scene.media_path.as_ref().ok_or_else(|| {
                KamishibaiError::invalid_input(format!("{label}: media kind set but no path"))
            })?;
            if !path.exists() {
                return Err(KamishibaiError::FileNotFound { path: path.clone() });
            }
        }
        // Surfaces flag conflicts before any rendering starts.
        AudioPolicy::for_scene(scene, None)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::testing::ScriptedEncoder;
    use crate::font::FixedFont;
    use kamishibai_project_model::{MediaKind, OutputConfig, Resolution};
    use std::sync::Mutex;

    struct FixtureSynthesizer {
        wav: Vec<u8>,
        calls: Mutex<usize>,
    }

    impl FixtureSynthesizer {
        fn new(wav: Vec<u8>) -> Self {
            Self {
                wav,
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl NarrationSynthesizer for FixtureSynthesizer {
        fn synthesize(&self, _text: &str, _voice: u32) -> KamishibaiResult<Vec<u8>> {
            *self.calls.lock().unwrap() += 1;
            Ok(self.wav.clone())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fixture"
        }
    }

    /// A 1.40 s mono WAV at 24 kHz.
    fn narration_wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..33_600 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn project(dir: &Path, scenes: Vec<Scene>) -> Project {
        let mut project = Project::new("test");
        project.scenes = scenes;
        project.output = OutputConfig {
            resolution: Resolution::PORTRAIT,
            fps: 30,
            path: dir.join("out").join("final.mp4"),
        };
        project
    }

    fn image_scene(dir: &Path, name: &str) -> Scene {
        let media = dir.join(format!("{name}.png"));
        std::fs::write(&media, b"png").unwrap();
        Scene {
            media_path: Some(media),
            media_kind: MediaKind::Image,
            ..Scene::new()
        }
    }

    struct Fixture {
        cache: AudioCache,
        synthesizer: FixtureSynthesizer,
        font: FixedFont,
    }

    impl Fixture {
        fn new(dir: &tempfile::TempDir) -> Self {
            Self {
                cache: AudioCache::new(dir.path().join("audio-cache")).unwrap(),
                synthesizer: FixtureSynthesizer::new(narration_wav()),
                font: FixedFont::new("/fonts/test.ttc"),
            }
        }

        fn ctx<'a>(&'a self, encoder: &'a ScriptedEncoder) -> ExportContext<'a> {
            ExportContext {
                encoder,
                synthesizer: &self.synthesizer,
                cache: &self.cache,
                font: &self.font,
                font_override: None,
            }
        }
    }

    #[test]
    fn test_export_three_silent_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let job = ExportJob {
            project: project(
                dir.path(),
                vec![
                    image_scene(dir.path(), "a"),
                    image_scene(dir.path(), "b"),
                    image_scene(dir.path(), "c"),
                ],
            ),
            voice: 1,
            output_override: None,
        };

        let output = export(&fixture.ctx(&encoder), &job, None).unwrap();
        assert!(output.exists());
        // One base-clip call per scene plus the concat.
        assert_eq!(encoder.call_count(), 4);
        assert_eq!(encoder.call(3)[1], "concat");
    }

    #[test]
    fn test_export_synthesizes_and_caches_narration() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let mut scene = image_scene(dir.path(), "a");
        scene.narration_text = "こんにちは、世界".to_string();
        let job = ExportJob {
            project: project(dir.path(), vec![scene]),
            voice: 1,
            output_override: None,
        };

        export(&fixture.ctx(&encoder), &job, None).unwrap();
        assert_eq!(fixture.synthesizer.call_count(), 1);

        // Base clip + audio mux + (single clip, so no concat call).
        assert_eq!(encoder.call_count(), 2);
        // Auto mode: 1.40 s audio resolves to a 3.40 s scene.
        assert!(encoder.call(0).contains(&"3.400".to_string()));

        // Second export hits the cache.
        export(&fixture.ctx(&encoder), &job, None).unwrap();
        assert_eq!(fixture.synthesizer.call_count(), 1);
    }

    #[test]
    fn test_failed_scene_stops_the_export() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::failing_on(2);
        let job = ExportJob {
            project: project(
                dir.path(),
                vec![
                    image_scene(dir.path(), "a"),
                    image_scene(dir.path(), "b"),
                    image_scene(dir.path(), "c"),
                ],
            ),
            voice: 1,
            output_override: None,
        };

        let err = export(&fixture.ctx(&encoder), &job, None).unwrap_err();
        match err {
            KamishibaiError::Stage { stage, .. } => assert_eq!(stage, "base clip"),
            other => panic!("expected stage error, got {other:?}"),
        }
        // The third scene is never attempted and no output appears.
        assert_eq!(encoder.call_count(), 2);
        assert!(!dir.path().join("out").join("final.mp4").exists());
    }

    #[test]
    fn test_empty_project_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let job = ExportJob {
            project: project(dir.path(), Vec::new()),
            voice: 1,
            output_override: None,
        };

        let err = export(&fixture.ctx(&encoder), &job, None).unwrap_err();
        assert!(matches!(err, KamishibaiError::InvalidInput { .. }));
        assert_eq!(encoder.call_count(), 0);
    }

    #[test]
    fn test_missing_media_fails_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let scene = Scene {
            media_path: Some(dir.path().join("missing.png")),
            media_kind: MediaKind::Image,
            ..Scene::new()
        };
        let job = ExportJob {
            project: project(dir.path(), vec![scene]),
            voice: 1,
            output_override: None,
        };

        let err = export(&fixture.ctx(&encoder), &job, None).unwrap_err();
        assert!(matches!(err, KamishibaiError::FileNotFound { .. }));
        assert_eq!(encoder.call_count(), 0);
    }

    #[test]
    fn test_output_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let override_path = dir.path().join("elsewhere.mp4");
        let job = ExportJob {
            project: project(dir.path(), vec![image_scene(dir.path(), "a")]),
            voice: 1,
            output_override: Some(override_path.clone()),
        };

        let output = export(&fixture.ctx(&encoder), &job, None).unwrap();
        assert_eq!(output, override_path);
        assert!(override_path.exists());
    }

    #[test]
    fn test_progress_reports_walk_the_stages() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = Fixture::new(&dir);
        let encoder = ScriptedEncoder::new();
        let mut scene = image_scene(dir.path(), "a");
        scene.subtitle_text = "こんにちは".to_string();
        let job = ExportJob {
            project: project(dir.path(), vec![scene]),
            voice: 1,
            output_override: None,
        };

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p.stage));
        export(&fixture.ctx(&encoder), &job, Some(cb)).unwrap();

        let stages = seen.lock().unwrap().clone();
        assert_eq!(
            stages,
            vec![
                ExportStage::Narration,
                ExportStage::BaseClip,
                ExportStage::SubtitleBurnIn,
                ExportStage::AudioMux,
                ExportStage::Compose,
                ExportStage::Complete,
            ]
        );
    }
}
