//! Export a project to video.

use std::path::PathBuf;

use kamishibai_common::config::AppConfig;
use kamishibai_narration::{AudioCache, NullSynthesizer};
use kamishibai_project_model::Project;
use kamishibai_render_engine::pipeline::{
    export_project, ExportContext, ExportJob, ExportProgress,
};
use kamishibai_render_engine::{FfmpegEncoder, SystemFontResolver};

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    voice: u32,
    font: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Exporting project: {}", path.display());

    let project =
        Project::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let config = AppConfig::load();
    let encoder =
        FfmpegEncoder::discover().map_err(|e| anyhow::anyhow!("Encoder not available: {e}"))?;
    let cache = AudioCache::new(&config.cache_dir)?;
    let synthesizer = NullSynthesizer;
    let resolver = SystemFontResolver;

    let output_path = output
        .clone()
        .unwrap_or_else(|| project.output.path.clone());
    println!("  Output: {}", output_path.display());
    println!("  Resolution: {}", project.output.resolution);
    println!("  Scenes: {}", project.scenes.len());

    let ctx = ExportContext {
        encoder: &encoder,
        synthesizer: &synthesizer,
        cache: &cache,
        font: &resolver,
        font_override: font.or(config.font_path.clone()),
    };
    let job = ExportJob {
        project,
        voice,
        output_override: output,
    };

    let progress_cb: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p| {
        if p.scene_index > 0 {
            println!(
                "  [{}/{}] {} ({})",
                p.scene_index,
                p.scene_count,
                p.stage.as_str(),
                p.detail
            );
        } else {
            println!("  {} ({})", p.stage.as_str(), p.detail);
        }
    });

    match export_project(&ctx, &job, Some(progress_cb)).await {
        Ok(final_path) => {
            println!("Export complete: {}", final_path.display());
        }
        Err(e) => {
            println!("Export failed: {e}");
        }
    }

    Ok(())
}
