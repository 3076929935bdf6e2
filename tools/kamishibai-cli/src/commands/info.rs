//! Show project information.

use std::path::PathBuf;

use kamishibai_project_model::{DurationMode, MediaKind, Project};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project =
        Project::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("Project: {}", project.name);
    println!("  ID: {}", project.id);
    println!("  Created: {}", project.created_at);
    println!("  Modified: {}", project.modified_at);
    println!();

    println!("Output:");
    println!(
        "  {} @ {}fps -> {}",
        project.output.resolution,
        project.output.fps,
        project.output.path.display()
    );
    println!();

    println!("Scenes: {}", project.scenes.len());
    for (index, scene) in project.scenes.iter().enumerate() {
        let media = match scene.media_kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::None => "none",
        };
        let duration = match scene.duration_mode {
            DurationMode::Auto => "auto".to_string(),
            DurationMode::Fixed => format!("{:.1}s", scene.fixed_seconds),
        };
        println!("  {:>3}. media: {media:<5} duration: {duration}", index + 1);
        if scene.has_narration() {
            println!("       narration: {}", preview(&scene.narration_text));
        }
        if scene.has_subtitle() {
            println!("       subtitle:  {}", preview(&scene.subtitle_text));
        }
        if scene.retain_media_audio {
            println!("       audio: retain original");
        } else if scene.mix_narration {
            println!("       audio: mix narration");
        }
    }

    Ok(())
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= 30 {
        trimmed.to_string()
    } else {
        format!("{}...", chars[..30].iter().collect::<String>())
    }
}
