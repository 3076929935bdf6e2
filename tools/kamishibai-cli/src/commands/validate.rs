//! Validate a project file.

use std::path::PathBuf;

use kamishibai_project_model::{MediaKind, Project};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating project: {}", path.display());

    let project =
        Project::load(&path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("  Name: {}", project.name);
    println!("  Version: {}", project.version);
    println!("  Scenes: {}", project.scenes.len());
    println!(
        "  Output: {} @ {}fps",
        project.output.resolution, project.output.fps
    );

    let mut errors = Vec::new();

    if project.scenes.is_empty() {
        errors.push("project has no scenes".to_string());
    }
    if let Err(e) = project.output.validate() {
        errors.push(e.to_string());
    }
    for (index, scene) in project.scenes.iter().enumerate() {
        let label = format!("scene {}", index + 1);
        if scene.fixed_seconds <= 0.0 {
            errors.push(format!("{label}: fixed duration must be positive"));
        }
        if scene.media_kind != MediaKind::None {
            match &scene.media_path {
                None => errors.push(format!("{label}: media kind set but no path")),
                Some(media) if !media.exists() => {
                    errors.push(format!("{label}: media file missing: {}", media.display()));
                }
                Some(_) => {}
            }
        }
        if scene.retain_media_audio && scene.has_narration() {
            errors.push(format!(
                "{label}: retain_media_audio and narration are mutually exclusive"
            ));
        }
    }

    if errors.is_empty() {
        println!("\nProject is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Project may not export cleanly.",
            errors.len()
        );
    }

    Ok(())
}
