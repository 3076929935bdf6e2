//! Initialize a new project file.

use std::path::PathBuf;

use kamishibai_project_model::{Project, Resolution};

pub fn run(name: String, output: PathBuf, resolution: String, fps: u32) -> anyhow::Result<()> {
    let resolution: Resolution = resolution
        .parse()
        .map_err(|e| anyhow::anyhow!("Bad resolution: {e}"))?;

    let path = output.join(format!("{name}.json"));
    if path.exists() {
        return Err(anyhow::anyhow!(
            "Refusing to overwrite existing project: {}",
            path.display()
        ));
    }

    println!("Creating project '{}' at {}", name, path.display());

    let mut project = Project::new(&name);
    project.output.resolution = resolution;
    project.output.fps = fps;
    project.output.path = output.join(format!("{name}.mp4"));
    project.add_scene();
    project
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  File: {}", path.display());
    println!("  Resolution: {resolution} @ {fps}fps");
    println!("  Scenes: 1 (empty)");
    println!();
    println!("Next: edit the scene list, then run `kamishibai export {}`", path.display());

    Ok(())
}
