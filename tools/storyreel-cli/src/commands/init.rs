//! Initialize a new StoryReel project.

use super::Workspace;

pub fn run(workspace: &Workspace, project: String, name: Option<String>) -> anyhow::Result<()> {
    let name = name.unwrap_or_else(|| project.clone());
    let project_dir = workspace.store.project_dir(&project);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let created = workspace
        .store
        .create(&project, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created successfully:");
    println!("  ID: {}", created.id);
    println!("  Directory: {}", project_dir.display());
    println!();
    println!("Directory structure:");
    println!("  {}/", project);
    println!("  ├── input/          (images, clips, crops.json)");
    println!("  ├── audio/          (voice.mp3 narration)");
    println!("  ├── project.json");
    println!("  └── timeline.json   (written by `storyreel generate`)");

    Ok(())
}
