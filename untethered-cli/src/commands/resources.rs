use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use owo_colors::OwoColorize;
use untethered_core::resource::{ResourceDraft, Upload};

use crate::context::Context;
use crate::render::Render;
use crate::utils::tui;

pub async fn list(ctx: &Context) -> Result<()> {
    let resources = ctx.resources().list().await?;

    if resources.is_empty() {
        println!("{}", "No resources shared yet".dimmed());
        return Ok(());
    }

    for (i, resource) in resources.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", resource.render());
    }

    Ok(())
}

pub async fn share(
    ctx: &Context,
    topic: String,
    description: String,
    link: String,
    file: Option<PathBuf>,
) -> Result<()> {
    let viewer = ctx.viewer().await?;

    let upload = match file {
        Some(path) => Some(read_upload(&path)?),
        None => None,
    };
    let draft = ResourceDraft {
        topic,
        description,
        link,
    };

    let spinner = tui::create_spinner("Sharing".into());
    let result = ctx.resources().share(&viewer, draft, upload).await;
    spinner.finish_and_clear();

    let resource = result?;
    println!("Shared {} {}", resource.topic.bold(), resource.id.dimmed());

    Ok(())
}

pub async fn remove(ctx: &Context, id: &str, force: bool) -> Result<()> {
    let viewer = ctx.viewer().await?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove resource {}?", id))
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }
    }

    let resource = ctx.resources().remove(&viewer, id).await?;
    println!("Removed {}", resource.topic);

    Ok(())
}

fn read_upload(path: &Path) -> Result<Upload> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))?;

    let upload = Upload::new(file_name, bytes)?;
    upload.validate()?;
    Ok(upload)
}
