// src/cli/render.rs — One-off render, export and validate commands

use std::path::{Path, PathBuf};

use crate::infra::config::Config;
use crate::infra::errors::ScadCriticError;
use crate::render::{MeshFormat, OpenScadRenderer, Quality, RenderOptions};

pub async fn run_render(
    config: &Config,
    file: &str,
    output: Option<String>,
    width: u32,
    height: u32,
    quality: &str,
) -> anyhow::Result<()> {
    let renderer = OpenScadRenderer::discover(&config.renderer)?;
    let quality: Quality = quality.parse()?;

    let source = Path::new(file);
    let out = output
        .map(PathBuf::from)
        .unwrap_or_else(|| source.with_extension("png"));

    let options = RenderOptions {
        width,
        height,
        quality,
        colorscheme: config.renderer.colorscheme.clone(),
    };

    let bytes = renderer.render_png(source, &options).await?;
    tokio::fs::write(&out, &bytes).await?;
    println!("  Wrote {} ({} KB)", out.display(), bytes.len() / 1024);
    Ok(())
}

pub async fn run_export(
    config: &Config,
    file: &str,
    output: Option<String>,
    format: &str,
    quality: &str,
) -> anyhow::Result<()> {
    let renderer = OpenScadRenderer::discover(&config.renderer)?;
    let format: MeshFormat = format.parse()?;
    let quality: Quality = quality.parse()?;

    let source = Path::new(file);
    let out = output
        .map(PathBuf::from)
        .unwrap_or_else(|| source.with_extension(format.extension()));

    let size = renderer.render_mesh(source, &out, quality).await?;
    println!("  Wrote {} ({} KB)", out.display(), size / 1024);
    Ok(())
}

pub async fn run_validate(config: &Config, file: &str) -> anyhow::Result<()> {
    let renderer = OpenScadRenderer::discover(&config.renderer)?;

    match renderer.validate(Path::new(file)).await {
        Ok(()) => {
            println!("  {file}: OK");
            Ok(())
        }
        Err(ScadCriticError::SyntaxInvalid { diagnostics }) => {
            eprintln!("  {file}: INVALID");
            for line in diagnostics.lines() {
                eprintln!("    {line}");
            }
            anyhow::bail!("validation failed")
        }
        Err(e) => Err(e.into()),
    }
}
