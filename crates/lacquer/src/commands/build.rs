//! Deploy pipeline command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use lacquer_pipeline::Pipeline;

use crate::config;

/// Run the deploy pipeline: clean, build minified, copy static assets.
pub async fn run(config_path: &Path, output: Option<PathBuf>, minify: Option<bool>) -> Result<()> {
    tracing::info!("Building deploy tree...");

    let file_config = config::load(config_path)?;
    let pipeline = Pipeline::new(file_config.deploy_pipeline(output, minify));

    pipeline.clean()?;
    let result = pipeline.build().await?;
    let copied = pipeline.copy_static()?;

    tracing::info!(
        "Built {} stylesheets, {} scripts, {} pages in {}ms",
        result.styles,
        result.scripts,
        result.pages,
        result.duration_ms
    );
    tracing::info!("Copied {} static files", copied);
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
