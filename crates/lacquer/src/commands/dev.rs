//! Development pipeline command: clean, build, serve, watch.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use lacquer_pipeline::Pipeline;
use lacquer_server::{
    DevServer, DevServerConfig, FileWatcher, ReloadHub, ReloadMessage, WatchEvent,
};

use crate::config;

/// Run the dev pipeline.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let file_config = config::load(config_path)?;
    let pipeline_config = file_config.dev_pipeline();

    let pipeline = Pipeline::new(pipeline_config.clone());
    pipeline.clean()?;
    let result = pipeline.build().await?;

    tracing::info!(
        "Built {} stylesheets, {} scripts, {} pages in {}ms",
        result.styles,
        result.scripts,
        result.pages,
        result.duration_ms
    );

    let hub = ReloadHub::new();

    let watch_paths = vec![
        pipeline_config.styles_dir.clone(),
        pipeline_config.scripts_dir.clone(),
        pipeline_config.source_dir.clone(),
    ];
    let (watcher, mut rx) = FileWatcher::new(&watch_paths)?;

    // Rebuild the changed domain and notify clients. Watching and serving
    // are independent; a failed rebuild only logs.
    let pipeline = Arc::new(pipeline);
    let watch_hub = hub.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handle_watch_event(&pipeline, &watch_hub, event);
        }
        // Keep watcher alive
        drop(watcher);
    });

    let server_config = DevServerConfig {
        root: pipeline_config.output_dir.clone(),
        static_root: pipeline_config.static_dir.clone(),
        host: file_config.server.host.clone(),
        port: port.unwrap_or(file_config.server.port),
        open,
    };

    DevServer::new(server_config, hub).start().await?;

    Ok(())
}

/// Re-run exactly the task owning the changed domain.
fn handle_watch_event(pipeline: &Pipeline, hub: &ReloadHub, event: WatchEvent) {
    match event {
        WatchEvent::StyleChanged(path) => {
            tracing::info!("Stylesheet changed: {}", path.display());
            match pipeline.build_styles() {
                Ok(_) => hub.send(ReloadMessage::RefreshStyles),
                Err(e) => tracing::warn!("Stylesheet rebuild failed: {}", e),
            }
        }

        WatchEvent::ScriptChanged(path) => {
            tracing::info!("Script changed: {}", path.display());
            match pipeline.build_scripts() {
                Ok(_) => hub.send(ReloadMessage::Reload),
                Err(e) => tracing::warn!("Script rebuild failed: {}", e),
            }
        }

        WatchEvent::PageChanged(path) => {
            tracing::info!("Page changed: {}", path.display());
            match pipeline.build_pages() {
                Ok(_) => hub.send(ReloadMessage::Reload),
                Err(e) => tracing::warn!("Page rebuild failed: {}", e),
            }
        }
    }
}
