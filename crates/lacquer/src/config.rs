//! Configuration file loading (lacquer.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use lacquer_pipeline::PipelineConfig;

/// Configuration file structure (lacquer.toml). Every key has a default,
/// so a missing file means a fully-defaulted configuration.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub paths: PathSettings,
    #[serde(default)]
    pub build: BuildSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_styles")]
    pub styles: String,
    #[serde(default = "default_scripts")]
    pub scripts: String,
    #[serde(default = "default_partials")]
    pub partials: String,
    #[serde(default = "default_static", rename = "static")]
    pub static_dir: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_deploy")]
    pub deploy: String,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_minify")]
    pub minify: bool,
    #[serde(default = "default_variables")]
    pub variables_file: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_source() -> String {
    "src".to_string()
}
fn default_styles() -> String {
    "src/sass".to_string()
}
fn default_scripts() -> String {
    "src/js".to_string()
}
fn default_partials() -> String {
    "src/partials".to_string()
}
fn default_static() -> String {
    "static".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_deploy() -> String {
    "deploy".to_string()
}
fn default_minify() -> bool {
    true
}
fn default_variables() -> String {
    "vars.scss".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            styles: default_styles(),
            scripts: default_scripts(),
            partials: default_partials(),
            static_dir: default_static(),
            output: default_output(),
            deploy: default_deploy(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            minify: default_minify(),
            variables_file: default_variables(),
        }
    }
}

/// Load configuration from the given path if it exists.
/// Returns an error if the file exists but is malformed.
pub fn load(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    Ok(ConfigFile::default())
}

impl ConfigFile {
    /// Pipeline configuration for the dev pipeline: unminified, into the
    /// output directory.
    pub fn dev_pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            source_dir: PathBuf::from(&self.paths.source),
            styles_dir: PathBuf::from(&self.paths.styles),
            scripts_dir: PathBuf::from(&self.paths.scripts),
            partials_dir: PathBuf::from(&self.paths.partials),
            static_dir: PathBuf::from(&self.paths.static_dir),
            output_dir: PathBuf::from(&self.paths.output),
            minify: false,
            variables_file: self.build.variables_file.clone(),
        }
    }

    /// Pipeline configuration for the deploy pipeline: minified by
    /// default, into the deploy directory.
    pub fn deploy_pipeline(&self, output: Option<PathBuf>, minify: Option<bool>) -> PipelineConfig {
        PipelineConfig {
            output_dir: output.unwrap_or_else(|| PathBuf::from(&self.paths.deploy)),
            minify: minify.unwrap_or(self.build.minify),
            ..self.dev_pipeline()
        }
    }
}
