//! Pipeline orchestration.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use walkdir::WalkDir;

use crate::{pages, scripts, styles};

/// Configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the source tree; page templates live anywhere under it
    pub source_dir: PathBuf,

    /// SCSS sources
    pub styles_dir: PathBuf,

    /// Script sources
    pub scripts_dir: PathBuf,

    /// Partial fragments spliced into templates
    pub partials_dir: PathBuf,

    /// Pass-through assets, copied on deploy builds only
    pub static_dir: PathBuf,

    /// Output tree, deleted and rebuilt wholesale each run
    pub output_dir: PathBuf,

    /// Minify output (deploy builds)
    pub minify: bool,

    /// Include-only stylesheet that minified builds skip entirely
    pub variables_file: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            styles_dir: PathBuf::from("src/sass"),
            scripts_dir: PathBuf::from("src/js"),
            partials_dir: PathBuf::from("src/partials"),
            static_dir: PathBuf::from("static"),
            output_dir: PathBuf::from("dist"),
            minify: false,
            variables_file: "vars.scss".to_string(),
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of stylesheets written
    pub styles: usize,

    /// Number of scripts written
    pub scripts: usize,

    /// Number of pages written
    pub pages: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Source directory not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to read {0}")]
    ReadError(String),

    #[error("Failed to minify CSS in {path}: {message}")]
    CssMinify { path: String, message: String },

    #[error("Failed to minify script {path}: {message}")]
    ScriptMinify { path: String, message: String },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// The build pipeline: a fixed set of tasks over one configuration.
///
/// Tasks are plain methods; the two pipeline shapes (dev and deploy) are
/// sequenced by the CLI commands that own a `Pipeline`.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline for the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Delete the output tree. A directory that does not exist is success.
    pub fn clean(&self) -> Result<(), BuildError> {
        match fs::remove_dir_all(&self.config.output_dir) {
            Ok(()) => {
                tracing::debug!("Removed {}", self.config.output_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::WriteError(format!(
                "{}: {}",
                self.config.output_dir.display(),
                e
            ))),
        }
    }

    /// Run the sequential build tasks: styles, then scripts, then pages.
    ///
    /// Each task starts only after its predecessor has fully flushed its
    /// output, since a later task may read files an earlier one wrote.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        let styles = self.build_styles()?;
        let scripts = self.build_scripts()?;
        let pages = self.build_pages()?;

        Ok(BuildResult {
            styles,
            scripts,
            pages,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Compile stylesheets into `<out>/css`.
    pub fn build_styles(&self) -> Result<usize, BuildError> {
        styles::compile_all(&self.config)
    }

    /// Minify scripts into `<out>/js`.
    pub fn build_scripts(&self) -> Result<usize, BuildError> {
        scripts::minify_all(&self.config)
    }

    /// Assemble page templates into the output root.
    pub fn build_pages(&self) -> Result<usize, BuildError> {
        pages::assemble_all(&self.config)
    }

    /// Copy the static-assets tree verbatim into the output root,
    /// preserving relative paths and overwriting existing files.
    pub fn copy_static(&self) -> Result<usize, BuildError> {
        if !self.config.static_dir.exists() {
            tracing::debug!(
                "No static directory at {}, nothing to copy",
                self.config.static_dir.display()
            );
            return Ok(0);
        }

        let mut copied = 0;

        for entry in WalkDir::new(&self.config.static_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&self.config.static_dir).unwrap_or(path);
            let dest = self.config.output_dir.join(relative);

            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }

            fs::copy(path, &dest)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", dest.display(), e)))?;
            copied += 1;
        }

        Ok(copied)
    }
}

/// Write a build product, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
    }

    fs::write(path, contents)
        .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scaffold(root: &Path) -> PipelineConfig {
        let src = root.join("src");
        fs::create_dir_all(src.join("sass")).unwrap();
        fs::create_dir_all(src.join("js")).unwrap();
        fs::create_dir_all(src.join("partials")).unwrap();

        fs::write(
            src.join("sass/main.scss"),
            "$accent: #663399;\nbody {\n  color: $accent;\n}\n",
        )
        .unwrap();
        fs::write(
            src.join("js/app.js"),
            "function greet(name) {\n  console.log('hello ' + name);\n}\ngreet('world');\n",
        )
        .unwrap();
        fs::write(
            src.join("index.html"),
            "<html><body><!-- inject:{{header.html}} --></body></html>\n",
        )
        .unwrap();
        fs::write(src.join("partials/header.html"), "<header>Site</header>").unwrap();

        PipelineConfig {
            source_dir: src.clone(),
            styles_dir: src.join("sass"),
            scripts_dir: src.join("js"),
            partials_dir: src.join("partials"),
            static_dir: root.join("static"),
            output_dir: root.join("dist"),
            ..Default::default()
        }
    }

    #[test]
    fn clean_succeeds_when_output_missing() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: temp.path().join("does-not-exist"),
            ..Default::default()
        };

        Pipeline::new(config).clean().unwrap();
    }

    #[test]
    fn clean_removes_output_tree() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        fs::create_dir_all(out.join("css")).unwrap();
        fs::write(out.join("css/old.css"), "body{}").unwrap();

        let config = PipelineConfig {
            output_dir: out.clone(),
            ..Default::default()
        };

        Pipeline::new(config).clean().unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn build_writes_every_domain() {
        let temp = tempdir().unwrap();
        let config = scaffold(temp.path());
        let out = config.output_dir.clone();

        let result = Pipeline::new(config).build().await.unwrap();

        assert_eq!(result.styles, 1);
        assert_eq!(result.scripts, 1);
        assert_eq!(result.pages, 2); // index plus the partial itself
        assert!(out.join("css/main.css").exists());
        assert!(out.join("js/app.min.js").exists());
        assert!(out.join("index.html").exists());
    }

    #[test]
    fn copy_static_preserves_relative_paths() {
        let temp = tempdir().unwrap();
        let config = scaffold(temp.path());
        fs::create_dir_all(config.static_dir.join("img")).unwrap();
        fs::write(config.static_dir.join("img/logo.svg"), "<svg/>").unwrap();
        fs::write(config.static_dir.join("favicon.ico"), "icon").unwrap();
        let out = config.output_dir.clone();

        let copied = Pipeline::new(config).copy_static().unwrap();

        assert_eq!(copied, 2);
        assert!(out.join("img/logo.svg").exists());
        assert!(out.join("favicon.ico").exists());
    }

    #[test]
    fn copy_static_tolerates_missing_directory() {
        let temp = tempdir().unwrap();
        let config = PipelineConfig {
            static_dir: temp.path().join("no-such-static"),
            output_dir: temp.path().join("dist"),
            ..Default::default()
        };

        let copied = Pipeline::new(config).copy_static().unwrap();

        assert_eq!(copied, 0);
    }

    #[tokio::test]
    async fn missing_styles_dir_aborts_build() {
        let temp = tempdir().unwrap();
        let mut config = scaffold(temp.path());
        config.styles_dir = temp.path().join("gone");

        let err = Pipeline::new(config).build().await.unwrap_err();

        assert!(matches!(err, BuildError::MissingSource(_)));
    }
}
