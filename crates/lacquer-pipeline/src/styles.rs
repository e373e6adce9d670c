//! SCSS compilation and CSS minification.

use std::path::Path;

use walkdir::WalkDir;

use crate::builder::{write_output, BuildError, PipelineConfig};

/// Compile every `.scss` file under the styles directory into `<out>/css`,
/// preserving relative directory structure.
///
/// A file that fails to compile is logged and skipped; the run continues.
/// Returns the number of stylesheets written.
pub fn compile_all(config: &PipelineConfig) -> Result<usize, BuildError> {
    if !config.styles_dir.exists() {
        return Err(BuildError::MissingSource(config.styles_dir.clone()));
    }

    let out_root = config.output_dir.join("css");
    let mut written = 0;

    for entry in WalkDir::new(&config.styles_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("scss") {
            continue;
        }

        let relative = path.strip_prefix(&config.styles_dir).unwrap_or(path);

        // The variables sheet is include-only and does not compile on its
        // own, so minified builds leave it out up front.
        if config.minify && relative == Path::new(config.variables_file.as_str()) {
            continue;
        }

        let css = match grass::from_path(path, &grass::Options::default()) {
            Ok(css) => css,
            Err(e) => {
                tracing::warn!("Failed to compile {}: {}", path.display(), e);
                continue;
            }
        };

        let css = if config.minify {
            minify_css(&css).map_err(|message| BuildError::CssMinify {
                path: path.display().to_string(),
                message,
            })?
        } else {
            css
        };

        let out_path = out_root.join(relative).with_extension("css");
        write_output(&out_path, css.as_bytes())?;
        written += 1;
    }

    Ok(written)
}

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, String> {
    use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?;

    Ok(minified.code)
}
