//! Script minification.

use std::fs;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use walkdir::WalkDir;

use crate::builder::{write_output, BuildError, PipelineConfig};

/// Minify every `.js` file under the scripts directory into `<out>/js`,
/// renaming `name.js` to `name.min.js`.
///
/// A script that fails to parse aborts the task. Returns the number of
/// scripts written.
pub fn minify_all(config: &PipelineConfig) -> Result<usize, BuildError> {
    if !config.scripts_dir.exists() {
        return Err(BuildError::MissingSource(config.scripts_dir.clone()));
    }

    let out_root = config.output_dir.join("js");
    let mut written = 0;

    for entry in WalkDir::new(&config.scripts_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("js") {
            continue;
        }

        let source = fs::read_to_string(path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

        let minified =
            minify_script(&source, config.minify).map_err(|message| BuildError::ScriptMinify {
                path: path.display().to_string(),
                message,
            })?;

        let relative = path.strip_prefix(&config.scripts_dir).unwrap_or(path);
        let out_path = out_root.join(relative).with_extension("min.js");
        write_output(&out_path, minified.as_bytes())?;
        written += 1;
    }

    Ok(written)
}

/// Minify a single script source.
///
/// Identifiers are mangled and whitespace removed; `drop_console`
/// additionally strips console output calls (deploy builds).
pub fn minify_script(source: &str, drop_console: bool) -> Result<String, String> {
    let allocator = Allocator::default();

    // Plain browser scripts, not modules; top-level names stay intact.
    let source_type = SourceType::cjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(messages.join("; "));
    }

    let mut program = ret.program;

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions {
            drop_console,
            ..CompressOptions::default()
        }),
    };

    let minified = Minifier::new(options).build(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    const APP_JS: &str = "function greet(name) {\n  var message = 'hello ' + name;\n  console.log(message);\n  return message;\n}\ngreet('world');\n";

    fn config(root: &Path, minify: bool) -> PipelineConfig {
        PipelineConfig {
            scripts_dir: root.join("js"),
            output_dir: root.join("dist"),
            minify,
            ..Default::default()
        }
    }

    #[test]
    fn renames_with_min_suffix() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("js/widgets")).unwrap();
        fs::write(temp.path().join("js/app.js"), APP_JS).unwrap();
        fs::write(temp.path().join("js/widgets/nav.js"), "var open = false;\n").unwrap();

        let cfg = config(temp.path(), false);
        let written = minify_all(&cfg).unwrap();

        assert_eq!(written, 2);
        assert!(cfg.output_dir.join("js/app.min.js").exists());
        assert!(cfg.output_dir.join("js/widgets/nav.min.js").exists());
    }

    #[test]
    fn minified_output_is_smaller() {
        let minified = minify_script(APP_JS, false).unwrap();

        assert!(minified.len() < APP_JS.len());
        assert!(!minified.contains("  "));
    }

    #[test]
    fn dev_build_keeps_console_output() {
        let minified = minify_script(APP_JS, false).unwrap();

        assert!(minified.contains("console.log"));
    }

    #[test]
    fn deploy_build_drops_console_output() {
        let minified = minify_script(APP_JS, true).unwrap();

        assert!(!minified.contains("console.log"));
    }

    #[test]
    fn parse_error_aborts_task() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("js")).unwrap();
        fs::write(temp.path().join("js/broken.js"), "function ( {{{\n").unwrap();

        let cfg = config(temp.path(), false);
        let err = minify_all(&cfg).unwrap_err();

        assert!(matches!(err, BuildError::ScriptMinify { .. }));
    }
}
