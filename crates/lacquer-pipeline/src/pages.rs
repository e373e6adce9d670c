//! HTML assembly: partial injection and whitespace collapsing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::builder::{write_output, BuildError, PipelineConfig};

/// An injection marker: `<!-- inject:{{relative/path.html}} -->`.
static INJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*inject:\{\{([^}]+)\}\}\s*-->").expect("inject marker regex")
});

/// The optional end tag paired with a marker.
static ENDINJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*endinject\s*-->").expect("endinject regex"));

/// Elements whose raw content must survive whitespace collapsing.
static PROTECTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?si)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("protected element regex")
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Assemble every `.html` template under the source directory into the
/// output root, preserving relative paths.
///
/// Partials under the partials directory are themselves templates and are
/// emitted too; they normally contain no markers. Returns the number of
/// pages written.
pub fn assemble_all(config: &PipelineConfig) -> Result<usize, BuildError> {
    if !config.source_dir.exists() {
        return Err(BuildError::MissingSource(config.source_dir.clone()));
    }

    let partials = load_partials(&config.partials_dir)?;
    let mut written = 0;

    for entry in WalkDir::new(&config.source_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }

        let template = fs::read_to_string(path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

        let mut html = inject_partials(&template, &partials, path);

        if config.minify {
            html = collapse_whitespace(&html);
        }

        let relative = path.strip_prefix(&config.source_dir).unwrap_or(path);
        let out_path = config.output_dir.join(relative);
        write_output(&out_path, html.as_bytes())?;
        written += 1;
    }

    Ok(written)
}

/// Read every fragment under the partials directory, keyed by its path
/// relative to that directory.
fn load_partials(dir: &Path) -> Result<HashMap<String, String>, BuildError> {
    let mut partials = HashMap::new();

    if !dir.exists() {
        return Ok(partials);
    }

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

        let key = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        partials.insert(key, contents);
    }

    Ok(partials)
}

/// Replace each injection marker region with the matching partial's raw
/// contents. The marker tags themselves are removed.
///
/// An unmatched marker is logged and left in place.
fn inject_partials(template: &str, partials: &HashMap<String, String>, source: &Path) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    while let Some(caps) = INJECT_RE.captures(&template[last..]) {
        let Some(marker) = caps.get(0) else { break };
        let region_start = last + marker.start();
        let mut region_end = last + marker.end();

        // A paired end tag closes the region unless another marker opens
        // first; stale text between the tags is replaced along with them.
        let rest = &template[region_end..];
        if let Some(end_tag) = ENDINJECT_RE.find(rest) {
            let next_marker = INJECT_RE.find(rest).map(|m| m.start());
            if next_marker.map_or(true, |s| end_tag.start() < s) {
                region_end += end_tag.end();
            }
        }

        out.push_str(&template[last..region_start]);

        let key = caps[1].trim();
        match partials.get(key) {
            Some(contents) => out.push_str(contents),
            None => {
                tracing::warn!("No partial '{}' for marker in {}", key, source.display());
                out.push_str(&template[region_start..region_end]);
            }
        }

        last = region_end;
    }

    out.push_str(&template[last..]);
    out
}

/// Collapse runs of whitespace to a single space, leaving the contents of
/// `pre`, `textarea`, `script`, and `style` elements untouched.
pub fn collapse_whitespace(html: &str) -> String {
    let mut protected: Vec<String> = Vec::new();

    let stashed = PROTECTED_RE.replace_all(html, |caps: &Captures| {
        protected.push(caps[0].to_string());
        format!("\u{1}{}\u{1}", protected.len() - 1)
    });

    let collapsed = WHITESPACE_RE.replace_all(&stashed, " ");
    let mut result = collapsed.trim().to_string();

    for (i, block) in protected.iter().enumerate() {
        result = result.replace(&format!("\u{1}{}\u{1}", i), block);
    }

    result
}
