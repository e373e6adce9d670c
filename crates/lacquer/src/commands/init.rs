//! Scaffold a new site in the current directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing lacquer site...");

    let files = [
        ("lacquer.toml", DEFAULT_CONFIG),
        ("src/sass/vars.scss", DEFAULT_VARS),
        ("src/sass/main.scss", DEFAULT_MAIN_SCSS),
        ("src/js/main.js", DEFAULT_MAIN_JS),
        ("src/partials/header.html", DEFAULT_HEADER),
        ("src/partials/footer.html", DEFAULT_FOOTER),
        ("src/index.html", DEFAULT_INDEX),
        ("src/about.html", DEFAULT_ABOUT),
    ];

    for (path, contents) in files {
        let path = Path::new(path);
        if path.exists() && !yes {
            tracing::warn!("{} already exists, skipping (use --yes to overwrite)", path.display());
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }

    fs::create_dir_all("static").context("Failed to create static directory")?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'lacquer dev' to start the development server.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Lacquer configuration

[server]
host = "0.0.0.0"
port = 3000

[paths]
source = "src"
styles = "src/sass"
scripts = "src/js"
partials = "src/partials"
static = "static"
output = "dist"
deploy = "deploy"

[build]
# Minify the deploy build
minify = true
"#;

const DEFAULT_VARS: &str = r#"$text-color: #333;
$accent: #663399;
$page-width: 720px;
"#;

const DEFAULT_MAIN_SCSS: &str = r#"@import "vars";

body {
  max-width: $page-width;
  margin: 0 auto;
  font-family: system-ui, sans-serif;
  color: $text-color;
}

a {
  color: $accent;
}
"#;

const DEFAULT_MAIN_JS: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  console.log('lacquer dev build');
});
"#;

const DEFAULT_HEADER: &str = r#"<header>
  <nav>
    <a href="/">Home</a>
    <a href="/about">About</a>
  </nav>
</header>
"#;

const DEFAULT_FOOTER: &str = r#"<footer>
  <p>Built with lacquer.</p>
</footer>
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>My Site</title>
  <link rel="stylesheet" href="/css/main.css">
  <script src="/js/main.min.js" defer></script>
</head>
<body>
  <!-- inject:{{header.html}} -->
  <main>
    <h1>Hello</h1>
    <p>Edit src/index.html and watch this page reload.</p>
  </main>
  <!-- inject:{{footer.html}} -->
</body>
</html>
"#;

const DEFAULT_ABOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>About</title>
  <link rel="stylesheet" href="/css/main.css">
</head>
<body>
  <!-- inject:{{header.html}} -->
  <main>
    <h1>About</h1>
    <p>This page is served at /about through the clean-URL rewrite.</p>
  </main>
  <!-- inject:{{footer.html}} -->
</body>
</html>
"#;
