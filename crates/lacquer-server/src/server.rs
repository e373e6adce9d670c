//! Development server implementation.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::websocket::{reload_client_script, ReloadHub, ReloadMessage};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Primary root: the build output tree
    pub root: PathBuf,

    /// Secondary root for files not present in the output tree
    pub static_root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            static_root: PathBuf::from("static"),
            host: "0.0.0.0".to_string(),
            port: 3000,
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}: {1}")]
    AddrError(String, String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),
}

/// Shared server state.
struct ServerState {
    config: DevServerConfig,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    /// Create a new development server broadcasting on the given hub.
    pub fn new(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Start the development server. Runs until the process exits.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::AddrError(addr_str, e.to_string()))?;

        let state = Arc::new(ServerState {
            config: self.config.clone(),
            hub: self.hub,
        });

        let app = Router::new()
            .route("/__reload", get(ws_handler))
            .route("/__reload.js", get(reload_script_handler))
            .fallback(get(asset_handler))
            .with_state(state);

        tracing::info!(
            "Serving {} at http://{}",
            self.config.root.display(),
            addr
        );

        if self.config.open {
            let url = format!("http://localhost:{}", self.config.port);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Handler for every non-reserved path: static files with clean URLs.
async fn asset_handler(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let Some(relative) = sanitize(uri.path().trim_start_matches('/')) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let roots = [&state.config.root, &state.config.static_root];

    let Some(file) = resolve(&relative, &roots) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            let content_type = content_type_for(&file);
            if content_type.starts_with("text/html") {
                let html = inject_reload_script(&String::from_utf8_lossy(&bytes));
                ([(header::CONTENT_TYPE, content_type)], html).into_response()
            } else {
                ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
            }
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", file.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "read error").into_response()
        }
    }
}

/// Normalize a request path, rejecting anything that escapes the roots.
fn sanitize(request_path: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();

    for component in Path::new(request_path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(out)
}

/// Resolve a request path against an ordered list of roots.
///
/// The empty path maps to `index.html`. An extensionless path with no
/// exact match is rewritten once to `path.html`, first match wins.
fn resolve(relative: &Path, roots: &[&PathBuf]) -> Option<PathBuf> {
    let relative = if relative.as_os_str().is_empty() {
        Path::new("index.html")
    } else {
        relative
    };

    for root in roots {
        let candidate = root.join(relative);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if relative.extension().is_none() {
        for root in roots {
            let candidate = root.join(relative).with_extension("html");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    None
}

const RELOAD_SNIPPET: &str = r#"<script src="/__reload.js"></script>"#;

/// Splice the reload client into a served HTML document, before the
/// closing body tag when present, appended otherwise.
fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SNIPPET.len());
            out.push_str(&html[..pos]);
            out.push_str(RELOAD_SNIPPET);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{}{}", html, RELOAD_SNIPPET),
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection, forwarding hub messages to the client.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let msg = serde_json::to_string(&ReloadMessage::Connected).unwrap();
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload_msg) = rx.recv().await {
        let json = serde_json::to_string(&reload_msg).unwrap();
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    let script = reload_client_script("/__reload");
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default(), ReloadHub::new());
        assert_eq!(server.config.port, 3000);
    }

    #[test]
    fn resolves_exact_files_from_primary_root_first() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        let statics = temp.path().join("static");
        fs::create_dir_all(&dist).unwrap();
        fs::create_dir_all(&statics).unwrap();
        fs::write(dist.join("app.css"), "a").unwrap();
        fs::write(statics.join("app.css"), "b").unwrap();

        let found = resolve(Path::new("app.css"), &[&dist, &statics]).unwrap();

        assert_eq!(found, dist.join("app.css"));
    }

    #[test]
    fn falls_back_to_static_root() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        let statics = temp.path().join("static");
        fs::create_dir_all(&dist).unwrap();
        fs::create_dir_all(&statics).unwrap();
        fs::write(statics.join("robots.txt"), "ok").unwrap();

        let found = resolve(Path::new("robots.txt"), &[&dist, &statics]).unwrap();

        assert_eq!(found, statics.join("robots.txt"));
    }

    #[test]
    fn rewrites_clean_urls_to_html() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("about.html"), "<h1>About</h1>").unwrap();
        let statics = temp.path().join("static");

        let found = resolve(Path::new("about"), &[&dist, &statics]).unwrap();

        assert_eq!(found, dist.join("about.html"));
    }

    #[test]
    fn empty_path_maps_to_index() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        fs::write(dist.join("index.html"), "<h1>Home</h1>").unwrap();
        let statics = temp.path().join("static");

        let found = resolve(Path::new(""), &[&dist, &statics]).unwrap();

        assert_eq!(found, dist.join("index.html"));
    }

    #[test]
    fn missing_file_resolves_to_none() {
        let temp = tempdir().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(&dist).unwrap();
        let statics = temp.path().join("static");

        assert!(resolve(Path::new("nope"), &[&dist, &statics]).is_none());
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert!(sanitize("../secrets").is_none());
        assert!(sanitize("css/../../etc/passwd").is_none());
        assert_eq!(sanitize("css/main.css"), Some(PathBuf::from("css/main.css")));
    }

    #[test]
    fn injects_reload_script_before_body_close() {
        let html = "<html><body><p>Hi</p></body></html>";

        let injected = inject_reload_script(html);

        assert_eq!(
            injected,
            "<html><body><p>Hi</p><script src=\"/__reload.js\"></script></body></html>"
        );
    }

    #[test]
    fn appends_reload_script_without_body_close() {
        let injected = inject_reload_script("<p>fragment</p>");

        assert!(injected.ends_with(RELOAD_SNIPPET));
    }

    #[test]
    fn content_types_cover_pipeline_outputs() {
        assert_eq!(content_type_for(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(
            content_type_for(Path::new("a.min.js")),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(content_type_for(Path::new("a.bin")), "application/octet-stream");
    }
}
