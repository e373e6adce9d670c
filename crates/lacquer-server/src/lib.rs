//! Development server with live reload for lacquer sites.
//!
//! Serves the build output with clean-URL rewriting, watches the source
//! tree, and pushes WebSocket reload notifications to connected browsers.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
