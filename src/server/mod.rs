//! Development server for the browser platform.
//!
//! Serves the prepared browser build over HTTP, injects the live-reload
//! client into HTML pages and keeps two watches running: source changes
//! re-run the `prepare` task, and changes to the served tree are pushed to
//! live-reload clients.

mod livereload;
mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::project::Project;
use crate::tasks::TaskGraph;

pub use livereload::{create_router as livereload_router, ChangedResponse, LiveReload, ServerMessage};
pub use watch::{relative_to_root, FileWatcher, WatchEvent};

/// HTML pages larger than this are served without the live-reload snippet.
const MAX_INJECT_BYTES: usize = 8 * 1024 * 1024;

const SNIPPET_MARKER: &str = "livereload.js?snipver=1";

/// Static file router for `root`, with the live-reload client injected into
/// HTML responses.
pub fn static_router(root: &Path, livereload_port: u16) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root).append_index_html_on_directories(true))
        .layer(middleware::from_fn_with_state(livereload_port, inject_livereload))
        .layer(TraceLayer::new_for_http())
}

async fn inject_livereload(State(port): State<u16>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let too_large = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .is_some_and(|len| len > MAX_INJECT_BYTES);
    if too_large {
        tracing::debug!("HTML page too large for live-reload injection");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Only UTF-8 pages get the snippet; anything else is passed through as is.
    let html = match String::from_utf8(Vec::from(bytes)) {
        Ok(html) => html,
        Err(e) => {
            tracing::debug!("HTML page is not UTF-8, skipping live-reload injection");
            return Response::from_parts(parts, Body::from(e.into_bytes()));
        }
    };

    let injected = inject_snippet(&html, port);
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(injected))
}

/// Insert the live-reload `<script>` before the last `</body>`, or append it
/// when there is none. Pages that already load the client are left alone.
pub fn inject_snippet(html: &str, port: u16) -> String {
    if html.contains(SNIPPET_MARKER) {
        return html.to_string();
    }

    let snippet = format!(
        "<script>document.write('<script src=\"//' + (location.hostname || 'localhost') + ':{}/{}\"><\\/script>')</script>",
        port, SNIPPET_MARKER
    );

    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + snippet.len());
            out.push_str(&html[..idx]);
            out.push_str(&snippet);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{}{}", html, snippet),
    }
}

/// Body of the `server` task. Runs until Ctrl-C.
pub async fn run(project: Arc<Project>, graph: TaskGraph) -> Result<()> {
    let config = &project.config;
    let serve_root = project.layout.serve_root.clone();

    let missing_hint = || {
        anyhow::anyhow!(
            "{} does not exist; run `recreate` with the {} platform installed",
            serve_root.display(),
            config.serve_platform
        )
    };

    if !serve_root.is_dir() {
        if !project.layout.build_dir.is_dir() {
            return Err(missing_hint());
        }
        tracing::info!(root = %serve_root.display(), "Nothing to serve yet, preparing first");
        graph.run(&["prepare"]).await?;
    }
    if !serve_root.is_dir() {
        return Err(missing_hint());
    }

    let reload = LiveReload::new(config.livereload_port);

    let express = tokio::net::TcpListener::bind(("0.0.0.0", config.express_port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.express_port))?;
    let lr = tokio::net::TcpListener::bind(("0.0.0.0", reload.port()))
        .await
        .with_context(|| format!("Failed to bind port {}", reload.port()))?;

    let sources = FileWatcher::new(&[project.layout.src_dir.clone()])
        .context("Failed to watch source directory")?;
    let served = FileWatcher::new(&[serve_root.clone()])
        .context("Failed to watch served directory")?;

    tracing::info!("Serving {} on http://localhost:{}", serve_root.display(), config.express_port);
    tracing::info!("Live-reload listening on port {}", reload.port());

    let static_app = static_router(&serve_root, reload.port());
    let lr_app = livereload_router(reload.clone());

    tokio::select! {
        res = async { axum::serve(express, static_app).await } => res.context("Static server stopped")?,
        res = async { axum::serve(lr, lr_app).await } => res.context("Live-reload server stopped")?,
        _ = prepare_on_change(sources, graph) => {}
        _ = notify_on_change(served, serve_root, reload) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down dev server"),
    }

    Ok(())
}

/// Re-run `prepare` whenever the sources change. Changes that pile up while
/// a prepare runs lead to a single follow-up run.
pub async fn prepare_on_change(mut watcher: FileWatcher, graph: TaskGraph) {
    while let Some(event) = watcher.next_event().await {
        if let WatchEvent::Error(e) = &event {
            tracing::warn!("Source watch error: {}", e);
            continue;
        }
        let coalesced = watcher.drain();
        tracing::debug!(?event, coalesced, "Source changed");

        if let Err(e) = graph.run(&["prepare"]).await {
            tracing::error!("prepare after source change failed: {:#}", anyhow::Error::from(e));
        }
    }
}

/// Push each change under `root` to live-reload clients.
pub async fn notify_on_change(mut watcher: FileWatcher, root: PathBuf, reload: LiveReload) {
    while let Some(event) = watcher.next_event().await {
        let Some(path) = event.path() else {
            if let WatchEvent::Error(e) = &event {
                tracing::warn!("Served tree watch error: {}", e);
            }
            continue;
        };

        match relative_to_root(&root, path) {
            Some(file) => {
                reload.changed(&[file]);
            }
            None => tracing::debug!(path = %path.display(), "Change outside served root"),
        }
    }
}
