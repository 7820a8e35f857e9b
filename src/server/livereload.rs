//! Live-reload notification server.
//!
//! Speaks the same HTTP surface as tiny-lr so existing browser extensions
//! and the injected client both work:
//! - `GET /` - welcome banner
//! - `GET /changed?files=a,b` and `POST /changed` with `{"files": [...]}`
//! - `GET /livereload` - WebSocket using the LiveReload protocol
//! - `GET /livereload.js` - client script

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const PROTOCOL: &str = "http://livereload.com/protocols/official-7";
const SERVER_NAME: &str = "cdvtask";

/// Pending notifications kept per client before it starts missing some.
const CHANNEL_CAPACITY: usize = 256;

const CLIENT_JS: &str = r#"(function () {
  var url = 'ws://' + (location.hostname || 'localhost') + ':{{port}}/livereload';
  var socket = new WebSocket(url);
  socket.onopen = function () {
    socket.send(JSON.stringify({ command: 'hello', protocols: ['{{protocol}}'] }));
  };
  socket.onmessage = function (event) {
    var msg = JSON.parse(event.data);
    if (msg.command !== 'reload') { return; }
    if (msg.liveCSS && /\.css$/.test(msg.path)) {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var href = links[i].href.replace(/[?&]livereload=\d+/, '');
        links[i].href = href + (href.indexOf('?') < 0 ? '?' : '&') + 'livereload=' + Date.now();
      }
      return;
    }
    location.reload();
  };
})();
"#;

/// Fans change notifications out to every connected client.
#[derive(Clone)]
pub struct LiveReload {
    port: u16,
    sender: broadcast::Sender<String>,
}

impl LiveReload {
    pub fn new(port: u16) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { port, sender }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Tell clients that `files` (paths relative to the served root) changed.
    /// Returns the number of connected clients.
    pub fn changed(&self, files: &[String]) -> usize {
        let clients = self.sender.receiver_count();
        for file in files {
            tracing::debug!(file = %file, clients, "Notifying live-reload clients");
            // No receivers is not an error; nobody is listening yet.
            let _ = self.sender.send(file.clone());
        }
        clients
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn client_script(&self) -> String {
        CLIENT_JS
            .replace("{{port}}", &self.port.to_string())
            .replace("{{protocol}}", PROTOCOL)
    }
}

/// Messages sent to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ServerMessage {
    Hello {
        protocols: Vec<&'static str>,
        #[serde(rename = "serverName")]
        server_name: &'static str,
    },
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
        #[serde(rename = "liveImg")]
        live_img: bool,
    },
}

impl ServerMessage {
    pub fn hello() -> Self {
        ServerMessage::Hello {
            protocols: vec![PROTOCOL],
            server_name: SERVER_NAME,
        }
    }

    pub fn reload(path: impl Into<String>) -> Self {
        ServerMessage::Reload {
            path: path.into(),
            live_css: true,
            live_img: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientMessage {
    command: String,
}

#[derive(Debug, Default, Deserialize)]
struct ChangedQuery {
    files: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChangedBody {
    #[serde(default)]
    files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangedResponse {
    pub clients: usize,
    pub files: Vec<String>,
}

pub fn create_router(reload: LiveReload) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/changed", get(changed_get).post(changed_post))
        .route("/livereload", get(ws_handler))
        .route("/livereload.js", get(client_script))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(reload)
}

async fn welcome() -> impl IntoResponse {
    Json(serde_json::json!({
        "tinylr": "Welcome",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn changed_get(
    State(reload): State<LiveReload>,
    Query(query): Query<ChangedQuery>,
) -> Json<ChangedResponse> {
    let files: Vec<String> = query
        .files
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();

    notify(&reload, files)
}

async fn changed_post(
    State(reload): State<LiveReload>,
    Json(body): Json<ChangedBody>,
) -> Json<ChangedResponse> {
    notify(&reload, body.files)
}

fn notify(reload: &LiveReload, files: Vec<String>) -> Json<ChangedResponse> {
    let clients = reload.changed(&files);
    Json(ChangedResponse { clients, files })
}

async fn client_script(State(reload): State<LiveReload>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        reload.client_script(),
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(reload): State<LiveReload>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, reload))
}

async fn handle_socket(mut socket: WebSocket, reload: LiveReload) {
    let mut changes = reload.subscribe();
    tracing::info!("Live-reload client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let is_hello = serde_json::from_str::<ClientMessage>(text.as_str())
                        .is_ok_and(|msg| msg.command == "hello");
                    if is_hello && send(&mut socket, &ServerMessage::hello()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            change = changes.recv() => match change {
                Ok(path) => {
                    if send(&mut socket, &ServerMessage::reload(path)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Live-reload client fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::info!("Live-reload client disconnected");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}
