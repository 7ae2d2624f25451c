use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Where the simulation server lives and how the session behaves.
pub struct ConnectionOptions {
    /// HTTP base URL for the REST endpoints.
    pub server_url: String,
    /// WebSocket base URL; derived from `server_url` when empty.
    pub stream_url: String,
    /// Path of the event stream below `stream_url`.
    pub stream_path: String,
    /// Largest accepted frame body in bytes.
    pub max_frame_bytes: u64,
    /// Follow the newest frame as the simulation produces it.
    pub always_show_latest: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".into(),
            stream_url: String::new(),
            stream_path: "/ws/usercomms/".into(),
            max_frame_bytes: 512 * 1024 * 1024,
            always_show_latest: false,
        }
    }
}

impl ConnectionOptions {
    /// Full event-stream URL.
    #[must_use]
    pub fn event_stream_url(&self) -> String {
        let base = if self.stream_url.is_empty() {
            derive_ws_base(&self.server_url)
        } else {
            self.stream_url.trim_end_matches('/').to_owned()
        };
        format!("{base}{}", self.stream_path)
    }

    /// HTTP base without a trailing slash.
    #[must_use]
    pub fn http_base(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }
}

fn derive_ws_base(http: &str) -> String {
    let trimmed = http.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{trimmed}")
    }
}
