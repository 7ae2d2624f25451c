use std::fmt;

/// Connection / simulation status as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Event stream not yet open.
    #[default]
    Connecting,
    /// Event stream open, no header received yet.
    Connected,
    /// Header received, simulation not running.
    Offline,
    /// Header received, simulation running.
    Running,
    /// Reload requested, waiting for the server.
    Reloading,
    /// The simulation reported an unrecoverable error.
    FatalError,
    /// The simulation stopped.
    Terminated,
    /// The event stream closed; no automatic reconnect.
    ConnectionLost,
}

impl ConnectionStatus {
    /// User-facing label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Offline => "Offline",
            Self::Running => "Running",
            Self::Reloading => "Reloading",
            Self::FatalError => "Fatal Error",
            Self::Terminated => "Terminated",
            Self::ConnectionLost => "Connection Lost",
        }
    }

    /// `true` once nothing more will arrive on the event stream.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ConnectionLost)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header information about the subscribed simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimInfo {
    /// Session identifier used in every request.
    pub uuid: Option<String>,
    /// Display name.
    pub name: String,
    /// Frames available on the server.
    pub frame_count: u32,
    /// Whether the simulation process is running.
    pub is_online: bool,
}

/// Titled text panel for server diagnostics. Opening it suspends camera
/// input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    /// Panel title.
    pub title: String,
    /// Current text (replaced, not appended, on each write).
    pub text: String,
    /// Whether the panel is showing.
    pub open: bool,
}

impl MessageLog {
    /// Show the panel under `title` with `text`.
    pub fn open_with(&mut self, title: &str, text: &str) {
        title.clone_into(&mut self.title);
        text.clone_into(&mut self.text);
        self.open = true;
    }

    /// Hide the panel, optionally dropping its text.
    pub fn close(&mut self, clear: bool) {
        self.open = false;
        if clear {
            self.title.clear();
            self.text.clear();
        }
    }

    /// Write a diagnostic into the panel, keeping the current title if it
    /// is already open.
    pub fn report(&mut self, title: &str, text: &str) {
        if self.open && !self.title.is_empty() {
            self.text = format!("{}\n{text}", self.text);
        } else {
            self.open_with(title, text);
        }
    }
}
