//! Event-stream messages: the `{action, data}` envelope in both directions.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ViewerError;

/// Payload of a `simheader` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimHeader {
    /// Session identifier for subsequent requests.
    pub uuid: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Frames available.
    #[serde(default)]
    pub frame_count: u32,
    /// Whether the simulation process is running.
    #[serde(default)]
    pub is_online: bool,
    /// Set when the simulation crashed.
    #[serde(default)]
    pub crash_message: Option<String>,
}

/// One inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    /// Subscription confirmed; carries the simulation header.
    SimHeader(SimHeader),
    /// The simulation produced frames.
    NewFrame {
        /// Frames now available.
        frame_count: u32,
    },
    /// The overlay list changed.
    NewShape,
    /// Initialization diagnostic text.
    InfoLog(String),
    /// Unrecoverable simulation error text.
    ErrorMessage(String),
    /// Initialization finished; hide the log.
    CloseInfoLog,
    /// The simulation stopped.
    SimStopped,
    /// A reload finished under a (possibly new) session id.
    ReloadDone {
        /// Session id to subscribe to.
        uuid: String,
    },
    /// An action this viewer does not know.
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    action: String,
    #[serde(default)]
    data: Value,
}

fn text_of(data: Value) -> String {
    match data {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl StreamMessage {
    /// Parse one text frame from the event stream.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Network`] if the text is not an envelope or a
    /// known action carries a malformed payload.
    pub fn parse(text: &str) -> Result<Self, ViewerError> {
        let Envelope { action, data } = serde_json::from_str(text)
            .map_err(|e| ViewerError::Network(format!("bad envelope: {e}")))?;
        let payload_error = |e: serde_json::Error| {
            ViewerError::Network(format!("bad '{action}' payload: {e}"))
        };

        let msg = match action.as_str() {
            "simheader" => Self::SimHeader(
                serde_json::from_value(data).map_err(payload_error)?,
            ),
            "newframe" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct NewFrame {
                    frame_count: u32,
                }
                let NewFrame { frame_count } =
                    serde_json::from_value(data).map_err(payload_error)?;
                Self::NewFrame { frame_count }
            }
            "newshape" => Self::NewShape,
            "infolog" => Self::InfoLog(text_of(data)),
            "error_message" => Self::ErrorMessage(text_of(data)),
            "closeinfolog" => Self::CloseInfoLog,
            "simstopped" => Self::SimStopped,
            "reloaddone" => {
                let uuid = data.get("uuid").cloned().map(text_of).ok_or_else(
                    || ViewerError::Network("reloaddone without uuid".into()),
                )?;
                Self::ReloadDone { uuid }
            }
            other => Self::Unknown(other.to_owned()),
        };
        Ok(msg)
    }
}

/// One outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Subscribe to a simulation.
    ConnectTo(String),
    /// Ask the server to reload the subscribed simulation.
    Reload,
}

impl OutboundMessage {
    /// Wire form of the envelope.
    #[must_use]
    pub fn to_json(&self) -> String {
        match self {
            Self::ConnectTo(uuid) => json!({"action": "connectto", "data": uuid}),
            Self::Reload => json!({"action": "reload", "data": ""}),
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simheader() {
        let msg = StreamMessage::parse(
            r#"{"action": "simheader", "data": {"uuid": "abc", "name": "colony",
                "frameCount": 12, "isOnline": true, "crashMessage": null}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            StreamMessage::SimHeader(SimHeader {
                uuid: "abc".into(),
                name: "colony".into(),
                frame_count: 12,
                is_online: true,
                crash_message: None,
            })
        );
    }

    #[test]
    fn parses_simple_actions() {
        let cases = [
            (
                r#"{"action": "newframe", "data": {"frameCount": 5}}"#,
                StreamMessage::NewFrame { frame_count: 5 },
            ),
            (r#"{"action": "newshape", "data": ""}"#, StreamMessage::NewShape),
            (
                r#"{"action": "infolog", "data": "compiling"}"#,
                StreamMessage::InfoLog("compiling".into()),
            ),
            (
                r#"{"action": "error_message", "data": "Traceback"}"#,
                StreamMessage::ErrorMessage("Traceback".into()),
            ),
            (r#"{"action": "closeinfolog"}"#, StreamMessage::CloseInfoLog),
            (r#"{"action": "simstopped", "data": ""}"#, StreamMessage::SimStopped),
            (
                r#"{"action": "reloaddone", "data": {"uuid": "new-id"}}"#,
                StreamMessage::ReloadDone {
                    uuid: "new-id".into(),
                },
            ),
            (
                r#"{"action": "heartbeat", "data": 1}"#,
                StreamMessage::Unknown("heartbeat".into()),
            ),
        ];
        for (text, expected) in cases {
            assert_eq!(StreamMessage::parse(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(StreamMessage::parse("not json").is_err());
        assert!(StreamMessage::parse(r#"{"data": 1}"#).is_err());
        assert!(StreamMessage::parse(
            r#"{"action": "newframe", "data": {"count": 5}}"#
        )
        .is_err());
        assert!(StreamMessage::parse(r#"{"action": "reloaddone", "data": {}}"#)
            .is_err());
    }

    #[test]
    fn outbound_envelopes() {
        let v: Value = serde_json::from_str(
            &OutboundMessage::ConnectTo("abc".into()).to_json(),
        )
        .unwrap();
        assert_eq!(v, json!({"action": "connectto", "data": "abc"}));
        let v: Value =
            serde_json::from_str(&OutboundMessage::Reload.to_json()).unwrap();
        assert_eq!(v["action"], "reload");
    }
}
