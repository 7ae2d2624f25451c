//! Network seams: the REST frame source and the duplex event stream.
//!
//! Both are traits so the session can be driven by in-process fakes; the
//! production implementations are blocking clients (`ureq`, `tungstenite`)
//! that the session runs on worker threads.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::mpsc::{self, TryRecvError};
use std::time::Duration;

use serde_json::{Map, Value};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::message::{OutboundMessage, StreamMessage};
use crate::error::ViewerError;
use crate::frame::shapes::{parse_shape_list, ShapeOverlay};
use crate::options::ConnectionOptions;

/// Blocking request/response access to simulation data.
pub trait FrameSource: Send + Sync {
    /// Raw frame payload for `index`.
    ///
    /// # Errors
    ///
    /// Transport failure or a non-2xx status.
    fn fetch_frame(&self, uuid: &str, index: u32) -> Result<Vec<u8>, ViewerError>;

    /// Current overlay list.
    ///
    /// # Errors
    ///
    /// Transport failure, a non-2xx status or an unparsable body.
    fn fetch_shapes(&self, uuid: &str) -> Result<Vec<ShapeOverlay>, ViewerError>;

    /// Property table of one cell at one frame.
    ///
    /// # Errors
    ///
    /// Transport failure, a non-2xx status or a non-object body.
    fn fetch_cell_info(
        &self,
        uuid: &str,
        cell_id: u64,
        frame_index: u32,
    ) -> Result<Map<String, Value>, ViewerError>;

    /// Ask the server to stop the simulation.
    ///
    /// # Errors
    ///
    /// Transport failure or a non-2xx status.
    fn stop_simulation(&self, uuid: &str) -> Result<(), ViewerError>;
}

/// [`FrameSource`] over the simulation server's REST API.
pub struct HttpFrameSource {
    agent: ureq::Agent,
    base: String,
    max_frame_bytes: u64,
}

impl HttpFrameSource {
    /// Client for the server named in `options`.
    #[must_use]
    pub fn new(options: &ConnectionOptions) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            base: options.http_base().to_owned(),
            max_frame_bytes: options.max_frame_bytes,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.base)
    }
}

impl FrameSource for HttpFrameSource {
    fn fetch_frame(&self, uuid: &str, index: u32) -> Result<Vec<u8>, ViewerError> {
        let response = self
            .agent
            .get(&self.url("vizdata"))
            .query("index", index.to_string())
            .query("uuid", uuid)
            .call()?;
        let mut body = response.into_body();
        let bytes = body
            .with_config()
            .limit(self.max_frame_bytes)
            .read_to_vec()?;
        Ok(bytes)
    }

    fn fetch_shapes(&self, uuid: &str) -> Result<Vec<ShapeOverlay>, ViewerError> {
        let body = self
            .agent
            .get(&self.url("shapelist"))
            .query("uuid", uuid)
            .call()?
            .into_body()
            .read_to_string()?;
        parse_shape_list(&body)
    }

    fn fetch_cell_info(
        &self,
        uuid: &str,
        cell_id: u64,
        frame_index: u32,
    ) -> Result<Map<String, Value>, ViewerError> {
        let body = self
            .agent
            .get(&self.url("cellinfoindex"))
            .query("cellid", cell_id.to_string())
            .query("frameindex", frame_index.to_string())
            .query("uuid", uuid)
            .call()?
            .into_body()
            .read_to_string()?;
        match serde_json::from_str(&body) {
            Ok(Value::Object(props)) => Ok(props),
            Ok(_) => Err(ViewerError::Network(
                "cell info is not a JSON object".into(),
            )),
            Err(e) => Err(ViewerError::Network(format!("bad cell info: {e}"))),
        }
    }

    fn stop_simulation(&self, uuid: &str) -> Result<(), ViewerError> {
        let _ = self
            .agent
            .get(&self.url("stopsimulation"))
            .query("uuid", uuid)
            .call()?;
        Ok(())
    }
}

/// What the event stream reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The connection is open and outbound messages will be delivered.
    Opened,
    /// One parsed inbound message.
    Message(StreamMessage),
    /// The connection is gone for good.
    Closed(String),
}

/// Duplex, non-blocking event stream.
pub trait EventChannel {
    /// Queue an outbound message.
    ///
    /// # Errors
    ///
    /// [`ViewerError::StreamClosed`] if the stream is gone.
    fn send(&mut self, message: &OutboundMessage) -> Result<(), ViewerError>;

    /// Next pending event, if any. Never blocks.
    fn try_recv(&mut self) -> Option<StreamEvent>;
}

/// How long a socket read may block before queued sends are flushed.
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// [`EventChannel`] backed by a WebSocket serviced on its own detached
/// thread.
pub struct WebSocketChannel {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<StreamEvent>,
}

impl WebSocketChannel {
    /// Spawn the stream thread; it connects to `url` in the background and
    /// reports [`StreamEvent::Opened`] or [`StreamEvent::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::ThreadSpawn`] if the thread cannot start.
    pub fn connect(url: String) -> Result<Self, ViewerError> {
        let (outbound_tx, outbound_rx) = mpsc::channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::channel::<StreamEvent>();

        let _ = std::thread::Builder::new()
            .name("event-stream".into())
            .spawn(move || {
                if let Err(reason) = Self::thread_loop(&url, &outbound_rx, &inbound_tx) {
                    let _ = inbound_tx.send(StreamEvent::Closed(reason));
                }
            })
            .map_err(ViewerError::ThreadSpawn)?;

        Ok(Self {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }

    /// Connect, then alternate between flushing queued sends and reading
    /// with a short timeout. Returns `Ok` only when the viewer side hung up.
    fn thread_loop(
        url: &str,
        outbound: &mpsc::Receiver<String>,
        inbound: &mpsc::Sender<StreamEvent>,
    ) -> Result<(), String> {
        let (mut socket, _response) =
            tungstenite::connect(url).map_err(|e| format!("connect {url}: {e}"))?;
        tcp_stream(socket.get_ref())
            .ok_or_else(|| format!("unsupported stream for {url}"))?
            .set_read_timeout(Some(STREAM_POLL_INTERVAL))
            .map_err(|e| e.to_string())?;
        log::info!("event stream connected to {url}");
        if inbound.send(StreamEvent::Opened).is_err() {
            return Ok(());
        }

        loop {
            if !Self::flush_outbound(&mut socket, outbound)? {
                let _ = socket.close(None);
                return Ok(());
            }

            match socket.read() {
                Ok(Message::Text(text)) => match StreamMessage::parse(text.as_str()) {
                    Ok(msg) => {
                        if inbound.send(StreamEvent::Message(msg)).is_err() {
                            return Ok(());
                        }
                    }
                    Err(e) => log::warn!("ignoring stream message: {e}"),
                },
                Ok(Message::Close(frame)) => {
                    return Err(frame.map_or_else(
                        || "closed by server".to_owned(),
                        |f| format!("closed by server: {}", f.reason.as_str()),
                    ));
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
    }

    /// Send everything queued. `Ok(false)` means the viewer side is gone.
    fn flush_outbound(
        socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
        outbound: &mpsc::Receiver<String>,
    ) -> Result<bool, String> {
        loop {
            match outbound.try_recv() {
                Ok(text) => socket
                    .send(Message::text(text))
                    .map_err(|e| e.to_string())?,
                Err(TryRecvError::Empty) => return Ok(true),
                Err(TryRecvError::Disconnected) => return Ok(false),
            }
        }
    }
}

/// Socket under a plain or TLS stream, where reads time out.
fn tcp_stream(stream: &MaybeTlsStream<TcpStream>) -> Option<&TcpStream> {
    match stream {
        MaybeTlsStream::Plain(stream) => Some(stream),
        MaybeTlsStream::Rustls(stream) => Some(stream.get_ref()),
        _ => None,
    }
}

impl EventChannel for WebSocketChannel {
    fn send(&mut self, message: &OutboundMessage) -> Result<(), ViewerError> {
        self.outbound
            .send(message.to_json())
            .map_err(|_| ViewerError::StreamClosed("stream thread exited".into()))
    }

    fn try_recv(&mut self) -> Option<StreamEvent> {
        self.inbound.try_recv().ok()
    }
}
