//! Frame session: asynchronous fetches, their ordering, and the event
//! stream that drives them.
//!
//! Every fetch runs on its own short-lived named thread and reports back
//! over an mpsc channel. [`FrameSession::poll`] drains that channel and the
//! event stream once per tick on the render thread, so [`SceneState`] is
//! only ever touched there. Frame and cell-detail completions pass through
//! a [`RequestSequencer`]: a result older than the last one applied is
//! dropped, and a failed result never advances the high-water mark.

mod message;
mod sequencer;
mod transport;

pub use message::{OutboundMessage, SimHeader, StreamMessage};
pub use sequencer::RequestSequencer;
pub use transport::{
    EventChannel, FrameSource, HttpFrameSource, StreamEvent, WebSocketChannel,
};

use std::sync::{mpsc, Arc};
use std::thread;

use serde_json::{Map, Value};

use crate::error::ViewerError;
use crate::frame::{self, ShapeOverlay};
use crate::options::ConnectionOptions;
use crate::scene::{format_property, ConnectionStatus, SceneState, SimInfo};

/// Result of one worker-thread fetch.
#[derive(Debug)]
enum Completion {
    Frame {
        ticket: u64,
        index: u32,
        result: Result<Vec<u8>, ViewerError>,
    },
    Shapes(Result<Vec<ShapeOverlay>, ViewerError>),
    CellInfo {
        ticket: u64,
        cell_id: u64,
        result: Result<Map<String, Value>, ViewerError>,
    },
}

/// Owns the network side of the viewer.
pub struct FrameSession {
    source: Arc<dyn FrameSource>,
    channel: Option<Box<dyn EventChannel>>,
    /// Simulation id to subscribe to on (re)connect.
    target: String,
    frames: RequestSequencer,
    details: RequestSequencer,
    completions_tx: mpsc::Sender<Completion>,
    completions: mpsc::Receiver<Completion>,
}

impl FrameSession {
    /// Open the event stream for `uuid` against the server in `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::ThreadSpawn`] if the stream thread cannot
    /// start. Connection failures arrive later as a closed stream.
    pub fn connect(
        options: &ConnectionOptions,
        uuid: &str,
    ) -> Result<Self, ViewerError> {
        let url = options.event_stream_url();
        log::info!("opening event stream {url} for simulation {uuid}");
        let channel = WebSocketChannel::connect(url)?;
        Ok(Self::with_parts(
            Arc::new(HttpFrameSource::new(options)),
            Some(Box::new(channel)),
            uuid,
        ))
    }

    /// Session over explicit transports.
    #[must_use]
    pub fn with_parts(
        source: Arc<dyn FrameSource>,
        channel: Option<Box<dyn EventChannel>>,
        uuid: &str,
    ) -> Self {
        let (completions_tx, completions) = mpsc::channel();
        Self {
            source,
            channel,
            target: uuid.to_owned(),
            frames: RequestSequencer::new(),
            details: RequestSequencer::new(),
            completions_tx,
            completions,
        }
    }

    /// Simulation id currently subscribed to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the event stream is still attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    // ── requests ──

    /// Move the timeline to `index` and fetch that frame. The previous
    /// frame stays on screen until the fetch lands.
    pub fn request_frame(&mut self, index: u32, scene: &mut SceneState) {
        scene.requested_frame = index;
        let Some(uuid) = scene.sim.uuid.clone() else {
            log::debug!("frame {index} requested before the simulation header");
            return;
        };
        let ticket = self.frames.issue();
        self.spawn("frame-fetch", move |source| {
            Some(Completion::Frame {
                ticket,
                index,
                result: source.fetch_frame(&uuid, index),
            })
        });
    }

    /// Refetch the overlay list.
    pub fn request_shapes(&mut self, scene: &SceneState) {
        let Some(uuid) = scene.sim.uuid.clone() else {
            return;
        };
        self.spawn("shape-fetch", move |source| {
            Some(Completion::Shapes(source.fetch_shapes(&uuid)))
        });
    }

    /// Fetch the property table of the selected cell at the applied frame.
    /// Does nothing unless the selected cell is present in that frame.
    pub fn request_cell_info(&mut self, scene: &SceneState) {
        let (Some(uuid), Some(cell_id), Some(_), Some(frame_index)) = (
            scene.sim.uuid.clone(),
            scene.selection.identifier,
            scene.selection.index,
            scene.frame_index,
        ) else {
            return;
        };
        let ticket = self.details.issue();
        self.spawn("cell-info-fetch", move |source| {
            Some(Completion::CellInfo {
                ticket,
                cell_id,
                result: source.fetch_cell_info(&uuid, cell_id, frame_index),
            })
        });
    }

    /// Ask the server to reload the simulation.
    pub fn reload(&mut self, scene: &mut SceneState) {
        if self.channel.is_none() {
            log::warn!("cannot reload: event stream closed");
            return;
        }
        scene.status = ConnectionStatus::Reloading;
        scene.message_log.close(true);
        self.send(&OutboundMessage::Reload, scene);
    }

    /// Ask the server to stop the simulation; the outcome is only logged.
    pub fn stop(&mut self, scene: &SceneState) {
        let Some(uuid) = scene.sim.uuid.clone() else {
            return;
        };
        self.spawn("stop-simulation", move |source| {
            match source.stop_simulation(&uuid) {
                Ok(()) => log::info!("stop requested for simulation {uuid}"),
                Err(e) => log::error!("stop request failed: {e}"),
            }
            None
        });
    }

    fn spawn<F>(&self, name: &str, job: F)
    where
        F: FnOnce(&dyn FrameSource) -> Option<Completion> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        let spawned = thread::Builder::new().name(name.to_owned()).spawn(move || {
            if let Some(done) = job(source.as_ref()) {
                // The session may be gone by now.
                let _ = tx.send(done);
            }
        });
        if let Err(e) = spawned {
            log::error!("{}", ViewerError::ThreadSpawn(e));
        }
    }

    fn send(&mut self, message: &OutboundMessage, scene: &mut SceneState) {
        let Some(channel) = self.channel.as_mut() else {
            log::warn!("event stream closed, dropping {message:?}");
            return;
        };
        if let Err(e) = channel.send(message) {
            self.lose_connection(&e.to_string(), scene);
        }
    }

    fn lose_connection(&mut self, reason: &str, scene: &mut SceneState) {
        log::error!("event stream lost: {reason}");
        self.channel = None;
        scene.status = ConnectionStatus::ConnectionLost;
    }

    // ── per-tick pump ──

    /// Apply everything that arrived since the last tick. Never blocks.
    pub fn poll(&mut self, scene: &mut SceneState) {
        let events: Vec<StreamEvent> = match self.channel.as_mut() {
            Some(channel) => std::iter::from_fn(|| channel.try_recv()).collect(),
            None => Vec::new(),
        };
        for event in events {
            self.handle_event(event, scene);
        }

        while let Ok(done) = self.completions.try_recv() {
            self.handle_completion(done, scene);
        }
    }

    fn handle_event(&mut self, event: StreamEvent, scene: &mut SceneState) {
        match event {
            StreamEvent::Opened => {
                scene.status = ConnectionStatus::Connected;
                let target = OutboundMessage::ConnectTo(self.target.clone());
                self.send(&target, scene);
            }
            StreamEvent::Message(msg) => self.handle_message(msg, scene),
            StreamEvent::Closed(reason) => self.lose_connection(&reason, scene),
        }
    }

    fn handle_message(&mut self, msg: StreamMessage, scene: &mut SceneState) {
        match msg {
            StreamMessage::SimHeader(header) => {
                log::info!(
                    "subscribed to '{}' ({} frames, online: {})",
                    header.name,
                    header.frame_count,
                    header.is_online
                );
                scene.sim = SimInfo {
                    uuid: Some(header.uuid),
                    name: header.name,
                    frame_count: header.frame_count,
                    is_online: header.is_online,
                };
                scene.status = if header.is_online {
                    ConnectionStatus::Running
                } else {
                    ConnectionStatus::Offline
                };
                if let Some(crash) = header.crash_message {
                    scene.message_log.open_with("Crash error", &crash);
                }
                self.request_shapes(scene);
                // A header also arrives after a reload or reconnect; keep the
                // viewed step rather than rewinding to frame 0.
                if let Some(last) = scene.last_frame() {
                    let index = if scene.always_show_latest {
                        last
                    } else {
                        scene.requested_frame.min(last)
                    };
                    self.request_frame(index, scene);
                }
            }
            StreamMessage::NewFrame { frame_count } => {
                scene.sim.frame_count = frame_count;
                if scene.always_show_latest {
                    if let Some(last) = scene.last_frame() {
                        self.request_frame(last, scene);
                    }
                }
            }
            StreamMessage::NewShape => self.request_shapes(scene),
            StreamMessage::InfoLog(text) => {
                scene.message_log.open_with("Initialization Log", &text);
            }
            StreamMessage::ErrorMessage(text) => {
                log::error!("simulation error: {text}");
                scene.message_log.open_with("Error Log", &text);
                scene.status = ConnectionStatus::FatalError;
            }
            StreamMessage::CloseInfoLog => scene.message_log.close(true),
            StreamMessage::SimStopped => {
                log::info!("simulation stopped");
                scene.status = ConnectionStatus::Terminated;
            }
            StreamMessage::ReloadDone { uuid } => {
                log::info!("reload finished, subscribing to {uuid}");
                self.target.clone_from(&uuid);
                self.send(&OutboundMessage::ConnectTo(uuid), scene);
            }
            StreamMessage::Unknown(action) => {
                log::debug!("ignoring stream action '{action}'");
            }
        }
    }

    fn handle_completion(&mut self, done: Completion, scene: &mut SceneState) {
        match done {
            Completion::Frame {
                ticket,
                index,
                result,
            } => {
                if !self.frames.is_current(ticket) {
                    log::debug!("dropping stale frame {index} (request {ticket})");
                    return;
                }
                let decoded = result.and_then(|bytes| {
                    frame::decode(&bytes).map_err(ViewerError::from)
                });
                match decoded {
                    Ok(frame) => {
                        self.frames.commit(ticket);
                        scene.apply_frame(frame, index);
                        self.request_cell_info(scene);
                    }
                    Err(e) => log::warn!("frame {index} not applied: {e}"),
                }
            }
            Completion::Shapes(result) => match result {
                Ok(shapes) => {
                    log::debug!("{} shape overlays", shapes.len());
                    scene.set_shapes(shapes);
                }
                Err(e) => log::warn!("shape list not applied: {e}"),
            },
            Completion::CellInfo {
                ticket,
                cell_id,
                result,
            } => {
                if !self.details.is_current(ticket) {
                    return;
                }
                match result {
                    Ok(props) => {
                        self.details.commit(ticket);
                        if scene.selection.identifier != Some(cell_id) {
                            return;
                        }
                        scene.selection.set_details(&props);
                        log::info!("cell {cell_id}:");
                        for (key, value) in &props {
                            log::info!("  {key}: {}", format_property(value));
                        }
                    }
                    Err(e) => log::warn!("details for cell {cell_id} not applied: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::frame::{encode, CellInstance, Frame};
    use crate::options::Options;

    #[derive(Default)]
    struct FakeSource {
        frames: HashMap<u32, Vec<u8>>,
    }

    impl FrameSource for FakeSource {
        fn fetch_frame(&self, _uuid: &str, index: u32) -> Result<Vec<u8>, ViewerError> {
            self.frames
                .get(&index)
                .cloned()
                .ok_or_else(|| ViewerError::Network(format!("404 for frame {index}")))
        }

        fn fetch_shapes(&self, _uuid: &str) -> Result<Vec<ShapeOverlay>, ViewerError> {
            crate::frame::shapes::parse_shape_list(
                r#"[{"type": "sphere", "pos": [1, 2, 3], "radius": 4}]"#,
            )
        }

        fn fetch_cell_info(
            &self,
            _uuid: &str,
            cell_id: u64,
            _frame_index: u32,
        ) -> Result<Map<String, Value>, ViewerError> {
            match json!({"id": cell_id, "volume": 1.234_567_8}) {
                Value::Object(map) => Ok(map),
                _ => unreachable!(),
            }
        }

        fn stop_simulation(&self, _uuid: &str) -> Result<(), ViewerError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeChannelState {
        inbound: VecDeque<StreamEvent>,
        sent: Vec<OutboundMessage>,
        broken: bool,
    }

    #[derive(Clone, Default)]
    struct FakeChannel(Rc<RefCell<FakeChannelState>>);

    impl FakeChannel {
        fn push(&self, event: StreamEvent) {
            self.0.borrow_mut().inbound.push_back(event);
        }

        fn push_json(&self, text: &str) {
            self.push(StreamEvent::Message(StreamMessage::parse(text).unwrap()));
        }

        fn sent(&self) -> Vec<OutboundMessage> {
            self.0.borrow().sent.clone()
        }
    }

    impl EventChannel for FakeChannel {
        fn send(&mut self, message: &OutboundMessage) -> Result<(), ViewerError> {
            let mut state = self.0.borrow_mut();
            if state.broken {
                return Err(ViewerError::StreamClosed("broken pipe".into()));
            }
            state.sent.push(message.clone());
            Ok(())
        }

        fn try_recv(&mut self) -> Option<StreamEvent> {
            self.0.borrow_mut().inbound.pop_front()
        }
    }

    fn frame_with(ids: &[u64]) -> Frame {
        Frame {
            cells: ids
                .iter()
                .map(|&id| CellInstance {
                    position: [id as f32, 0.0, 0.0],
                    axis_direction: [0.0, 1.0, 0.0],
                    length: 2.0,
                    radius: 0.5,
                    color_rgba: [255, 0, 0, 255],
                })
                .collect(),
            cell_ids: ids.to_vec(),
            field: None,
        }
    }

    fn setup(source: FakeSource) -> (FrameSession, FakeChannel, SceneState) {
        let channel = FakeChannel::default();
        let session = FrameSession::with_parts(
            Arc::new(source),
            Some(Box::new(channel.clone())),
            "sim-1",
        );
        let scene = SceneState::new(&Options::default(), 1.0);
        (session, channel, scene)
    }

    fn pump_until(
        session: &mut FrameSession,
        scene: &mut SceneState,
        done: impl Fn(&SceneState) -> bool,
    ) {
        for _ in 0..500 {
            session.poll(scene);
            if done(scene) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("session did not settle");
    }

    #[test]
    fn out_of_order_frames_apply_only_the_newest() {
        let (mut session, _channel, mut scene) = setup(FakeSource::default());
        let tickets = [
            session.frames.issue(),
            session.frames.issue(),
            session.frames.issue(),
        ];
        for (ticket, index) in [(tickets[2], 30), (tickets[0], 10), (tickets[1], 20)] {
            session.handle_completion(
                Completion::Frame {
                    ticket,
                    index,
                    result: Ok(encode(&frame_with(&[u64::from(index)]))),
                },
                &mut scene,
            );
        }
        assert_eq!(scene.frame_index, Some(30));
        assert_eq!(scene.frame.cell_ids, vec![30]);
        assert_eq!(scene.frame_version, 1);
        assert_eq!(session.frames.last_applied(), 3);
    }

    #[test]
    fn malformed_frame_keeps_previous_and_does_not_commit() {
        let (mut session, _channel, mut scene) = setup(FakeSource::default());
        let first = session.frames.issue();
        let second = session.frames.issue();
        session.handle_completion(
            Completion::Frame {
                ticket: second,
                index: 2,
                result: Ok(vec![9, 0, 0, 0, 1]),
            },
            &mut scene,
        );
        assert_eq!(scene.frame_index, None);
        assert_eq!(session.frames.last_applied(), 0);

        session.handle_completion(
            Completion::Frame {
                ticket: first,
                index: 1,
                result: Ok(encode(&frame_with(&[7]))),
            },
            &mut scene,
        );
        assert_eq!(scene.frame_index, Some(1));

        let third = session.frames.issue();
        session.handle_completion(
            Completion::Frame {
                ticket: third,
                index: 3,
                result: Err(ViewerError::Network("timeout".into())),
            },
            &mut scene,
        );
        assert_eq!(scene.frame_index, Some(1));
        assert_eq!(scene.status, ConnectionStatus::Connecting);
    }

    #[test]
    fn stream_open_subscribes_and_header_fetches_frame_and_shapes() {
        let mut source = FakeSource::default();
        let _ = source.frames.insert(0, encode(&frame_with(&[100, 200])));
        let (mut session, channel, mut scene) = setup(source);

        channel.push(StreamEvent::Opened);
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::Connected);
        assert_eq!(channel.sent(), vec![OutboundMessage::ConnectTo("sim-1".into())]);

        channel.push_json(
            r#"{"action": "simheader", "data": {"uuid": "sim-1", "name": "colony",
                "frameCount": 1, "isOnline": true}}"#,
        );
        pump_until(&mut session, &mut scene, |s| {
            s.frame_index.is_some() && s.shapes_version > 0
        });
        assert_eq!(scene.status, ConnectionStatus::Running);
        assert_eq!(scene.sim.name, "colony");
        assert_eq!(scene.frame.cell_ids, vec![100, 200]);
        assert_eq!(scene.shapes.len(), 1);
        assert!(!scene.message_log.open);
    }

    #[test]
    fn header_keeps_viewed_frame_clamped_to_last() {
        let mut source = FakeSource::default();
        for index in 0..5 {
            let _ = source.frames.insert(index, encode(&frame_with(&[u64::from(index)])));
        }
        let (mut session, channel, mut scene) = setup(source);

        scene.requested_frame = 2;
        channel.push_json(
            r#"{"action": "simheader", "data": {"uuid": "sim-1", "name": "colony",
                "frameCount": 5, "isOnline": true}}"#,
        );
        pump_until(&mut session, &mut scene, |s| s.frame_index == Some(2));
        assert_eq!(scene.frame.cell_ids, vec![2]);

        scene.requested_frame = 9;
        channel.push_json(
            r#"{"action": "simheader", "data": {"uuid": "sim-1", "name": "colony",
                "frameCount": 4, "isOnline": true}}"#,
        );
        pump_until(&mut session, &mut scene, |s| s.frame_index == Some(3));
        assert_eq!(scene.requested_frame, 3);
    }

    #[test]
    fn crash_header_opens_log_and_offline_status() {
        let (mut session, channel, mut scene) = setup(FakeSource::default());
        channel.push_json(
            r#"{"action": "simheader", "data": {"uuid": "sim-1", "name": "x",
                "frameCount": 0, "isOnline": false, "crashMessage": "segfault"}}"#,
        );
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::Offline);
        assert_eq!(scene.message_log.title, "Crash error");
        assert_eq!(scene.message_log.text, "segfault");
        assert!(scene.message_log.open);
    }

    #[test]
    fn new_frames_follow_latest_only_when_pinned() {
        let mut source = FakeSource::default();
        let _ = source.frames.insert(4, encode(&frame_with(&[1])));
        let (mut session, channel, mut scene) = setup(source);
        scene.sim.uuid = Some("sim-1".into());

        channel.push_json(r#"{"action": "newframe", "data": {"frameCount": 5}}"#);
        session.poll(&mut scene);
        assert_eq!(scene.sim.frame_count, 5);
        assert_eq!(session.frames.latest_issued(), 0);

        scene.always_show_latest = true;
        channel.push_json(r#"{"action": "newframe", "data": {"frameCount": 5}}"#);
        pump_until(&mut session, &mut scene, |s| s.frame_index == Some(4));
        assert_eq!(scene.requested_frame, 4);
    }

    #[test]
    fn log_and_status_messages() {
        let (mut session, channel, mut scene) = setup(FakeSource::default());

        channel.push_json(r#"{"action": "infolog", "data": "building"}"#);
        session.poll(&mut scene);
        assert_eq!(scene.message_log.title, "Initialization Log");
        assert!(!scene.camera_input_enabled());

        channel.push_json(r#"{"action": "closeinfolog", "data": ""}"#);
        session.poll(&mut scene);
        assert!(!scene.message_log.open);
        assert!(scene.message_log.text.is_empty());

        channel.push_json(r#"{"action": "error_message", "data": "Traceback"}"#);
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::FatalError);
        assert_eq!(scene.message_log.title, "Error Log");

        channel.push_json(r#"{"action": "simstopped", "data": ""}"#);
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::Terminated);
    }

    #[test]
    fn reload_round_trip_resubscribes() {
        let (mut session, channel, mut scene) = setup(FakeSource::default());
        scene.message_log.open_with("Error Log", "old");

        session.reload(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::Reloading);
        assert!(!scene.message_log.open);
        assert!(scene.message_log.text.is_empty());

        channel.push_json(r#"{"action": "reloaddone", "data": {"uuid": "sim-2"}}"#);
        session.poll(&mut scene);
        assert_eq!(session.target(), "sim-2");
        assert_eq!(
            channel.sent(),
            vec![
                OutboundMessage::Reload,
                OutboundMessage::ConnectTo("sim-2".into())
            ]
        );
    }

    #[test]
    fn closed_stream_is_terminal() {
        let (mut session, channel, mut scene) = setup(FakeSource::default());
        channel.push(StreamEvent::Closed("reset by peer".into()));
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::ConnectionLost);
        assert!(scene.status.is_terminal());
        assert!(!session.is_connected());

        // No reconnect, and a reload cannot be sent any more.
        session.reload(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::ConnectionLost);
        assert_eq!(channel.sent(), Vec::new());
    }

    #[test]
    fn failed_send_loses_connection() {
        let (mut session, channel, mut scene) = setup(FakeSource::default());
        channel.0.borrow_mut().broken = true;
        channel.push(StreamEvent::Opened);
        session.poll(&mut scene);
        assert_eq!(scene.status, ConnectionStatus::ConnectionLost);
    }

    #[test]
    fn cell_info_is_sequence_guarded_and_formatted() {
        let (mut session, _channel, mut scene) = setup(FakeSource::default());
        scene.apply_frame(frame_with(&[5, 6]), 0);
        scene.selection.select(Some(6), &scene.frame);

        let old = session.details.issue();
        let new = session.details.issue();
        let props = |v: f64| match json!({"volume": v}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        session.handle_completion(
            Completion::CellInfo {
                ticket: new,
                cell_id: 6,
                result: Ok(props(2.0)),
            },
            &mut scene,
        );
        session.handle_completion(
            Completion::CellInfo {
                ticket: old,
                cell_id: 6,
                result: Ok(props(1.0)),
            },
            &mut scene,
        );
        assert_eq!(
            scene.selection.details,
            vec![("volume".to_owned(), "2".to_owned())]
        );
    }

    #[test]
    fn selection_fetches_details_on_frame_change() {
        let mut source = FakeSource::default();
        let _ = source.frames.insert(1, encode(&frame_with(&[5, 6])));
        let (mut session, _channel, mut scene) = setup(source);
        scene.sim.uuid = Some("sim-1".into());
        scene.sim.frame_count = 2;
        scene.selection.identifier = Some(6);

        session.request_frame(1, &mut scene);
        assert_eq!(scene.requested_frame, 1);
        pump_until(&mut session, &mut scene, |s| !s.selection.details.is_empty());
        assert_eq!(scene.selection.index, Some(1));
        assert!(scene
            .selection
            .details
            .contains(&("volume".to_owned(), "1.23456".to_owned())));
    }
}
