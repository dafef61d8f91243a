//! # In-Memory Transport
//!
//! Scripted listen backend for tests and local development.
//!
//! The client side implements [`ConnectionFactory`], [`Connection`] and
//! [`StreamHandle`]. Every request is framed through the JSON codec, so the
//! recorded frames are exactly what a text transport would carry. The server
//! side drives each opened stream: accept it, deliver responses, close it.

use std::sync::Arc;

use async_trait::async_trait;
use dw_telemetry::log_event;
use parking_lot::Mutex;

use crate::domain::{DatabaseInfo, TransportError};
use crate::SUBSYSTEM;
use crate::messages::{
    decode_request, decode_response, encode_request, encode_response, ListenRequest,
    ListenResponse,
};
use crate::ports::{
    CloseCallback, Connection, ConnectionFactory, MessageCallback, OpenCallback, StreamHandle,
};

#[derive(Default)]
struct Callbacks {
    on_open: Option<OpenCallback>,
    on_close: Option<CloseCallback>,
    on_message: Option<MessageCallback>,
}

struct StreamSlot {
    operation: String,
    callbacks: Callbacks,
    frames: Vec<String>,
    close_requests: usize,
    opened: bool,
    closed: bool,
}

impl StreamSlot {
    fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            callbacks: Callbacks::default(),
            frames: Vec::new(),
            close_requests: 0,
            opened: false,
            closed: false,
        }
    }
}

struct ServerState {
    auto_open: bool,
    connect_failure: Option<TransportError>,
    open_stream_failure: Option<TransportError>,
    reject_open: Option<TransportError>,
    connections: Vec<DatabaseInfo>,
    streams: Vec<StreamSlot>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            auto_open: true,
            connect_failure: None,
            open_stream_failure: None,
            reject_open: None,
            connections: Vec::new(),
            streams: Vec::new(),
        }
    }
}

/// Shared handle on the scripted backend.
///
/// Cloning yields another handle on the same backend.
#[derive(Clone, Default)]
pub struct InMemoryServer {
    state: Arc<Mutex<ServerState>>,
}

impl InMemoryServer {
    /// Backend that accepts every stream as soon as its callbacks are set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle automatic acceptance of new streams.
    pub fn set_auto_open(&self, auto_open: bool) {
        self.state.lock().auto_open = auto_open;
    }

    /// Fail every `connect` with `err`.
    pub fn fail_connect_with(&self, err: TransportError) {
        self.state.lock().connect_failure = Some(err);
    }

    /// Fail every `open_stream` with `err`.
    pub fn fail_open_stream_with(&self, err: TransportError) {
        self.state.lock().open_stream_failure = Some(err);
    }

    /// Close new streams with `err` instead of opening them.
    pub fn reject_open_with(&self, err: TransportError) {
        self.state.lock().reject_open = Some(err);
    }

    /// Number of streams opened so far.
    pub fn streams_opened(&self) -> usize {
        self.state.lock().streams.len()
    }

    /// Operation names streams were opened for, in order.
    pub fn operations(&self) -> Vec<String> {
        self.state
            .lock()
            .streams
            .iter()
            .map(|slot| slot.operation.clone())
            .collect()
    }

    /// Connection parameters seen by `connect`, in order.
    pub fn connections(&self) -> Vec<DatabaseInfo> {
        self.state.lock().connections.clone()
    }

    /// Raw JSON frames the client sent on stream `index`.
    pub fn sent_frames(&self, index: usize) -> Vec<String> {
        self.state
            .lock()
            .streams
            .get(index)
            .map(|slot| slot.frames.clone())
            .unwrap_or_default()
    }

    /// Requests the client sent on stream `index`, decoded.
    pub fn sent_requests(&self, index: usize) -> Vec<ListenRequest> {
        self.sent_frames(index)
            .iter()
            .filter_map(|frame| decode_request(frame).ok())
            .collect()
    }

    /// How many times the client asked to close stream `index`.
    pub fn close_requests(&self, index: usize) -> usize {
        self.state
            .lock()
            .streams
            .get(index)
            .map_or(0, |slot| slot.close_requests)
    }

    /// Whether stream `index` has ended.
    pub fn is_closed(&self, index: usize) -> bool {
        self.state
            .lock()
            .streams
            .get(index)
            .map_or(false, |slot| slot.closed)
    }

    /// Wait until stream `index` exists and has an open callback.
    pub async fn wait_for_stream(&self, index: usize) {
        loop {
            let ready = self
                .state
                .lock()
                .streams
                .get(index)
                .map_or(false, |slot| slot.callbacks.on_open.is_some() || slot.opened);
            if ready {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Report stream `index` open. Returns `false` if it cannot open.
    pub fn accept(&self, index: usize) -> bool {
        let callback = {
            let mut state = self.state.lock();
            let Some(slot) = state.streams.get_mut(index) else {
                return false;
            };
            if slot.closed || slot.opened {
                return false;
            }
            let Some(callback) = slot.callbacks.on_open.take() else {
                return false;
            };
            slot.opened = true;
            callback
        };
        callback();
        true
    }

    /// Deliver a typed response on stream `index`.
    pub fn deliver(&self, index: usize, response: ListenResponse) -> Result<(), TransportError> {
        let frame = encode_response(&response)?;
        self.deliver_frame(index, &frame)
    }

    /// Deliver a raw JSON frame on stream `index`.
    pub fn deliver_frame(&self, index: usize, frame: &str) -> Result<(), TransportError> {
        let response = decode_response(frame)?;

        let mut callback = {
            let mut state = self.state.lock();
            let slot = state
                .streams
                .get_mut(index)
                .ok_or_else(|| TransportError::Unavailable(format!("no stream {index}")))?;
            if slot.closed {
                return Err(TransportError::Unavailable("stream closed".to_string()));
            }
            slot.callbacks
                .on_message
                .take()
                .ok_or_else(|| TransportError::Unavailable("no message callback".to_string()))?
        };
        callback(response);

        let mut state = self.state.lock();
        if let Some(slot) = state.streams.get_mut(index) {
            if !slot.closed {
                slot.callbacks.on_message.get_or_insert(callback);
            }
        }
        Ok(())
    }

    /// End stream `index` from the server side, with or without an error.
    pub fn close_stream(&self, index: usize, error: Option<TransportError>) {
        if let Some(callback) = self.finish(index) {
            log_event!(
                debug,
                SUBSYSTEM,
                "[dw-02] In-memory server closed stream",
                index,
                error = ?error
            );
            callback(error);
        }
    }

    /// Mark stream `index` closed, handing back its close callback once.
    fn finish(&self, index: usize) -> Option<CloseCallback> {
        let mut state = self.state.lock();
        let slot = state.streams.get_mut(index)?;
        if slot.closed {
            return None;
        }
        slot.closed = true;
        slot.callbacks.on_open = None;
        slot.callbacks.on_message = None;
        slot.callbacks.on_close.take()
    }
}

#[async_trait]
impl ConnectionFactory for InMemoryServer {
    async fn connect(&self, info: &DatabaseInfo) -> Result<Arc<dyn Connection>, TransportError> {
        let mut state = self.state.lock();
        if let Some(err) = &state.connect_failure {
            return Err(err.clone());
        }
        state.connections.push(info.clone());
        Ok(Arc::new(InMemoryConnection {
            server: self.clone(),
        }))
    }
}

/// Connection to an [`InMemoryServer`].
pub struct InMemoryConnection {
    server: InMemoryServer,
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn open_stream(&self, operation: &str) -> Result<Box<dyn StreamHandle>, TransportError> {
        let mut state = self.server.state.lock();
        if let Some(err) = &state.open_stream_failure {
            return Err(err.clone());
        }
        state.streams.push(StreamSlot::new(operation));
        Ok(Box::new(InMemoryStreamHandle {
            server: self.server.clone(),
            index: state.streams.len() - 1,
        }))
    }
}

/// Client end of one in-memory stream.
pub struct InMemoryStreamHandle {
    server: InMemoryServer,
    index: usize,
}

impl StreamHandle for InMemoryStreamHandle {
    fn on_open(&mut self, callback: OpenCallback) {
        let auto_open = {
            let mut state = self.server.state.lock();
            let auto_open = state.auto_open;
            match state.streams.get_mut(self.index) {
                Some(slot) if !slot.closed => slot.callbacks.on_open = Some(callback),
                _ => return,
            }
            auto_open
        };
        if auto_open {
            self.server.accept(self.index);
        }
    }

    fn on_close(&mut self, callback: CloseCallback) {
        let rejection = {
            let mut state = self.server.state.lock();
            let rejection = state.reject_open.clone();
            match state.streams.get_mut(self.index) {
                Some(slot) if !slot.closed => slot.callbacks.on_close = Some(callback),
                _ => return,
            }
            rejection
        };
        if let Some(err) = rejection {
            self.server.close_stream(self.index, Some(err));
        }
    }

    fn on_message(&mut self, callback: MessageCallback) {
        let mut state = self.server.state.lock();
        if let Some(slot) = state.streams.get_mut(self.index) {
            if !slot.closed {
                slot.callbacks.on_message = Some(callback);
            }
        }
    }

    fn send(&mut self, request: &ListenRequest) -> Result<(), TransportError> {
        let frame = encode_request(request)?;
        let mut state = self.server.state.lock();
        let slot = state
            .streams
            .get_mut(self.index)
            .ok_or_else(|| TransportError::Unavailable("stream missing".to_string()))?;
        if slot.closed {
            return Err(TransportError::Unavailable("stream closed".to_string()));
        }
        slot.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        {
            let mut state = self.server.state.lock();
            if let Some(slot) = state.streams.get_mut(self.index) {
                slot.close_requests += 1;
            }
        }
        self.server.close_stream(self.index, None);
    }
}
