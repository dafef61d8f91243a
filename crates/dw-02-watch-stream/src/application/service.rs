//! # Watch Stream Service
//!
//! Owns the listen channel, the target registry and the dispatch loop.
//!
//! ## Lifecycle
//!
//! ```text
//! Unopened --open()--> Open --close()--> Closed
//!     |                  |
//!     +----close()-------+----(open failed)--> Closed
//! ```
//!
//! Inbound frames are queued by the transport callbacks and dispatched one at
//! a time by [`WatchStreamApi::process_next`], in arrival order. A protocol
//! violation aborts the instance: dispatch and target registration are
//! refused from then on, while `resume_points()` stays readable until
//! `close()` so the caller can rebuild.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dw_telemetry::{log_event, log_target_event};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::completion::Completion;
use super::outcome::DispatchOutcome;
use crate::config::WatchStreamConfig;
use crate::domain::{
    evaluate_existence_filter, DatabaseId, DocumentEventKind, FilterVerdict, LifecycleError,
    ProtocolError, ResumePoint, ResumeToken, StreamPhase, TargetId, TargetState, TransportError,
    WatchError, LISTEN_OPERATION,
};
use crate::messages::{ExistenceFilter, ListenRequest, ListenResponse, TargetChange, TargetSelector};
use crate::metrics::{MetricsSnapshot, WatchMetrics};
use crate::ports::{
    ConnectionFactory, DocumentCache, ExistenceFilterListener, StreamHandle, WatchStreamApi,
};
use crate::SUBSYSTEM;

/// Item on the inbound queue fed by the transport callbacks.
enum InboundFrame {
    Message(ListenResponse),
    Closed(Option<TransportError>),
}

type CloseSignal = oneshot::Receiver<Result<(), TransportError>>;

/// How the open wait ended.
enum OpenWait {
    Opened,
    OpenDropped,
    Closed(Result<Result<(), TransportError>, oneshot::error::RecvError>),
}

/// Watch Stream - one listen channel and the targets registered on it.
pub struct WatchStream {
    /// Correlation ID carried on every log line.
    stream_id: Uuid,
    /// Configuration.
    config: WatchStreamConfig,
    /// Database the targets live in.
    database: DatabaseId,
    /// Transport factory.
    factory: Arc<dyn ConnectionFactory>,
    /// Receives document events.
    cache: Arc<dyn DocumentCache>,
    /// Receives existence filter results.
    listener: Arc<dyn ExistenceFilterListener>,
    /// Lifecycle phase.
    phase: StreamPhase,
    /// The channel, present from open until close.
    handle: Option<Box<dyn StreamHandle>>,
    /// Inbound frames in arrival order.
    inbound: Option<mpsc::UnboundedReceiver<InboundFrame>>,
    /// Resolves when the transport reports the channel closed.
    close_signal: Option<CloseSignal>,
    /// The transport closed the channel and the queue is drained.
    remote_closed: bool,
    /// A transport error was already returned from dispatch.
    close_error_reported: bool,
    /// Registered targets.
    targets: HashMap<TargetId, TargetState>,
    /// First protocol violation; set once, never cleared.
    failure: Option<ProtocolError>,
    /// Counters.
    metrics: Arc<WatchMetrics>,
}

impl WatchStream {
    /// Create an unopened stream.
    pub fn new(
        config: WatchStreamConfig,
        factory: Arc<dyn ConnectionFactory>,
        cache: Arc<dyn DocumentCache>,
        listener: Arc<dyn ExistenceFilterListener>,
    ) -> Self {
        let database = config.database();
        Self {
            stream_id: Uuid::new_v4(),
            config,
            database,
            factory,
            cache,
            listener,
            phase: StreamPhase::Unopened,
            handle: None,
            inbound: None,
            close_signal: None,
            remote_closed: false,
            close_error_reported: false,
            targets: HashMap::new(),
            failure: None,
            metrics: Arc::new(WatchMetrics::new()),
        }
    }

    /// Correlation ID of this stream.
    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    /// Database the stream addresses.
    pub fn database(&self) -> &DatabaseId {
        &self.database
    }

    /// The protocol violation that aborted the stream, if any.
    pub fn failure(&self) -> Option<&ProtocolError> {
        self.failure.as_ref()
    }

    /// Number of registered targets.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Current counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stream must be open and not aborted.
    fn ensure_active(&self) -> Result<(), LifecycleError> {
        match self.phase {
            StreamPhase::Unopened => return Err(LifecycleError::NotOpen),
            StreamPhase::Closed => return Err(LifecycleError::Closed),
            StreamPhase::Open => {}
        }
        if let Some(failure) = &self.failure {
            return Err(LifecycleError::Aborted(failure.to_string()));
        }
        Ok(())
    }

    fn send(&mut self, request: &ListenRequest) -> Result<(), WatchError> {
        let handle = self.handle.as_mut().ok_or(LifecycleError::NotOpen)?;
        handle.send(request)?;
        self.metrics.record_request_sent();
        Ok(())
    }

    fn register_target(
        &mut self,
        target_id: TargetId,
        selector: TargetSelector,
        resume_token: Option<ResumeToken>,
    ) -> Result<(), WatchError> {
        self.ensure_active()?;
        if self.targets.contains_key(&target_id) {
            return Err(LifecycleError::DuplicateTarget { target_id }.into());
        }

        let resumed = resume_token.is_some();
        let request =
            ListenRequest::add_target(&self.database, target_id, &selector, resume_token.clone());
        self.send(&request)?;
        self.targets.insert(
            target_id,
            TargetState::with_resume_token(target_id, resume_token),
        );

        log_target_event!(
            debug,
            SUBSYSTEM,
            "[dw-02] Target registered",
            target_id,
            stream_id = %self.stream_id,
            resumed
        );
        Ok(())
    }

    /// Abandon a failed open: release the channel and close the stream.
    fn abandon_open(&mut self, err: TransportError) -> WatchError {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.inbound = None;
        self.phase = StreamPhase::Closed;
        log_event!(
            warn,
            SUBSYSTEM,
            "[dw-02] Listen stream failed to open",
            stream_id = %self.stream_id,
            error = %err
        );
        err.into()
    }

    fn on_target_change(&mut self, change: TargetChange) -> Result<DispatchOutcome, WatchError> {
        match self.apply_target_change(&change) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.metrics.record_protocol_error();
                log_event!(
                    error,
                    SUBSYSTEM,
                    "[dw-02] Protocol violation, aborting stream",
                    stream_id = %self.stream_id,
                    error = %err,
                    target_ids = ?change.target_ids
                );
                self.failure = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Apply a target change to every affected target, or to none.
    fn apply_target_change(&mut self, change: &TargetChange) -> Result<DispatchOutcome, ProtocolError> {
        let change_type = change.change_type()?;

        let target_ids: Vec<TargetId> = if change.is_broadcast() {
            let mut ids: Vec<TargetId> = self.targets.keys().copied().collect();
            ids.sort_unstable();
            ids
        } else {
            change.target_ids.clone()
        };

        // Stage on copies so a failure leaves every target untouched.
        let mut staged: HashMap<TargetId, TargetState> = HashMap::new();
        for &target_id in &target_ids {
            let state = match staged.entry(target_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let state = self
                        .targets
                        .get(&target_id)
                        .cloned()
                        .ok_or(ProtocolError::UnknownTarget { target_id })?;
                    entry.insert(state)
                }
            };
            state.apply(change_type, change.resume_token.as_ref())?;
        }
        self.targets.extend(staged);
        self.metrics.record_transitions(target_ids.len());

        if let Some(cause) = &change.cause {
            log_event!(
                warn,
                SUBSYSTEM,
                "[dw-02] Targets removed by server",
                stream_id = %self.stream_id,
                target_ids = ?target_ids,
                code = cause.code,
                message = %cause.message
            );
        } else {
            log_event!(
                debug,
                SUBSYSTEM,
                "[dw-02] Target change applied",
                stream_id = %self.stream_id,
                change = %change_type,
                targets = target_ids.len()
            );
        }

        Ok(DispatchOutcome::TargetsChanged {
            change: change_type,
            target_ids,
            cause: change.cause.clone(),
        })
    }

    fn forwarded(&self, kind: DocumentEventKind, name: String) -> DispatchOutcome {
        self.metrics.record_document(kind);
        DispatchOutcome::DocumentForwarded { kind, name }
    }

    fn on_existence_filter(&self, filter: ExistenceFilter) -> DispatchOutcome {
        let target_id = filter.target_id;
        if !self.targets.contains_key(&target_id) {
            self.metrics.record_filter(FilterVerdict::Skipped);
            log_target_event!(
                debug,
                SUBSYSTEM,
                "[dw-02] Existence filter for unknown target ignored",
                target_id,
                stream_id = %self.stream_id
            );
            return DispatchOutcome::ExistenceFilterIgnored { target_id };
        }

        let local_names = self.cache.target_document_names(target_id);
        let outcome = evaluate_existence_filter(
            target_id,
            filter.count,
            filter.unchanged_names.as_ref(),
            &local_names,
        );
        self.metrics.record_filter(outcome.verdict);

        if let Some(err) = &outcome.bloom_error {
            log_target_event!(
                warn,
                SUBSYSTEM,
                "[dw-02] Invalid bloom filter in existence filter",
                target_id,
                stream_id = %self.stream_id,
                error = %err
            );
        }
        if outcome.is_mismatch() {
            log_target_event!(
                info,
                SUBSYSTEM,
                "[dw-02] Existence filter mismatch",
                target_id,
                stream_id = %self.stream_id,
                expected = outcome.expected_count,
                local = outcome.local_count,
                removed = outcome.removed_keys.len()
            );
        }

        if let Some(signal) = outcome.signal() {
            self.listener.on_existence_filter(signal);
        }
        DispatchOutcome::ExistenceFilterEvaluated(outcome)
    }
}

#[async_trait]
impl WatchStreamApi for WatchStream {
    async fn open(&mut self) -> Result<(), WatchError> {
        match self.phase {
            StreamPhase::Closed => return Err(LifecycleError::Closed.into()),
            StreamPhase::Open => return Err(LifecycleError::AlreadyOpen.into()),
            StreamPhase::Unopened if self.handle.is_some() => {
                return Err(LifecycleError::AlreadyOpen.into())
            }
            StreamPhase::Unopened => {}
        }

        let info = self.config.database_info();
        let connection = match self.factory.connect(&info).await {
            Ok(connection) => connection,
            Err(err) => return Err(self.abandon_open(err)),
        };
        let mut handle = match connection.open_stream(LISTEN_OPERATION).await {
            Ok(handle) => handle,
            Err(err) => return Err(self.abandon_open(err)),
        };

        let (open_completion, open_rx) = Completion::new();
        let (close_completion, mut close_rx) = Completion::new();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();

        let close_frames = frames_tx.clone();
        let message_metrics = Arc::clone(&self.metrics);
        let warn_depth = self.config.inbound_buffer_warn;
        let stream_id = self.stream_id;

        handle.on_message(Box::new(move |message| {
            let depth = message_metrics.frame_queued();
            if depth == warn_depth {
                log_event!(
                    warn,
                    SUBSYSTEM,
                    "[dw-02] Inbound queue is backing up",
                    %stream_id,
                    depth
                );
            }
            if frames_tx.send(InboundFrame::Message(message)).is_err() {
                message_metrics.frame_dequeued();
            }
        }));
        handle.on_close(Box::new(move |error| {
            let _ = close_frames.send(InboundFrame::Closed(error.clone()));
            close_completion.resolve(match error {
                Some(err) => Err(err),
                None => Ok(()),
            });
        }));
        handle.on_open(Box::new(move || {
            open_completion.resolve(());
        }));

        self.handle = Some(handle);
        self.inbound = Some(frames_rx);

        let waited = tokio::select! {
            biased;
            opened = open_rx => match opened {
                Ok(()) => OpenWait::Opened,
                Err(_) => OpenWait::OpenDropped,
            },
            closed = &mut close_rx => OpenWait::Closed(closed),
        };

        let reason = match waited {
            OpenWait::Opened => {
                self.phase = StreamPhase::Open;
                self.close_signal = Some(close_rx);
                log_event!(
                    info,
                    SUBSYSTEM,
                    "[dw-02] Listen stream opened",
                    stream_id = %self.stream_id,
                    database = %self.database.database_path(),
                    host = %info.host
                );
                return Ok(());
            }
            OpenWait::OpenDropped => match close_rx.try_recv() {
                Ok(Err(err)) => err,
                Ok(Ok(())) => TransportError::ClosedBeforeOpen,
                Err(_) => TransportError::Dropped,
            },
            OpenWait::Closed(Ok(Err(err))) => err,
            OpenWait::Closed(Ok(Ok(()))) => TransportError::ClosedBeforeOpen,
            OpenWait::Closed(Err(_)) => TransportError::Dropped,
        };
        Err(self.abandon_open(reason))
    }

    async fn close(&mut self) -> Result<(), WatchError> {
        if self.phase == StreamPhase::Closed {
            return Ok(());
        }
        self.phase = StreamPhase::Closed;
        self.targets.clear();

        let Some(mut handle) = self.handle.take() else {
            log_event!(debug, SUBSYSTEM, "[dw-02] Closed before open", stream_id = %self.stream_id);
            return Ok(());
        };
        handle.close();

        let result = match self.close_signal.take() {
            Some(signal) => signal.await.unwrap_or(Err(TransportError::Dropped)),
            None => Ok(()),
        };
        self.inbound = None;
        drop(handle);

        log_event!(info, SUBSYSTEM, "[dw-02] Listen stream closed", stream_id = %self.stream_id);
        match result {
            Err(_) if self.close_error_reported => Ok(()),
            other => other.map_err(WatchError::from),
        }
    }

    fn add_target(
        &mut self,
        target_id: TargetId,
        selector: TargetSelector,
    ) -> Result<(), WatchError> {
        self.register_target(target_id, selector, None)
    }

    fn add_target_with_resume(
        &mut self,
        target_id: TargetId,
        selector: TargetSelector,
        resume_token: ResumeToken,
    ) -> Result<(), WatchError> {
        self.register_target(target_id, selector, Some(resume_token))
    }

    fn remove_target(&mut self, target_id: TargetId) -> Result<(), WatchError> {
        self.ensure_active()?;
        if !self.targets.contains_key(&target_id) {
            return Err(LifecycleError::UnknownTarget { target_id }.into());
        }
        self.send(&ListenRequest::remove_target(target_id))?;
        self.targets.remove(&target_id);

        log_target_event!(
            debug,
            SUBSYSTEM,
            "[dw-02] Target removed",
            target_id,
            stream_id = %self.stream_id
        );
        Ok(())
    }

    fn handle_message(&mut self, message: ListenResponse) -> Result<DispatchOutcome, WatchError> {
        self.ensure_active()?;
        self.metrics.record_message();

        match message {
            ListenResponse::TargetChange(change) => self.on_target_change(change),
            ListenResponse::DocumentChange(change) => {
                self.cache.on_document_change(&change);
                Ok(self.forwarded(DocumentEventKind::Change, change.document.name))
            }
            ListenResponse::DocumentDelete(delete) => {
                self.cache.on_document_delete(&delete);
                Ok(self.forwarded(DocumentEventKind::Delete, delete.document))
            }
            ListenResponse::DocumentRemove(remove) => {
                self.cache.on_document_remove(&remove);
                Ok(self.forwarded(DocumentEventKind::Remove, remove.document))
            }
            ListenResponse::ExistenceFilter(filter) => Ok(self.on_existence_filter(filter)),
        }
    }

    async fn process_next(&mut self) -> Result<Option<DispatchOutcome>, WatchError> {
        self.ensure_active()?;
        if self.remote_closed {
            return Ok(None);
        }

        let frame = match self.inbound.as_mut() {
            Some(frames) => frames.recv().await,
            None => None,
        };

        match frame {
            Some(InboundFrame::Message(message)) => {
                self.metrics.frame_dequeued();
                self.handle_message(message).map(Some)
            }
            Some(InboundFrame::Closed(None)) | None => {
                self.remote_closed = true;
                log_event!(
                    info,
                    SUBSYSTEM,
                    "[dw-02] Listen stream ended by server",
                    stream_id = %self.stream_id
                );
                Ok(None)
            }
            Some(InboundFrame::Closed(Some(err))) => {
                self.remote_closed = true;
                self.close_error_reported = true;
                log_event!(
                    warn,
                    SUBSYSTEM,
                    "[dw-02] Listen stream failed",
                    stream_id = %self.stream_id,
                    error = %err
                );
                Err(err.into())
            }
        }
    }

    async fn run(&mut self) -> Result<u64, WatchError> {
        let mut dispatched = 0;
        while self.process_next().await?.is_some() {
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn phase(&self) -> StreamPhase {
        self.phase
    }

    fn target(&self, target_id: TargetId) -> Option<&TargetState> {
        self.targets.get(&target_id)
    }

    fn resume_points(&self) -> Vec<ResumePoint> {
        let mut points: Vec<ResumePoint> = self
            .targets
            .values()
            .map(|state| ResumePoint {
                target_id: state.target_id(),
                resume_token: state.resume_token().cloned(),
            })
            .collect();
        points.sort_by_key(|point| point.target_id);
        points
    }
}
