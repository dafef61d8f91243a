//! # Inbound Ports
//!
//! API trait defining what a watch stream can do.

use async_trait::async_trait;

use crate::application::DispatchOutcome;
use crate::domain::{ResumePoint, ResumeToken, StreamPhase, TargetId, TargetState, WatchError};
use crate::messages::{ListenResponse, TargetSelector};

/// Watch stream API - inbound port.
#[async_trait]
pub trait WatchStreamApi: Send {
    /// Open the channel and wait until the transport reports it open.
    ///
    /// Fails on a second call, after `close()`, or when the channel closes
    /// before opening.
    async fn open(&mut self) -> Result<(), WatchError>;

    /// Close the channel and wait for the transport to confirm.
    ///
    /// No-op once closed.
    async fn close(&mut self) -> Result<(), WatchError>;

    /// Register a target and send its `addTarget` frame.
    fn add_target(&mut self, target_id: TargetId, selector: TargetSelector)
        -> Result<(), WatchError>;

    /// Register a target that resumes from a saved token.
    fn add_target_with_resume(
        &mut self,
        target_id: TargetId,
        selector: TargetSelector,
        resume_token: ResumeToken,
    ) -> Result<(), WatchError>;

    /// Send `removeTarget` and drop the target's state.
    fn remove_target(&mut self, target_id: TargetId) -> Result<(), WatchError>;

    /// Dispatch one inbound frame.
    fn handle_message(&mut self, message: ListenResponse) -> Result<DispatchOutcome, WatchError>;

    /// Wait for the next inbound frame and dispatch it.
    ///
    /// Returns `None` once the transport has closed the channel cleanly.
    async fn process_next(&mut self) -> Result<Option<DispatchOutcome>, WatchError>;

    /// Dispatch frames until the channel closes. Returns the number dispatched.
    async fn run(&mut self) -> Result<u64, WatchError>;

    /// Current lifecycle phase.
    fn phase(&self) -> StreamPhase;

    /// State of a registered target.
    fn target(&self, target_id: TargetId) -> Option<&TargetState>;

    /// Saved positions of every registered target, ordered by id.
    fn resume_points(&self) -> Vec<ResumePoint>;
}
