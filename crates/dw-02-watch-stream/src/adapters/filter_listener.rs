//! Existence filter listener that forwards signals into a channel.

use dw_telemetry::log_target_event;
use tokio::sync::mpsc;

use crate::domain::ExistenceFilterSignal;
use crate::ports::ExistenceFilterListener;
use crate::SUBSYSTEM;

/// Forwards every signal to an unbounded channel.
#[derive(Clone)]
pub struct ChannelFilterListener {
    sender: mpsc::UnboundedSender<ExistenceFilterSignal>,
}

impl ChannelFilterListener {
    /// Create a listener and the receiver its signals arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExistenceFilterSignal>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ExistenceFilterListener for ChannelFilterListener {
    fn on_existence_filter(&self, signal: ExistenceFilterSignal) {
        let target_id = signal.target_id;
        if self.sender.send(signal).is_err() {
            log_target_event!(
                debug,
                SUBSYSTEM,
                "[dw-02] Filter signal dropped, receiver gone",
                target_id
            );
        }
    }
}
