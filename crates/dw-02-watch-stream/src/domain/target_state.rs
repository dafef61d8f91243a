//! # Target State
//!
//! Per-target lifecycle driven by server target changes.
//!
//! ```text
//! NotAdded --ADD--> Added(not current) --CURRENT--> Added(current)
//!    ^                 |      ^                        |
//!    +-----REMOVE------+      +---------RESET----------+
//! ```
//!
//! Every transition has a guard. A failed guard means the server and client
//! disagree on the target's state and is reported, never absorbed.

use super::errors::TargetStateError;
use super::value_objects::{ResumeToken, TargetChangeType, TargetId};

/// Tracked state of a single watch target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetState {
    target_id: TargetId,
    added: bool,
    current: bool,
    resume_token: Option<ResumeToken>,
}

impl TargetState {
    /// Fresh state for a locally registered target, before any acknowledgment.
    pub fn new(target_id: TargetId) -> Self {
        Self {
            target_id,
            added: false,
            current: false,
            resume_token: None,
        }
    }

    /// Fresh state that remembers a token from a previous stream.
    pub fn with_resume_token(target_id: TargetId, resume_token: Option<ResumeToken>) -> Self {
        Self {
            resume_token,
            ..Self::new(target_id)
        }
    }

    /// The server acknowledged the target.
    pub fn on_added(&mut self) -> Result<(), TargetStateError> {
        if self.added {
            return Err(TargetStateError::AlreadyAdded {
                target_id: self.target_id,
            });
        }
        self.added = true;
        self.current = false;
        Ok(())
    }

    /// The server stopped tracking the target.
    pub fn on_removed(&mut self) -> Result<(), TargetStateError> {
        self.require_added(TargetChangeType::Remove)?;
        self.added = false;
        self.current = false;
        Ok(())
    }

    /// The target reached a consistent snapshot.
    pub fn on_current(&mut self) -> Result<(), TargetStateError> {
        self.require_added(TargetChangeType::Current)?;
        self.current = true;
        Ok(())
    }

    /// The target's snapshot is no longer consistent.
    pub fn on_reset(&mut self) -> Result<(), TargetStateError> {
        self.require_added(TargetChangeType::Reset)?;
        self.current = false;
        Ok(())
    }

    /// Nothing changed; record the new stream position when one is given.
    pub fn on_no_change(&mut self, token: Option<&ResumeToken>) -> Result<(), TargetStateError> {
        self.require_added(TargetChangeType::NoChange)?;
        if !self.current {
            return Err(TargetStateError::NotCurrent {
                target_id: self.target_id,
            });
        }
        if let Some(token) = token {
            self.resume_token = Some(token.clone());
        }
        Ok(())
    }

    /// Apply the transition for a server change type.
    pub fn apply(
        &mut self,
        change: TargetChangeType,
        token: Option<&ResumeToken>,
    ) -> Result<(), TargetStateError> {
        match change {
            TargetChangeType::Add => self.on_added(),
            TargetChangeType::Remove => self.on_removed(),
            TargetChangeType::Current => self.on_current(),
            TargetChangeType::Reset => self.on_reset(),
            TargetChangeType::NoChange => self.on_no_change(token),
        }
    }

    fn require_added(&self, event: TargetChangeType) -> Result<(), TargetStateError> {
        if !self.added {
            return Err(TargetStateError::NotAdded {
                target_id: self.target_id,
                event: event.as_str(),
            });
        }
        Ok(())
    }

    /// Target identifier.
    pub fn target_id(&self) -> TargetId {
        self.target_id
    }

    /// Whether the server acknowledged the target.
    pub fn is_added(&self) -> bool {
        self.added
    }

    /// Whether the target has a consistent snapshot baseline.
    pub fn is_current(&self) -> bool {
        self.current
    }

    /// Last token the server confirmed for this target.
    pub fn resume_token(&self) -> Option<&ResumeToken> {
        self.resume_token.as_ref()
    }
}
