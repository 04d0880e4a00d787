// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Frame lifecycle with typed state transitions.
//!
//! Allocated → Written → Published → Opened → Validated → Mapped →
//! Consumed → Released. Any non-terminal state may drop to Failed.
//! Released and Failed are terminal.

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;

/// Frame lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameState {
    /// Handle generated, nothing on disk yet.
    Allocated,
    /// Header and payload are on disk.
    Written,
    /// Writer is done; the handle may be handed to the consumer.
    Published,
    /// Consumer holds an open descriptor.
    Opened,
    /// Size, magic and type tag checked.
    Validated,
    /// Payload is mapped into the consumer.
    Mapped,
    /// Payload has been copied out or otherwise used.
    Consumed,
    /// Mapping gone and file removed.
    Released,
    /// An operation failed; the file has been removed.
    Failed,
}

impl FrameState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Allocated => "Allocated",
            Self::Written => "Written",
            Self::Published => "Published",
            Self::Opened => "Opened",
            Self::Validated => "Validated",
            Self::Mapped => "Mapped",
            Self::Consumed => "Consumed",
            Self::Released => "Released",
            Self::Failed => "Failed",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Failed)
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: FrameState) -> bool {
        if target == Self::Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, target),
            (Self::Allocated, Self::Written)
                | (Self::Written, Self::Published)
                | (Self::Published, Self::Opened)
                | (Self::Opened, Self::Validated)
                | (Self::Validated, Self::Mapped)
                | (Self::Mapped, Self::Consumed)
                | (Self::Mapped, Self::Released)
                | (Self::Consumed, Self::Released)
        )
    }
}

impl std::fmt::Display for FrameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tracks one frame's progress through its lifecycle.
#[derive(Debug)]
pub struct FrameLifecycle {
    handle: String,
    current_state: FrameState,
    transition_count: u64,
}

impl FrameLifecycle {
    /// Lifecycle of a frame about to be written.
    pub fn new(handle: impl std::fmt::Display) -> Self {
        Self::starting_at(handle, FrameState::Allocated)
    }

    /// Lifecycle of a frame received over the control channel.
    pub fn published(handle: impl std::fmt::Display) -> Self {
        Self::starting_at(handle, FrameState::Published)
    }

    pub(crate) fn starting_at(handle: impl std::fmt::Display, state: FrameState) -> Self {
        Self {
            handle: handle.to_string(),
            current_state: state,
            transition_count: 0,
        }
    }

    pub fn state(&self) -> FrameState {
        self.current_state
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: FrameState) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                handle: self.handle.clone(),
                state: self.current_state.name(),
            });
        }

        if !self.current_state.can_transition_to(target) {
            return Err(StateTransitionError::InvalidTransition {
                handle: self.handle.clone(),
                from: self.current_state.name(),
                to: target.name(),
            });
        }

        tracing::trace!(
            handle = %self.handle,
            from = self.current_state.name(),
            to = target.name(),
            "Frame state transition"
        );

        self.current_state = target;
        self.transition_count += 1;

        Ok(())
    }

    /// Transition driven by this crate's own operations, whose order is fixed.
    pub(crate) fn advance(&mut self, target: FrameState) {
        if let Err(e) = self.transition_to(target) {
            tracing::error!(error = %e, "Frame lifecycle out of order");
        }
    }

    /// Record a failure unless the frame already reached a terminal state.
    pub(crate) fn fail(&mut self) {
        if !self.current_state.is_terminal() {
            self.advance(FrameState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_path() {
        let mut lc = FrameLifecycle::new("/dev/shm/a");
        assert_eq!(lc.state(), FrameState::Allocated);

        lc.transition_to(FrameState::Written).unwrap();
        lc.transition_to(FrameState::Published).unwrap();
        assert_eq!(lc.state(), FrameState::Published);
        assert_eq!(lc.transition_count(), 2);
    }

    #[test]
    fn test_reader_path() {
        let mut lc = FrameLifecycle::published("/dev/shm/a");
        for state in [
            FrameState::Opened,
            FrameState::Validated,
            FrameState::Mapped,
            FrameState::Consumed,
            FrameState::Released,
        ] {
            lc.transition_to(state).unwrap();
        }
        assert!(lc.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut lc = FrameLifecycle::new("/dev/shm/a");

        // Cannot map a frame that was never written
        assert!(lc.transition_to(FrameState::Mapped).is_err());
        assert_eq!(lc.state(), FrameState::Allocated);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut lc = FrameLifecycle::published("/dev/shm/a");
        lc.transition_to(FrameState::Failed).unwrap();

        let err = lc.transition_to(FrameState::Opened).unwrap_err();
        assert!(matches!(err, StateTransitionError::TerminalState { .. }));
        assert!(lc.transition_to(FrameState::Failed).is_err());
    }

    #[test]
    fn test_released_frame_cannot_fail() {
        assert!(!FrameState::Released.can_transition_to(FrameState::Failed));
        assert!(FrameState::Mapped.can_transition_to(FrameState::Failed));
    }
}
