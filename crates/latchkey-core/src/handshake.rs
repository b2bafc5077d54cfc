//! Authentication handshake state machine.
//!
//! One handshake exists per controller, shared by every clone of the handle.
//! Starting it is a compare-and-swap, so concurrent callers observing an
//! encrypted message cannot both start it.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  try_begin  ┌────────────────┐  complete  ┌───────────────┐
//! │ Idle │────────────>│ Authenticating │───────────>│ Authenticated │
//! └──────┘             └────────────────┘            └───────────────┘
//!     ^                        │
//!     └────────────────────────┘
//!              abandon
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU8, Ordering},
};

use crate::error::HandshakeError;

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// No handshake in progress
    Idle,
    /// Handshake started, waiting for the crypto capability
    Authenticating,
    /// Handshake completed (terminal)
    Authenticated,
}

impl HandshakeState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Authenticating => 1,
            Self::Authenticated => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Authenticating,
            2 => Self::Authenticated,
            _ => Self::Idle,
        }
    }
}

/// Cloneable handle to the shared handshake state and the intent flag.
///
/// Intent is the user's "encrypt outgoing replies when needed" preference. It
/// arms exactly one handshake start and is consumed by it.
#[derive(Debug, Clone, Default)]
pub struct HandshakeController {
    state: Arc<AtomicU8>,
    intent: Arc<AtomicBool>,
}

impl HandshakeController {
    /// Create a controller in [`HandshakeState::Idle`] without intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        HandshakeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once the handshake has completed.
    pub fn is_authenticated(&self) -> bool {
        self.state() == HandshakeState::Authenticated
    }

    /// True while a handshake is in flight.
    pub fn is_authenticating(&self) -> bool {
        self.state() == HandshakeState::Authenticating
    }

    /// Arm or disarm the next handshake start.
    pub fn set_intent(&self, intent: bool) {
        self.intent.store(intent, Ordering::Release);
        tracing::debug!(intent, "handshake intent updated");
    }

    /// Whether a handshake start is armed.
    pub fn intent(&self) -> bool {
        self.intent.load(Ordering::Acquire)
    }

    /// Try to move `Idle -> Authenticating`.
    ///
    /// Returns true for exactly one caller per transition: intent must be set
    /// and the state must still be `Idle` at the moment of the swap. The
    /// winner is responsible for calling `start_authentication` on the crypto
    /// capability.
    ///
    /// The intent is consumed before the swap, so an intent set while the
    /// handshake runs is kept for the next attempt. If the swap loses, the
    /// consumed intent is handed back.
    pub fn try_begin(&self) -> bool {
        if self.intent.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return false;
        }

        let swapped = self
            .state
            .compare_exchange(
                HandshakeState::Idle.as_u8(),
                HandshakeState::Authenticating.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if swapped {
            tracing::debug!("handshake started");
        } else {
            let _ = self.intent.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
        }

        swapped
    }

    /// Move `Authenticating -> Authenticated`.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::InvalidTransition` if no handshake is in flight
    pub fn complete(&self) -> Result<(), HandshakeError> {
        self.transition(HandshakeState::Authenticating, HandshakeState::Authenticated)?;
        tracing::debug!("handshake completed");
        Ok(())
    }

    /// Move `Authenticating -> Idle` after a failed handshake.
    ///
    /// # Errors
    ///
    /// - `HandshakeError::InvalidTransition` if no handshake is in flight
    pub fn abandon(&self) -> Result<(), HandshakeError> {
        self.transition(HandshakeState::Authenticating, HandshakeState::Idle)?;
        tracing::debug!("handshake abandoned");
        Ok(())
    }

    fn transition(&self, from: HandshakeState, to: HandshakeState) -> Result<(), HandshakeError> {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| HandshakeError::InvalidTransition {
                from: HandshakeState::from_u8(actual),
                to,
            })
    }
}
