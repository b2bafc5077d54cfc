//! Control plane
//!
//! Action-based facade over the key registry, recipient partitioner, message
//! classifier and handshake controller. The application owns the transport,
//! the dialogs and the crypto primitives; this crate decides what to do with
//! them.
//!
//! # Architecture
//!
//! The control plane follows the Sans-IO and Action-Based patterns of
//! [`latchkey_core`]. It receives events ([`ControlEvent`]), processes them
//! through the core components, and returns actions ([`ControlAction`]) for
//! the caller to execute: show a message, present a send plan, dispatch a
//! group of recipients in a given mode.
//!
//! # Components
//!
//! - [`ControlPlane`]: top-level state machine
//! - [`ControlConfig`]: classifier settings and memory bounds
//! - [`ControlEvent`]: events fed into the control plane
//! - [`ControlAction`]: actions produced by the control plane

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod control;
mod error;
mod event;

pub use control::{ControlConfig, ControlPlane, DEFAULT_MAX_CACHED, DEFAULT_MAX_PENDING};
pub use error::ClientError;
pub use event::{ControlAction, ControlEvent, DeliveryMode};
pub use latchkey_core::{Environment, SystemEnv};
