//! Session lifecycle
//!
//! This module provides the `SessionController` state machine that manages:
//! - Microphone arming and the per-tick capture mixer while recording
//! - Event timestamping against the session clock
//! - Saving and loading sessions through a `SessionStore`
//! - Timeline replay synchronized with audio playback

mod config;
mod controller;
#[allow(clippy::module_inception)]
mod session;
mod stats;

pub use config::SessionConfig;
pub use controller::{SessionController, TickReport};
pub use session::{Session, SessionIdGenerator, SessionState};
pub use stats::SessionStats;
