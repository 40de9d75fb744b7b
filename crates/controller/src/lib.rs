//! Controller Actions: visual and haptic behaviour of a single VR controller.
//!
//! One [`ControllerActions`] is attached per controller. It toggles the
//! model's visibility, fades it, tints named sub-elements, and drives single
//! and timed haptic pulses. Higher-level grab, pointer and menu logic call
//! into it.
//!
//! # Invariants
//! - An element holds at most one saved material; a second highlight keeps
//!   the first snapshot.
//! - Pulse strength never exceeds the configured maximum.
//! - Timed pulses never block: they advance only when the host calls `tick`.
//! - The device handle is cached and only re-resolved after a device event,
//!   a tracked-index change, or a failed pulse.

mod actions;
pub mod config;
mod error;
mod highlight;
mod pulse;

pub use actions::{ControllerActions, ControllerState};
pub use config::{ConfigError, ControllerConfig, ElementPaths, MAX_HAPTIC_STRENGTH, PulseOverlap};
pub use error::ControllerError;
pub use highlight::{HighlightState, HighlightTable};
pub use pulse::{PulseHandle, PulseScheduler, PulseSequence};

pub fn crate_info() -> &'static str {
    "vrctl-controller v0.1.0"
}
