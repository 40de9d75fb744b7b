//! Tracked VR devices and haptic output.
//!
//! # Invariants
//! - A tracked index maps to at most one connected device.
//! - Every binding change is published as a [`DeviceEvent`].

mod device;
mod simulated;

pub use device::{DeviceEvent, DeviceHandle, HapticDevices, InputError, TrackedIndex};
pub use simulated::{PulseRecord, SimulatedDevices};

pub fn crate_info() -> &'static str {
    "vrctl-input v0.1.0"
}
