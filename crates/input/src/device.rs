use serde::{Deserialize, Serialize};

/// Hardware slot a tracked object (controller, tracker) is reported on.
///
/// The runtime may move a device to a different slot at any time, e.g.
/// after a power cycle or re-pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackedIndex(pub u32);

impl std::fmt::Display for TrackedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live handle to a physical device, valid until the device disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceHandle(pub u64);

/// Changes in the index-to-device binding, published by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceEvent {
    Connected {
        index: TrackedIndex,
        device: DeviceHandle,
    },
    Disconnected {
        index: TrackedIndex,
        device: DeviceHandle,
    },
    Reindexed {
        device: DeviceHandle,
        from: TrackedIndex,
        to: TrackedIndex,
    },
}

impl DeviceEvent {
    /// Whether a cached binding for `index` may be stale after this event.
    pub fn affects(&self, index: TrackedIndex) -> bool {
        match *self {
            Self::Connected { index: i, .. } | Self::Disconnected { index: i, .. } => i == index,
            Self::Reindexed { from, to, .. } => from == index || to == index,
        }
    }
}

/// Errors from device resolution and haptic output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("no device assigned to tracked index {0}")]
    Unassigned(TrackedIndex),
    #[error("device {0:?} is disconnected")]
    Disconnected(DeviceHandle),
}

/// Hardware seam: resolves tracked indices and drives haptic actuators.
///
/// Implemented by a real VR runtime binding or by [`crate::SimulatedDevices`].
pub trait HapticDevices {
    /// Resolve the device currently bound to `index`.
    fn resolve(&self, index: TrackedIndex) -> Result<DeviceHandle, InputError>;

    /// Fire a single haptic pulse. `strength` is in microseconds of actuator
    /// drive, 0..=3999.
    fn trigger_pulse(&mut self, device: DeviceHandle, strength: u16) -> Result<(), InputError>;
}
