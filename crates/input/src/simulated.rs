use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::device::{DeviceEvent, DeviceHandle, HapticDevices, InputError, TrackedIndex};

/// One pulse delivered to a simulated actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRecord {
    pub device: DeviceHandle,
    pub strength: u16,
    /// Simulated clock at the moment the pulse fired.
    pub at: Duration,
}

/// In-process stand-in for a VR runtime.
///
/// Tracks index-to-device bindings, publishes [`DeviceEvent`]s for every
/// change, and records haptic pulses against a caller-driven clock.
#[derive(Debug, Default)]
pub struct SimulatedDevices {
    bindings: BTreeMap<TrackedIndex, DeviceHandle>,
    connected: BTreeSet<DeviceHandle>,
    next_device: u64,
    now: Duration,
    pulses: Vec<PulseRecord>,
    events: Vec<DeviceEvent>,
    lookups: Cell<u64>,
}

impl SimulatedDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a freshly connected device to `index`. Any device already on
    /// that index is disconnected first.
    pub fn connect(&mut self, index: TrackedIndex) -> DeviceHandle {
        if self.bindings.contains_key(&index) {
            self.disconnect(index);
        }
        let device = DeviceHandle(self.next_device);
        self.next_device += 1;
        self.bindings.insert(index, device);
        self.connected.insert(device);
        tracing::debug!(%index, ?device, "device connected");
        self.events.push(DeviceEvent::Connected { index, device });
        device
    }

    pub fn disconnect(&mut self, index: TrackedIndex) -> Option<DeviceHandle> {
        let device = self.bindings.remove(&index)?;
        self.connected.remove(&device);
        tracing::debug!(%index, ?device, "device disconnected");
        self.events
            .push(DeviceEvent::Disconnected { index, device });
        Some(device)
    }

    /// Move whatever device sits on `from` to `to`.
    pub fn reindex(&mut self, from: TrackedIndex, to: TrackedIndex) -> Result<(), InputError> {
        let device = self
            .bindings
            .remove(&from)
            .ok_or(InputError::Unassigned(from))?;
        if let Some(displaced) = self.bindings.insert(to, device) {
            self.connected.remove(&displaced);
            self.events.push(DeviceEvent::Disconnected {
                index: to,
                device: displaced,
            });
        }
        tracing::debug!(%from, %to, ?device, "device reindexed");
        self.events
            .push(DeviceEvent::Reindexed { device, from, to });
        Ok(())
    }

    /// Advance the simulated clock used to timestamp pulses.
    pub fn advance_to(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Every pulse fired so far, in order.
    pub fn pulses(&self) -> &[PulseRecord] {
        &self.pulses
    }

    pub fn clear_pulses(&mut self) {
        self.pulses.clear();
    }

    /// Drain and return pending device events.
    pub fn drain_events(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of `resolve` calls served so far.
    pub fn lookups(&self) -> u64 {
        self.lookups.get()
    }
}

impl HapticDevices for SimulatedDevices {
    fn resolve(&self, index: TrackedIndex) -> Result<DeviceHandle, InputError> {
        self.lookups.set(self.lookups.get() + 1);
        self.bindings
            .get(&index)
            .copied()
            .ok_or(InputError::Unassigned(index))
    }

    fn trigger_pulse(&mut self, device: DeviceHandle, strength: u16) -> Result<(), InputError> {
        if !self.connected.contains(&device) {
            return Err(InputError::Disconnected(device));
        }
        tracing::trace!(?device, strength, at = ?self.now, "haptic pulse");
        self.pulses.push(PulseRecord {
            device,
            strength,
            at: self.now,
        });
        Ok(())
    }
}
