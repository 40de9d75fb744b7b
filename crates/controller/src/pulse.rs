use std::fmt::Display;
use std::time::Duration;

/// Decremented remainders at or below this many seconds count as spent.
const COUNTDOWN_EPSILON: f64 = 1e-6;

/// Handle to a running pulse sequence, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PulseHandle(u64);

/// A repeating haptic pulse: fire, wait `interval`, subtract `interval` from
/// the remaining duration, fire again while any duration is left.
#[derive(Debug, Clone)]
pub struct PulseSequence {
    pub handle: PulseHandle,
    pub strength: u16,
    /// Seconds left on the countdown. May dip below zero on the last step.
    pub remaining: f64,
    interval_secs: f64,
    interval: Duration,
    next_due: Duration,
    started: bool,
    fired: u32,
}

impl PulseSequence {
    pub fn fired(&self) -> u32 {
        self.fired
    }

    pub fn next_due(&self) -> Duration {
        self.next_due
    }

    /// Run one resume of the sequence if it is due. Returns `Ok(false)` once
    /// the countdown is exhausted.
    fn step<F, E>(&mut self, now: Duration, fire: &mut F) -> Result<bool, E>
    where
        F: FnMut(u16) -> Result<(), E>,
    {
        if now < self.next_due {
            return Ok(true);
        }
        if self.started {
            self.remaining -= self.interval_secs;
            if self.remaining <= COUNTDOWN_EPSILON {
                return Ok(false);
            }
        }
        self.started = true;
        fire(self.strength)?;
        self.fired += 1;
        self.next_due = now + self.interval;
        Ok(true)
    }
}

/// Cooperative scheduler for timed pulse sequences.
///
/// Nothing here sleeps: the host calls [`PulseScheduler::tick`] once per
/// frame with a monotonic clock and each due sequence advances one step.
/// A sequence resumes on the first tick at or after its wait has elapsed,
/// so frame granularity can stretch the wait but never shorten it.
#[derive(Debug, Default)]
pub struct PulseScheduler {
    sequences: Vec<PulseSequence>,
    next_id: u64,
}

impl PulseScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a sequence and fire its first pulse immediately.
    ///
    /// Returns `Ok(None)` without firing when `interval` or `duration` is not
    /// positive. If the first pulse fails the sequence is not scheduled.
    pub fn start<F, E>(
        &mut self,
        strength: u16,
        duration: f32,
        interval: f32,
        now: Duration,
        mut fire: F,
    ) -> Result<Option<PulseHandle>, E>
    where
        F: FnMut(u16) -> Result<(), E>,
    {
        // negated comparisons so NaN lands here too
        if !(interval > 0.0) || !(duration > 0.0) {
            return Ok(None);
        }
        let handle = PulseHandle(self.next_id);
        self.next_id += 1;

        let mut seq = PulseSequence {
            handle,
            strength,
            remaining: duration as f64,
            interval_secs: interval as f64,
            interval: whole_micros(interval),
            next_due: now,
            started: false,
            fired: 0,
        };
        if !seq.step(now, &mut fire)? {
            return Ok(None);
        }
        tracing::info!(?handle, strength, duration, interval, "pulse sequence started");
        self.sequences.push(seq);
        Ok(Some(handle))
    }

    /// Advance every due sequence by one step. Returns the number of pulses
    /// fired. A sequence whose pulse fails is dropped.
    pub fn tick<F, E>(&mut self, now: Duration, mut fire: F) -> usize
    where
        F: FnMut(u16) -> Result<(), E>,
        E: Display,
    {
        let mut fired = 0;
        self.sequences.retain_mut(|seq| {
            let before = seq.fired;
            match seq.step(now, &mut fire) {
                Ok(alive) => {
                    fired += (seq.fired - before) as usize;
                    if !alive {
                        tracing::info!(
                            handle = ?seq.handle,
                            pulses = seq.fired,
                            "pulse sequence finished"
                        );
                    }
                    alive
                }
                Err(e) => {
                    tracing::warn!(handle = ?seq.handle, "pulse sequence aborted: {e}");
                    false
                }
            }
        });
        tracing::trace!(fired, running = self.sequences.len(), "pulse tick");
        fired
    }

    /// Whether any sequence would fire or finish on a tick at `now`.
    pub fn has_due(&self, now: Duration) -> bool {
        self.sequences.iter().any(|s| now >= s.next_due)
    }

    /// Stop a sequence. Returns false if it already finished.
    pub fn cancel(&mut self, handle: PulseHandle) -> bool {
        let before = self.sequences.len();
        self.sequences.retain(|s| s.handle != handle);
        let removed = self.sequences.len() != before;
        if removed {
            tracing::debug!(?handle, "pulse sequence cancelled");
        }
        removed
    }

    /// Stop every sequence. Returns how many were running.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.sequences.len();
        self.sequences.clear();
        n
    }

    pub fn is_running(&self, handle: PulseHandle) -> bool {
        self.sequences.iter().any(|s| s.handle == handle)
    }

    pub fn running(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequences(&self) -> &[PulseSequence] {
        &self.sequences
    }
}

/// Seconds to a Duration rounded to whole microseconds, so a 0.1 s interval
/// is exactly 100 ms rather than the f32 value's 100.000001 ms.
fn whole_micros(secs: f32) -> Duration {
    Duration::from_micros((secs as f64 * 1_000_000.0).round() as u64)
}
