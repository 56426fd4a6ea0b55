use tracing::debug;

use super::{EventTimeline, TimelineEvent};
use crate::audio::SoundTrigger;

/// Replays a timeline against a playback clock
///
/// Events are dispatched in timestamp order (ties keep their recorded order).
/// A tick that jumps past several events dispatches all of them.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    events: Vec<TimelineEvent>,
    next: usize,
    clock: f64,
}

impl PlaybackCursor {
    pub fn new(timeline: &EventTimeline) -> Self {
        Self {
            events: timeline.sorted(),
            next: 0,
            clock: 0.0,
        }
    }

    /// Seconds since playback started
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn dispatched(&self) -> usize {
        self.next
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.next
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.events.len()
    }

    /// Advance the clock by `delta_secs` and fire every event now due
    pub fn advance(&mut self, delta_secs: f64, trigger: &mut dyn SoundTrigger) -> usize {
        if delta_secs.is_finite() && delta_secs > 0.0 {
            self.clock += delta_secs;
        }

        let start = self.next;
        while let Some(event) = self.events.get(self.next) {
            if event.timestamp > self.clock {
                break;
            }
            debug!(
                "Dispatching {:?} {} at {:.3}s (clock {:.3}s)",
                event.kind, event.payload.identifier, event.timestamp, self.clock
            );
            trigger.fire(event);
            self.next += 1;
        }

        self.next - start
    }
}
