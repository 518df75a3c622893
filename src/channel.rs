use crate::cancel::CancelToken;
use crate::event::{ColorChangeEvent, Rgb, VideoTag};
use spdlog::warn;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Upper bound on one condvar wait, so a cancellation request is observed
/// promptly even while the consumer is blocked.
const WAIT_SLICE: Duration = Duration::from_millis(20);

/// Outcome of one consumer wait on an [`EventSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Available { color: Rgb, timestamp_ms: i64 },
    TimedOut,
    Cancelled,
}

#[derive(Default)]
struct Slot {
    permits: u64,
    latest: Option<(Rgb, i64)>,
}

/// Single-slot availability signal for one source tag.
///
/// `publish` never blocks: it overwrites the latest value and adds one
/// permit. Bursts accumulate permits, but every successful wait reads the
/// value that was most recently published. Intermediate states a slow
/// consumer never drained are dropped; the domain only cares that a new
/// color is showing.
pub struct EventSlot {
    tag: VideoTag,
    slot: Mutex<Slot>,
    available: Condvar,
}

impl EventSlot {
    pub fn new(tag: VideoTag) -> Self {
        Self {
            tag,
            slot: Mutex::new(Slot::default()),
            available: Condvar::new(),
        }
    }

    pub fn tag(&self) -> VideoTag {
        self.tag
    }

    /// Producer side. An event whose tag disagrees with this slot's tag is
    /// logged and dropped rather than corrupting the paired stream.
    pub fn publish(&self, event: ColorChangeEvent) {
        if event.tag != self.tag {
            warn!(
                "dropping {} event published to the {} slot",
                event.tag, self.tag
            );
            return;
        }
        let mut slot = self.slot.lock().unwrap();
        slot.latest = Some((event.color, event.timestamp_ms));
        slot.permits += 1;
        drop(slot);
        self.available.notify_one();
    }

    /// Consumer side: blocks until a permit is available, the timeout
    /// elapses, or `cancel` is requested.
    pub fn wait_next(&self, timeout: Duration, cancel: &CancelToken) -> Wait {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap();
        loop {
            if slot.permits > 0
                && let Some((color, timestamp_ms)) = slot.latest
            {
                slot.permits -= 1;
                return Wait::Available {
                    color,
                    timestamp_ms,
                };
            }
            if cancel.is_cancelled() {
                return Wait::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wait::TimedOut;
            }
            let slice = WAIT_SLICE.min(deadline - now);
            let (guard, _) = self.available.wait_timeout(slot, slice).unwrap();
            slot = guard;
        }
    }
}

/// Write handle handed to a producer thread. The controller owns both ends
/// conceptually; producers only publish.
#[derive(Clone)]
pub struct EventPublisher {
    slot: Arc<EventSlot>,
}

impl EventPublisher {
    pub(crate) fn new(slot: Arc<EventSlot>) -> Self {
        Self { slot }
    }

    pub fn tag(&self) -> VideoTag {
        self.slot.tag()
    }

    pub fn publish(&self, color: Rgb, timestamp_ms: i64) {
        self.slot
            .publish(ColorChangeEvent::new(self.slot.tag(), color, timestamp_ms));
    }

    pub fn publish_event(&self, event: ColorChangeEvent) {
        self.slot.publish(event);
    }
}
