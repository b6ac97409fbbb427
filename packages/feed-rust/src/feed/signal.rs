//! Viewport "near end of list" signal seam.
//!
//! The host environment (browser scroll listener, TUI list widget, ...)
//! implements [`ViewportSignal`]. The controller only registers a
//! payload-free callback and never assumes a particular event system.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Callback fired when the viewport nears the end of rendered content.
pub type NearEndCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle identifying one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Source of "near end of view" notifications.
pub trait ViewportSignal: Send + Sync {
    /// Registers `callback`; it may be invoked any number of times until
    /// unsubscribed.
    fn subscribe(&self, callback: NearEndCallback) -> SubscriptionId;

    /// Removes a previously registered callback. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-process signal fired explicitly by the host via [`ManualSignal::fire`].
#[derive(Default)]
pub struct ManualSignal {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, NearEndCallback)>>,
}

impl ManualSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every registered callback once.
    ///
    /// Callbacks run outside the registry lock, so they may unsubscribe.
    pub fn fire(&self) {
        let callbacks: Vec<NearEndCallback> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl ViewportSignal for ManualSignal {
    fn subscribe(&self, callback: NearEndCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.callbacks.lock().retain(|(existing, _)| *existing != id);
    }
}

/// Registration of a controller on a [`ViewportSignal`].
///
/// Unsubscribes on drop; hold it for as long as the feed is on screen.
pub struct SignalAttachment {
    pub(crate) signal: Arc<dyn ViewportSignal>,
    pub(crate) id: SubscriptionId,
}

impl SignalAttachment {
    /// Subscription held by this attachment.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Unsubscribes now. Equivalent to dropping the attachment.
    #[allow(clippy::needless_pass_by_value)]
    pub fn detach(self) {}
}

impl Drop for SignalAttachment {
    fn drop(&mut self) {
        self.signal.unsubscribe(self.id);
    }
}

/// Drops triggers arriving closer together than `interval`.
#[derive(Debug)]
pub(crate) struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Returns `true` and records the trigger if enough time has passed.
    pub(crate) fn permit(&self) -> bool {
        if self.interval.is_zero() {
            return true;
        }
        let now = Instant::now();
        let mut last = self.last.lock();
        match *last {
            Some(previous) if now.duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, NearEndCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: NearEndCallback = Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn fire_reaches_every_subscriber() {
        let signal = ManualSignal::new();
        let (a, cb_a) = counter();
        let (b, cb_b) = counter();
        signal.subscribe(cb_a);
        let id_b = signal.subscribe(cb_b);

        signal.fire();
        signal.unsubscribe(id_b);
        signal.fire();

        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn attachment_unsubscribes_on_drop() {
        let signal = Arc::new(ManualSignal::new());
        let (_, cb) = counter();
        let id = signal.subscribe(cb);
        let attachment = SignalAttachment {
            signal: signal.clone(),
            id,
        };
        assert_eq!(signal.subscriber_count(), 1);
        assert_eq!(attachment.id(), id);
        attachment.detach();
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_triggers() {
        let throttle = Throttle::new(Duration::from_millis(100));
        assert!(throttle.permit());
        assert!(!throttle.permit());
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(throttle.permit());
    }

    #[test]
    fn zero_interval_never_throttles() {
        let throttle = Throttle::new(Duration::ZERO);
        assert!(throttle.permit());
        assert!(throttle.permit());
    }
}
