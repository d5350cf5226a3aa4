//! # Progress Notifications
//!
//! The narrow observer surface between the sync engine and whatever UI is
//! currently on screen. The coordinator broadcasts every notification to
//! all observers attached to the running episode; a surface that attaches
//! mid-episode hears everything from that point on, including the terminal
//! notification.
//!
//! ## Notification Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Episode                         Observers (UI surfaces)            │
//! │                                                                     │
//! │  start ──────────────► SyncStarting                                 │
//! │  fetch failed ───────► ConnectionError          (terminal)          │
//! │  sentinel missing ───► DownloadFailure          (terminal)          │
//! │  payload complete ───► DownloadSuccess                              │
//! │  total parsed ───────► ParseProgressTotal(n)                        │
//! │  record applied ─────► ParseProgressTick(i)     (per record)        │
//! │  pass recorded ──────► ParseSuccess             (terminal)          │
//! │  pass failed ────────► ParseError               (terminal)          │
//! │                                                                     │
//! │  After the terminal notification the observer set is cleared; a     │
//! │  later episode says nothing to observers that do not re-attach.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};
use tracing::trace;

// =============================================================================
// Notification Kinds
// =============================================================================

/// A progress or completion signal from a synchronization episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncNotification {
    /// An episode has acquired the lock and begun.
    SyncStarting,
    /// The feed could not be retrieved (timeout, refused, non-2xx).
    ConnectionError,
    /// The feed payload arrived and carries its end sentinel.
    DownloadSuccess,
    /// The payload arrived truncated (end sentinel missing).
    DownloadFailure,
    /// The feed header declared this many records; lets the UI switch to
    /// a determinate progress indicator.
    ParseProgressTotal(u32),
    /// Running count of records applied so far.
    ParseProgressTick(u32),
    /// The pass completed and the feed version was recorded.
    ParseSuccess,
    /// The pass failed; no version was recorded.
    ParseError,
}

impl SyncNotification {
    /// True for the notifications that end an episode from the observer's
    /// point of view.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncNotification::ConnectionError
                | SyncNotification::DownloadFailure
                | SyncNotification::ParseSuccess
                | SyncNotification::ParseError
        )
    }
}

// =============================================================================
// Observer Trait
// =============================================================================

/// Implemented by UI surfaces that want episode progress.
///
/// Called from the episode's background task; implementations must hand
/// off to their own event loop rather than block.
pub trait SyncObserver: Send + Sync {
    /// Delivers one notification.
    fn notify(&self, event: SyncNotification);
}

/// No-op observer for timer-driven (silent) episodes and tests.
pub struct NoOpObserver;

impl SyncObserver for NoOpObserver {
    fn notify(&self, _event: SyncNotification) {}
}

// =============================================================================
// Observer Set
// =============================================================================

/// The observers attached to the currently running episode.
///
/// Cheaply cloneable; the coordinator and the episode task share one set.
/// Attach never blocks an episode: broadcasts snapshot the list before
/// delivering.
#[derive(Clone, Default)]
pub struct ObserverSet {
    inner: Arc<Mutex<Vec<Arc<dyn SyncObserver>>>>,
}

impl ObserverSet {
    /// Creates an empty observer set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an observer to the running episode. The most recently
    /// attached observer is the one an embedding UI should treat as the
    /// active surface for any error dialog it raises.
    pub fn attach(&self, observer: Arc<dyn SyncObserver>) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    /// Detaches one observer (matched by identity). The running episode
    /// is unaffected; detaching never releases the sync lock.
    pub fn detach(&self, observer: &Arc<dyn SyncObserver>) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|existing| !Arc::ptr_eq(existing, observer));
    }

    /// Detaches all observers. Called once the terminal notification has
    /// been delivered, before the lock is released.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Number of currently attached observers.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True when no observer is attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers a notification to every attached observer.
    pub fn broadcast(&self, event: SyncNotification) {
        trace!(?event, "Broadcasting sync notification");

        let observers: Vec<Arc<dyn SyncObserver>> = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for observer in observers {
            observer.notify(event);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<SyncNotification>>,
    }

    impl SyncObserver for Recording {
        fn notify(&self, event: SyncNotification) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_broadcast_reaches_all_attached() {
        let set = ObserverSet::new();
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());

        set.attach(a.clone());
        set.broadcast(SyncNotification::SyncStarting);

        set.attach(b.clone());
        set.broadcast(SyncNotification::ParseSuccess);

        assert_eq!(
            *a.events.lock().unwrap(),
            vec![SyncNotification::SyncStarting, SyncNotification::ParseSuccess]
        );
        // Late attachment only hears what follows it.
        assert_eq!(*b.events.lock().unwrap(), vec![SyncNotification::ParseSuccess]);
    }

    #[test]
    fn test_detach_removes_only_that_observer() {
        let set = ObserverSet::new();
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());

        set.attach(a.clone());
        set.attach(b.clone());

        let a_dyn: Arc<dyn SyncObserver> = a.clone();
        set.detach(&a_dyn);
        set.broadcast(SyncNotification::ParseSuccess);

        assert!(a.events.lock().unwrap().is_empty());
        assert_eq!(*b.events.lock().unwrap(), vec![SyncNotification::ParseSuccess]);
    }

    #[test]
    fn test_cleared_set_hears_nothing() {
        let set = ObserverSet::new();
        let a = Arc::new(Recording::default());

        set.attach(a.clone());
        set.clear();
        set.broadcast(SyncNotification::ParseError);

        assert!(a.events.lock().unwrap().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(SyncNotification::ParseSuccess.is_terminal());
        assert!(SyncNotification::ConnectionError.is_terminal());
        assert!(!SyncNotification::ParseProgressTick(3).is_terminal());
        assert!(!SyncNotification::SyncStarting.is_terminal());
    }
}
