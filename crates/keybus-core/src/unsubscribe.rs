//! The one-shot unsubscribe capability handed out by `Bus::subscribe`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use crate::error::RegistryViolation;
use crate::id::SubscriptionId;

const ACTIVE: u8 = 0;
const DETACHING: u8 = 1;
const DETACHED: u8 = 2;

/// Whatever the registry held for a removed subscription.
///
/// Handed back so it is dropped only after the guard has settled: dropping a
/// handler may run arbitrary code, including this capability again.
pub(crate) type Removed = Box<dyn Send>;

/// Registry side of an unsubscribe, erased over the bus's payload and error
/// types so the capability itself is not generic.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, key: &str, id: SubscriptionId) -> Result<Removed, RegistryViolation>;
}

/// Capability that removes one subscription from its bus.
///
/// Only the first call does anything; every later call, from any thread and
/// through any clone, is a no-op. A call that loses the race against a
/// concurrent first call returns only once the removal has finished, so the
/// handler is never seen by a publish that starts afterwards.
///
/// The capability holds a weak reference to the registry. Once every clone of
/// the [`crate::Bus`] is gone there is nothing left to remove from and
/// calling it does nothing.
#[derive(Clone)]
pub struct Unsubscribe {
    guard: Arc<Guard>,
}

struct Guard {
    key: String,
    id: SubscriptionId,
    state: AtomicU8,
    registry: Weak<dyn Detach>,
}

impl Unsubscribe {
    pub(crate) fn new(key: String, id: SubscriptionId, registry: Weak<dyn Detach>) -> Self {
        Self {
            guard: Arc::new(Guard {
                key,
                id,
                state: AtomicU8::new(ACTIVE),
                registry,
            }),
        }
    }

    /// Remove the subscription. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if the registry no longer holds the subscription although this
    /// capability never fired, which means the registry is corrupted.
    pub fn unsubscribe(&self) {
        self.fire();
    }

    /// Runs the removal if nobody has yet. Returns `true` for the single call
    /// that won the guard.
    pub(crate) fn fire(&self) -> bool {
        let guard = &self.guard;
        if guard
            .state
            .compare_exchange(ACTIVE, DETACHING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            while guard.state.load(Ordering::Acquire) == DETACHING {
                std::thread::yield_now();
            }
            return false;
        }

        let settle = Settle(&guard.state);
        let outcome = match guard.registry.upgrade() {
            Some(registry) => registry.detach(&guard.key, guard.id).map(Some),
            None => {
                tracing::trace!("Subscription {} outlived its bus", guard.id);
                Ok(None)
            }
        };
        drop(settle);

        match outcome {
            Ok(removed) => {
                drop(removed);
                true
            }
            Err(violation) => panic!("keybus registry corrupted: {}", violation),
        }
    }

    /// `true` until the first call to [`Unsubscribe::unsubscribe`]
    pub fn is_active(&self) -> bool {
        self.guard.state.load(Ordering::Acquire) == ACTIVE
    }

    /// Identity of the subscription this capability removes
    pub fn id(&self) -> SubscriptionId {
        self.guard.id
    }

    /// Topic key of the subscription this capability removes
    pub fn key(&self) -> &str {
        &self.guard.key
    }
}

/// Marks the guard detached when dropped, including while unwinding out of a
/// panicking detach, so callers waiting on the guard are released.
struct Settle<'a>(&'a AtomicU8);

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.0.store(DETACHED, Ordering::Release);
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("key", &self.guard.key)
            .field("id", &self.guard.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingRegistry {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, SubscriptionId)>>,
    }

    impl Detach for CountingRegistry {
        fn detach(&self, key: &str, id: SubscriptionId) -> Result<Removed, RegistryViolation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().push((key.to_string(), id));
            Ok(Box::new(()))
        }
    }

    struct CorruptRegistry;

    impl Detach for CorruptRegistry {
        fn detach(&self, key: &str, _id: SubscriptionId) -> Result<Removed, RegistryViolation> {
            Err(RegistryViolation::TopicMissing {
                key: key.to_string(),
            })
        }
    }

    struct PanickingRegistry;

    impl Detach for PanickingRegistry {
        fn detach(&self, _key: &str, _id: SubscriptionId) -> Result<Removed, RegistryViolation> {
            panic!("detach failed");
        }
    }

    fn capability(registry: &Arc<CountingRegistry>, key: &str) -> Unsubscribe {
        let weak: Weak<dyn Detach> = Arc::downgrade(registry) as Weak<dyn Detach>;
        Unsubscribe::new(key.to_string(), SubscriptionId::new(), weak)
    }

    #[test]
    fn test_fires_once() {
        let registry = Arc::new(CountingRegistry::default());
        let unsubscribe = capability(&registry, "users");

        assert!(unsubscribe.is_active());
        assert!(unsubscribe.fire());
        assert!(!unsubscribe.fire());
        unsubscribe.unsubscribe();

        assert!(!unsubscribe.is_active());
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.seen.lock().as_slice(),
            &[("users".to_string(), unsubscribe.id())]
        );
    }

    #[test]
    fn test_clones_share_guard() {
        let registry = Arc::new(CountingRegistry::default());
        let unsubscribe = capability(&registry, "users");
        let copy = unsubscribe.clone();

        copy.unsubscribe();
        assert!(!unsubscribe.is_active());
        unsubscribe.unsubscribe();

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_calls_detach_once() {
        let registry = Arc::new(CountingRegistry::default());
        let unsubscribe = capability(&registry, "sessions");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let unsubscribe = unsubscribe.clone();
                scope.spawn(move || unsubscribe.unsubscribe());
            }
        });

        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_registry_is_noop() {
        let registry = Arc::new(CountingRegistry::default());
        let unsubscribe = capability(&registry, "users");
        drop(registry);

        assert!(unsubscribe.fire());
        assert!(!unsubscribe.is_active());
    }

    #[test]
    #[should_panic(expected = "keybus registry corrupted")]
    fn test_violation_panics() {
        let registry: Arc<dyn Detach> = Arc::new(CorruptRegistry);
        let unsubscribe = Unsubscribe::new(
            "users".to_string(),
            SubscriptionId::new(),
            Arc::downgrade(&registry),
        );
        unsubscribe.unsubscribe();
    }

    #[test]
    fn test_panicking_detach_settles_guard() {
        let registry: Arc<dyn Detach> = Arc::new(PanickingRegistry);
        let unsubscribe = Unsubscribe::new(
            "users".to_string(),
            SubscriptionId::new(),
            Arc::downgrade(&registry),
        );

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            unsubscribe.unsubscribe();
        }));
        assert!(result.is_err());
        assert!(!unsubscribe.is_active());

        // Later callers return instead of waiting on a removal that never ends.
        let copy = unsubscribe.clone();
        let won = std::thread::spawn(move || copy.fire())
            .join()
            .expect("Should not panic");
        assert!(!won);
        assert!(!unsubscribe.fire());
    }

    #[test]
    fn test_debug_output() {
        let registry = Arc::new(CountingRegistry::default());
        let unsubscribe = capability(&registry, "users");
        let shown = format!("{:?}", unsubscribe);
        assert!(shown.contains("\"users\""));
        assert!(shown.contains("active: true"));
    }
}
