//! Bus implementation.
//!
//! Provides the keyed subscription registry and the synchronous fan-out
//! used by [`Bus::publish`].

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use crate::config::BusConfig;
use crate::error::RegistryViolation;
use crate::id::SubscriptionId;
use crate::unsubscribe::{Detach, Removed, Unsubscribe};

/// Type alias for stored handler functions
type Handler<P, E> = Arc<dyn Fn(&P) -> Result<(), E> + Send + Sync>;

/// Topic key to the subscriptions registered under it.
///
/// A key is present only while it has at least one subscription.
struct Registry<P, E> {
    topics: HashMap<String, HashMap<SubscriptionId, Handler<P, E>>>,
}

impl<P, E> Registry<P, E> {
    fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    fn insert(&mut self, key: String, id: SubscriptionId, handler: Handler<P, E>) {
        self.topics.entry(key).or_default().insert(id, handler);
    }

    fn remove(
        &mut self,
        key: &str,
        id: SubscriptionId,
    ) -> Result<Handler<P, E>, RegistryViolation> {
        let Some(subscriptions) = self.topics.get_mut(key) else {
            return Err(RegistryViolation::TopicMissing {
                key: key.to_string(),
            });
        };
        let Some(handler) = subscriptions.remove(&id) else {
            return Err(RegistryViolation::SubscriptionMissing {
                key: key.to_string(),
                id,
            });
        };
        if subscriptions.is_empty() {
            self.topics.remove(key);
        }
        Ok(handler)
    }

    fn snapshot(&self, key: &str) -> Vec<(SubscriptionId, Handler<P, E>)> {
        match self.topics.get(key) {
            Some(subscriptions) => subscriptions
                .iter()
                .map(|(id, handler)| (*id, Arc::clone(handler)))
                .collect(),
            None => Vec::new(),
        }
    }
}

struct Shared<P, E> {
    registry: RwLock<Registry<P, E>>,
    config: BusConfig,
}

impl<P: 'static, E: 'static> Detach for Shared<P, E> {
    fn detach(&self, key: &str, id: SubscriptionId) -> Result<Removed, RegistryViolation> {
        let handler = self.registry.write().remove(key, id)?;
        tracing::debug!(
            "Subscription {} removed from '{}' on bus {}",
            id,
            key,
            self.config.name
        );
        Ok(Box::new(handler))
    }
}

/// In-process, keyed publish/subscribe bus
///
/// `P` is the payload handed to every handler, `E` the error a handler may
/// fail with. Cloning a bus is cheap and every clone shares one registry, so
/// handlers can capture a clone and call back into the bus while running.
pub struct Bus<P, E = anyhow::Error> {
    shared: Arc<Shared<P, E>>,
}

impl<P: 'static, E: 'static> Bus<P, E> {
    /// Create a new bus with default configuration
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a new bus with custom configuration
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(Registry::new()),
                config,
            }),
        }
    }

    /// Register `handler` under `key`
    ///
    /// The handler is visible to every publish on `key` that starts after
    /// this returns. Registering the same handler twice yields two
    /// independent subscriptions.
    pub fn subscribe<F>(&self, key: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(&P) -> Result<(), E> + Send + Sync + 'static,
    {
        self.register(key.into(), move |_| {
            let handler: Handler<P, E> = Arc::new(handler);
            handler
        })
    }

    /// Register `handler` under `key` for a single delivery
    ///
    /// The first delivery removes the subscription before running the
    /// handler, so it runs at most once even when several publishes race.
    /// Calling the returned capability before any delivery disables it.
    pub fn subscribe_once<F>(&self, key: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(&P) -> Result<(), E> + Send + Sync + 'static,
    {
        self.register(key.into(), move |unsubscribe| {
            let unsubscribe = unsubscribe.clone();
            let once: Handler<P, E> = Arc::new(move |payload: &P| {
                if unsubscribe.fire() {
                    handler(payload)
                } else {
                    Ok(())
                }
            });
            once
        })
    }

    /// Deliver `payload` to every handler registered under `key`
    ///
    /// Handlers run one after another on the calling thread, in no
    /// particular order, with no lock held. The first error is returned
    /// as-is and the remaining handlers are skipped.
    pub fn publish(&self, key: &str, payload: &P) -> Result<(), E> {
        let listeners = self.listeners_for(key);
        if listeners.is_empty() {
            tracing::trace!("No subscribers for '{}' on bus {}", key, self.shared.config.name);
            return Ok(());
        }
        tracing::trace!(
            "Publishing '{}' to {} subscriber(s) on bus {}",
            key,
            listeners.len(),
            self.shared.config.name
        );

        let config = &self.shared.config;
        for (id, listener) in listeners {
            let started = config.slow_handler_threshold.map(|_| Instant::now());
            let result = listener(payload);

            if let Some(started) = started {
                let elapsed = started.elapsed();
                if config.is_slow(elapsed) {
                    tracing::warn!(
                        "Slow handler {} on '{}' took {:?} (threshold {:?})",
                        id,
                        key,
                        elapsed,
                        config.slow_handler_threshold
                    );
                }
            }

            if result.is_err() {
                tracing::debug!("Handler {} on '{}' failed, aborting publish", id, key);
                return result;
            }
        }
        Ok(())
    }

    /// Number of topic keys with at least one subscription
    pub fn topic_count(&self) -> usize {
        self.shared.registry.read().topics.len()
    }

    /// Number of subscriptions under `key`
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.shared
            .registry
            .read()
            .topics
            .get(key)
            .map_or(0, HashMap::len)
    }

    /// Whether anything is subscribed under `key`
    pub fn has_subscribers(&self, key: &str) -> bool {
        self.shared.registry.read().topics.contains_key(key)
    }

    /// Get the current configuration
    pub fn config(&self) -> &BusConfig {
        &self.shared.config
    }

    fn listeners_for(&self, key: &str) -> Vec<(SubscriptionId, Handler<P, E>)> {
        self.shared.registry.read().snapshot(key)
    }

    fn register(
        &self,
        key: String,
        build: impl FnOnce(&Unsubscribe) -> Handler<P, E>,
    ) -> Unsubscribe {
        let weak = Arc::downgrade(&self.shared);
        let weak: Weak<dyn Detach> = weak;
        let mut registry = self.shared.registry.write();

        let id = SubscriptionId::new();
        let unsubscribe = Unsubscribe::new(key.clone(), id, weak);
        let handler = build(&unsubscribe);
        tracing::debug!(
            "Subscription {} added to '{}' on bus {}",
            id,
            key,
            self.shared.config.name
        );
        registry.insert(key, id, handler);

        unsubscribe
    }
}

impl<P, E> Clone for Bus<P, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P: 'static, E: 'static> Default for Bus<P, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, E> std::fmt::Debug for Bus<P, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.shared.config.name)
            .field("topics", &self.shared.registry.read().topics.len())
            .finish()
    }
}
