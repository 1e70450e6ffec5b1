//! Table-keyed publish/subscribe over a [`Bus`] of [`Notification`]s.

use keybus_core::{Bus, Unsubscribe};

use crate::notification::{Notification, Operation};

/// Typed front end for row-change notifications
///
/// Topics are table names. Subscribers receive the operation and row id;
/// the table is implied by what they subscribed to. Clones share the same
/// bus.
#[derive(Debug, Clone, Default)]
pub struct PubSub {
    bus: Bus<Notification>,
}

impl PubSub {
    /// Create a pub/sub on a fresh bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pub/sub on an existing bus
    pub fn with_bus(bus: Bus<Notification>) -> Self {
        Self { bus }
    }

    /// The underlying bus
    pub fn bus(&self) -> &Bus<Notification> {
        &self.bus
    }

    /// Call `handler` for every change published on `table`
    pub fn subscribe<F>(&self, table: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(Operation, i64) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe(table, move |notification: &Notification| {
            handler(notification.operation, notification.id)
        })
    }

    /// Call `handler` for the next change published on `table` only
    pub fn subscribe_once<F>(&self, table: impl Into<String>, handler: F) -> Unsubscribe
    where
        F: Fn(Operation, i64) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.subscribe_once(table, move |notification: &Notification| {
            handler(notification.operation, notification.id)
        })
    }

    /// Notify subscribers of `table` that row `id` changed
    pub fn publish(&self, table: &str, operation: Operation, id: i64) -> anyhow::Result<()> {
        let notification = Notification::new(table, operation, id);
        tracing::trace!("Notify {}", notification.description());
        self.bus.publish(table, &notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybus_core::BusConfig;

    #[test]
    fn test_with_bus_shares_registry() {
        let bus: Bus<Notification> = Bus::with_config(BusConfig::named("tables"));
        let pubsub = PubSub::with_bus(bus.clone());

        pubsub.subscribe("users", |_, _| Ok(()));
        assert_eq!(bus.subscriber_count("users"), 1);
        assert_eq!(pubsub.bus().config().name, "tables");
    }

    #[test]
    fn test_raw_bus_subscribers_see_table() {
        let pubsub = PubSub::new();
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(None));
        let seen_clone = seen.clone();

        pubsub.bus().subscribe("users", move |notification| {
            *seen_clone.lock() = Some(notification.clone());
            Ok(())
        });
        pubsub.publish("users", Operation::Insert, 5).expect("Should publish");

        assert_eq!(
            *seen.lock(),
            Some(Notification::new("users", Operation::Insert, 5))
        );
    }
}
