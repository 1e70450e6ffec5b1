//! Subscription identities.

use uuid::Uuid;

/// Identity of a single subscription.
///
/// Backed by a UUIDv7, so identities sort roughly by creation time and never
/// repeat within a process. Two registrations of the same handler value get
/// two distinct identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new unique subscription ID
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The leading digits of a v7 UUID are the timestamp; show the tail.
        let simple = self.0.simple().to_string();
        write!(f, "Sub({})", &simple[simple.len() - 8..])
    }
}
