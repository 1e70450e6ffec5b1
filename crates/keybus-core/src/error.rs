//! Error handling for keybus-core
//!
//! Two kinds of failure exist in the bus:
//! - Handler errors, chosen by the caller through the bus's `E` parameter
//!   and returned verbatim from `Bus::publish`
//! - Registry invariant violations, which are never returned through the
//!   public operations and abort the offending call instead

use thiserror::Error;

use crate::id::SubscriptionId;

/// Registry corruption detected while removing a subscription.
///
/// The one-shot guard on [`crate::Unsubscribe`] makes these unreachable
/// through the public API. Seeing one means the registry was mutated behind
/// the guard's back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryViolation {
    /// The topic has no subscription set at all
    #[error("no subscriptions for '{key}' found")]
    TopicMissing {
        /// The topic key that was looked up.
        key: String,
    },

    /// The topic exists but does not hold the subscription
    #[error("subscription missing: '{key}' {id}")]
    SubscriptionMissing {
        /// The topic key that was looked up.
        key: String,
        /// The identity that was expected under it.
        id: SubscriptionId,
    },
}
