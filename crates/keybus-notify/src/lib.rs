//! # keybus Notify
//!
//! Row-change notifications on top of the keybus core.
//!
//! Maps a (table, operation, row id) notification onto the generic
//! key + payload bus, using the table name as the topic key.

pub mod notification;
pub mod pubsub;

pub use notification::{Notification, NotifyError, Operation};
pub use pubsub::PubSub;
