//! # keybus Core
//!
//! An in-process, keyed publish/subscribe bus.
//!
//! Handlers are registered against string keys and triggered together by a
//! single publish on that key. Delivery is synchronous on the publishing
//! thread and stops at the first handler error.
//!
//! ## Usage
//!
//! ```rust
//! use keybus_core::Bus;
//!
//! let bus: Bus<u32> = Bus::new();
//!
//! let unsubscribe = bus.subscribe("users", |id| {
//!     println!("user {} changed", id);
//!     Ok(())
//! });
//!
//! bus.publish("users", &42)?;
//!
//! // Idempotent
//! unsubscribe.unsubscribe();
//! unsubscribe.unsubscribe();
//! # Ok::<(), anyhow::Error>(())
//! ```

mod bus;
mod config;
mod error;
mod id;
mod unsubscribe;

pub use bus::Bus;
pub use config::BusConfig;
pub use error::RegistryViolation;
pub use id::SubscriptionId;
pub use unsubscribe::Unsubscribe;
