//! # keybus
//!
//! An in-process, keyed publish/subscribe event bus.
//!
//! ## Architecture
//!
//! keybus is organized as a workspace with multiple crates:
//!
//! 1. **keybus-core** - Subscription registry, unsubscribe capabilities, fan-out
//! 2. **keybus-notify** - Table / operation / row id notifications over the bus
//! 3. **keybus-settings** - Bus and logging configuration files
//! 4. **keybus** - This facade, re-exporting the above plus logging setup
//!
//! ## Example
//!
//! ```rust
//! use keybus::{Operation, PubSub};
//!
//! let pubsub = PubSub::new();
//! let unsubscribe = pubsub.subscribe("users", |operation, id| {
//!     println!("{} on user {}", operation, id);
//!     Ok(())
//! });
//!
//! pubsub.publish("users", Operation::Update, 42)?;
//! unsubscribe.unsubscribe();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use keybus_core::{Bus, BusConfig, RegistryViolation, SubscriptionId, Unsubscribe};
pub use keybus_notify::{Notification, NotifyError, Operation, PubSub};
pub use keybus_settings::{
    BusSettings, ConfigError, LogFormat, LoggingSettings, Settings, SettingsError, SettingsResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Create a bus configured from `settings`
pub fn bus_from_settings<P: 'static>(settings: &Settings) -> Bus<P> {
    Bus::with_config(settings.bus.to_bus_config())
}

/// Initialize logging from the given settings
///
/// Sets up structured logging with:
/// - `RUST_LOG` environment variable support, falling back to the configured level
/// - Console output in the configured format (pretty, compact or JSON)
/// - Thread ids, thread names and line numbers on every event
///
/// Fails if the level is not a valid filter or a global subscriber is
/// already installed.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level: LevelFilter = settings.level.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match settings.format {
        LogFormat::Pretty => registry.with(fmt_layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init(),
        LogFormat::Json => registry.with(fmt_layer.json()).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("keybus {} (built {}) logging initialized", VERSION, BUILD_DATE);
    Ok(())
}
