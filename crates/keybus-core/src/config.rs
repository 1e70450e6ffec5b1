//! Bus configuration.

use std::time::Duration;

/// Configuration for a [`crate::Bus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Label attached to this bus's log output.
    pub name: String,
    /// Handlers running longer than this are reported at `warn` level.
    ///
    /// Purely diagnostic: a slow handler is never interrupted.
    pub slow_handler_threshold: Option<Duration>,
}

impl BusConfig {
    /// Config with the given name and default everything else
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether a handler that ran for `elapsed` should be reported as slow
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_handler_threshold.is_some_and(|threshold| elapsed > threshold)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            slow_handler_threshold: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BusConfig::default();
        assert_eq!(config.name, "default");
        assert!(config.slow_handler_threshold.is_none());
    }

    #[test]
    fn test_named() {
        let config = BusConfig::named("tables");
        assert_eq!(config.name, "tables");
        assert_eq!(config.slow_handler_threshold, None);
    }

    #[test]
    fn test_is_slow_without_threshold() {
        let config = BusConfig::default();
        assert!(!config.is_slow(Duration::from_secs(3600)));
    }

    #[test]
    fn test_is_slow_strictly_above_threshold() {
        let config = BusConfig {
            slow_handler_threshold: Some(Duration::from_millis(10)),
            ..BusConfig::named("slow")
        };
        assert!(!config.is_slow(Duration::from_millis(9)));
        assert!(!config.is_slow(Duration::from_millis(10)));
        assert!(config.is_slow(Duration::from_millis(11)));
    }
}
