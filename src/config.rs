// Engine configuration
// Size limits and feature flags, overridable from the environment

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard upper bound applied when no configuration is provided
pub const DEFAULT_ABSOLUTE_MAX_SIZE: usize = 500_000;

/// Per-hook plugin timeout applied when no configuration is provided
pub const DEFAULT_PLUGIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Consecutive failures after which a plugin is disabled for process lifetime
pub const DEFAULT_PLUGIN_FAILURE_LIMIT: u32 = 3;

/// Runtime configuration for the redaction engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Absolute input size cap in bytes; larger inputs are rejected outright
    pub absolute_max_size: usize,
    /// Unicode normalization and adversarial-input detection before scanning
    pub adversarial_defense: bool,
    /// Master switch for the plugin subsystem
    pub plugins_enabled: bool,
    /// Per-hook plugin timeout
    #[serde(skip, default = "default_plugin_timeout")]
    pub plugin_timeout: Duration,
    /// Consecutive plugin failures before the plugin is disabled
    pub plugin_failure_limit: u32,
    /// Confidence floor applied by the ConfidenceThreshold post-filter
    pub confidence_threshold: f64,
    /// Tokens captured on each side of a span for disambiguation
    pub window_tokens: usize,
}

fn default_plugin_timeout() -> Duration {
    DEFAULT_PLUGIN_TIMEOUT
}

impl Default for RedactionConfig {
    fn default() -> Self {
        RedactionConfig {
            absolute_max_size: DEFAULT_ABSOLUTE_MAX_SIZE,
            adversarial_defense: true,
            plugins_enabled: true,
            plugin_timeout: DEFAULT_PLUGIN_TIMEOUT,
            plugin_failure_limit: DEFAULT_PLUGIN_FAILURE_LIMIT,
            confidence_threshold: 0.3,
            window_tokens: 5,
        }
    }
}

impl RedactionConfig {
    /// Build a configuration from the process environment.
    ///
    /// Recognized keys:
    /// - `REDACTION_ABSOLUTE_MAX_SIZE`: input cap in bytes
    /// - `VULPES_ADVERSARIAL_DEFENSE`: `0`/`false` disables the normalizer;
    ///   unset, `1`, or `true` leaves it on
    /// - `VULPES_PLUGINS_ENABLED`: `0` disables the plugin subsystem
    pub fn from_env() -> Self {
        let mut config = RedactionConfig::default();

        if let Ok(raw) = std::env::var("REDACTION_ABSOLUTE_MAX_SIZE") {
            if let Ok(size) = raw.trim().parse::<usize>() {
                if size > 0 {
                    config.absolute_max_size = size;
                }
            }
        }

        config.adversarial_defense = flag_enabled_by_default("VULPES_ADVERSARIAL_DEFENSE");
        config.plugins_enabled =
            std::env::var("VULPES_PLUGINS_ENABLED").map(|v| v.trim() != "0").unwrap_or(true);

        config
    }
}

/// Unset, "1", and "true" mean enabled; "0" and "false" mean disabled
fn flag_enabled_by_default(key: &str) -> bool {
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            !(v == "0" || v == "false")
        }
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = RedactionConfig::default();
        assert_eq!(c.absolute_max_size, 500_000);
        assert!(c.adversarial_defense);
        assert!(c.plugins_enabled);
        assert_eq!(c.plugin_failure_limit, 3);
    }

    #[test]
    fn test_flag_semantics() {
        std::env::remove_var("VULPES_TEST_FLAG_A");
        assert!(flag_enabled_by_default("VULPES_TEST_FLAG_A"));
        std::env::set_var("VULPES_TEST_FLAG_A", "0");
        assert!(!flag_enabled_by_default("VULPES_TEST_FLAG_A"));
        std::env::set_var("VULPES_TEST_FLAG_A", "false");
        assert!(!flag_enabled_by_default("VULPES_TEST_FLAG_A"));
        std::env::set_var("VULPES_TEST_FLAG_A", "true");
        assert!(flag_enabled_by_default("VULPES_TEST_FLAG_A"));
        std::env::remove_var("VULPES_TEST_FLAG_A");
    }
}
