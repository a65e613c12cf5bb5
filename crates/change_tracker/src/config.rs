//! Runtime configuration for the change tracker.
//!
//! Configuration can be loaded from environment variables or constructed
//! programmatically.

use std::env;

/// Default cap on the number of history records.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Default prefix marking the tool's own classes and `data-*` attributes.
pub const DEFAULT_INTERNAL_PREFIX: &str = "visbug";
/// Default tag prefix of the tool's injected custom elements.
pub const DEFAULT_UI_TAG_PREFIX: &str = "vis-bug";
/// Default capacity of the history notification channel.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 256;

/// Settings for a [`ChangeTracker`](crate::ChangeTracker).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Maximum number of records kept in the ledger (minimum 1)
    pub history_limit: usize,
    /// Classes starting with this prefix are left out of selectors and labels;
    /// attributes starting with `data-<prefix>` are not recorded
    pub internal_prefix: String,
    /// Elements inside a custom element whose tag starts with this prefix are off-bounds
    pub ui_tag_prefix: String,
    /// Buffered statuses per subscriber before slow receivers start lagging
    pub notify_capacity: usize,
}

impl TrackerConfig {
    /// Construct a config with explicit values. Zero limits are raised to 1.
    #[must_use]
    pub fn new(
        history_limit: usize,
        internal_prefix: impl Into<String>,
        ui_tag_prefix: impl Into<String>,
        notify_capacity: usize,
    ) -> Self {
        Self {
            history_limit: history_limit.max(1),
            internal_prefix: internal_prefix.into(),
            ui_tag_prefix: ui_tag_prefix.into(),
            notify_capacity: notify_capacity.max(1),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `VALOR_HISTORY_LIMIT`: history cap (default: 50)
    /// - `VALOR_INTERNAL_PREFIX`: internal class/attribute prefix (default: `visbug`)
    /// - `VALOR_UI_TAG_PREFIX`: tag prefix of the tool's own UI (default: `vis-bug`)
    /// - `VALOR_NOTIFY_CAPACITY`: notification channel capacity (default: 256)
    #[must_use]
    pub fn from_env() -> Self {
        let history_limit = env::var("VALOR_HISTORY_LIMIT")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_HISTORY_LIMIT);
        let internal_prefix = env::var("VALOR_INTERNAL_PREFIX")
            .ok()
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_INTERNAL_PREFIX.to_owned());
        let ui_tag_prefix = env::var("VALOR_UI_TAG_PREFIX")
            .ok()
            .filter(|val| !val.is_empty())
            .unwrap_or_else(|| DEFAULT_UI_TAG_PREFIX.to_owned());
        let notify_capacity = env::var("VALOR_NOTIFY_CAPACITY")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_NOTIFY_CAPACITY);
        Self::new(history_limit, internal_prefix, ui_tag_prefix, notify_capacity)
    }

    /// Attribute prefix the tool reserves for itself, e.g. `data-visbug`.
    #[must_use]
    pub fn reserved_attribute_prefix(&self) -> String {
        format!("data-{}", self.internal_prefix)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_HISTORY_LIMIT,
            DEFAULT_INTERNAL_PREFIX,
            DEFAULT_UI_TAG_PREFIX,
            DEFAULT_NOTIFY_CAPACITY,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limits_are_clamped() {
        let config = TrackerConfig::new(0, "x", "y", 0);
        assert_eq!(config.history_limit, 1);
        assert_eq!(config.notify_capacity, 1);
    }

    #[test]
    fn reserved_attribute_prefix_follows_internal_prefix() {
        assert_eq!(
            TrackerConfig::default().reserved_attribute_prefix(),
            "data-visbug"
        );
        let config = TrackerConfig::new(10, "mytool", "my-tool", 8);
        assert_eq!(config.reserved_attribute_prefix(), "data-mytool");
    }
}
