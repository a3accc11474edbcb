//! Discovery configuration.

use std::time::Duration;

/// How long a failed discovery suppresses new attempts for that identifier.
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(10);

/// Only network whose prove-post references predate the current store.
pub const DEFAULT_LEGACY_NETWORK: &str = "facebook.com";

/// Configuration for [`KeyDiscoveryCoordinator`](crate::KeyDiscoveryCoordinator)
/// and the prove-post strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Suppression window after every strategy failed for an identifier.
    pub negative_ttl: Duration,
    /// Network namespace whose identifiers may have a legacy prove-post
    /// record. `None` disables the legacy fallback.
    pub legacy_network: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            negative_ttl: DEFAULT_NEGATIVE_TTL,
            legacy_network: Some(DEFAULT_LEGACY_NETWORK.to_string()),
        }
    }
}
