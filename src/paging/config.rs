//! Paging controller configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Whether positions far from the viewport are dropped from the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eviction {
    /// Drop positions outside the retention range on each rebuild.
    #[default]
    Enabled,
    /// Keep every loaded position resident.
    Disabled,
}

/// Tuning knobs for the paging controller.
///
/// Durations are expressed in milliseconds so the configuration file stays
/// plain JSON.
///
/// # Examples
///
/// ```
/// use scrollback::paging::config::{Eviction, PagingConfig};
///
/// let config = PagingConfig::default();
/// assert_eq!(config.page_size, 50);
///
/// let small = PagingConfig::full_residency();
/// assert_eq!(small.eviction, Eviction::Disabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Positions per page; also the default viewport length.
    pub page_size: u64,
    /// Positions materialised beyond each edge of the visible range.
    pub prefetch_distance: u64,
    /// Extra pages retained beyond the materialised range before eviction.
    pub buffer_pages: u64,
    /// Eviction policy.
    pub eviction: Eviction,
    /// Quiet window for coalescing visible-range updates.
    pub debounce_ms: u64,
    /// How long an unknown message stays "loading" before it is reported
    /// unavailable.
    pub unavailable_timeout_ms: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            prefetch_distance: 25,
            buffer_pages: 2,
            eviction: Eviction::Enabled,
            debounce_ms: 120,
            unavailable_timeout_ms: 15_000,
        }
    }
}

impl PagingConfig {
    /// Configuration for conversations small enough to keep fully resident.
    #[must_use]
    pub fn full_residency() -> Self {
        Self {
            eviction: Eviction::Disabled,
            ..Self::default()
        }
    }

    /// Returns the debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Returns the unavailable timeout.
    #[must_use]
    pub const fn unavailable_timeout(&self) -> Duration {
        Duration::from_millis(self.unavailable_timeout_ms)
    }

    /// Returns the number of positions retained around the materialised
    /// range.
    #[must_use]
    pub const fn retention_margin(&self) -> u64 {
        self.buffer_pages.saturating_mul(self.page_size)
    }
}
