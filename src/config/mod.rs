//! # Configuration Module
//!
//! This module centralizes all configuration constants and tunable limits for
//! pagebus. Constants are grouped by functional area and interdependencies are
//! documented where they exist.
//!
//! ## Why Centralization?
//!
//! The timing model, the property ranges, and the quota limits are consulted
//! from several subsystems (the state machine, the paged store, the registry).
//! Co-locating them prevents the value used to validate a connection from
//! drifting away from the value used to run it.
//!
//! ## Module Organization
//!
//! - [`constants`]: Numeric configuration values with dependency documentation
//! - [`QuotaLimits`]: Per-deployment resource limits with sane defaults

pub mod constants;
pub use constants::*;

/// Resource limits enforced by the registry and the paged store.
///
/// The limits are checked against on-disk reality (a directory walk of the
/// owner sandbox) rather than incrementally tracked counters, so they stay
/// consistent with concurrent external tooling at the cost of O(files) per
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    /// Maximum length in bytes any single backing file may grow to.
    pub max_file_size: u64,
    /// Maximum total bytes of recognized data files under one owner sandbox.
    pub max_total_space: u64,
    /// Maximum number of recognized data files under one owner sandbox.
    pub max_file_count: u32,
    /// Maximum number of concurrently enabled connections per owner.
    pub max_enabled_connections: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_total_space: DEFAULT_MAX_TOTAL_SPACE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            max_enabled_connections: DEFAULT_MAX_ENABLED_CONNECTIONS,
        }
    }
}
