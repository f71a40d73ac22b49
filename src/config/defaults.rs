//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Database Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "venus.db".to_string()
}

pub fn default_max_connections() -> u32 {
    5
}

// =============================================================================
// Cache Defaults
// =============================================================================

pub fn default_init_capacity() -> usize {
    1024
}

pub fn default_max_capacity() -> u64 {
    100_000
}

pub fn default_redis_scan_count() -> usize {
    100
}

// =============================================================================
// Report Defaults
// =============================================================================

pub fn default_scheduled_delay() -> u64 {
    1_000
}

pub fn default_report_timeout() -> u64 {
    5_000
}

pub fn default_poll_interval() -> u64 {
    500
}

pub fn default_report_size() -> usize {
    100
}

// =============================================================================
// Metrics Defaults
// =============================================================================

pub fn default_metrics_port() -> u16 {
    9090
}

pub fn default_scrape_path() -> String {
    "/metrics".to_string()
}

pub fn default_cache_metrics_period() -> u64 {
    15
}

// =============================================================================
// Log / Link Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_expires_days() -> u32 {
    365
}
