//! Canonical default values shared across client and server.

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE: &str = "farm.db";
pub const DEFAULT_SYSTEM_TYPE: &str = "forcad";
pub const DEFAULT_FLAG_FORMAT: &str = "[A-Z0-9]{31}=";
pub const DEFAULT_FLAG_LIFETIME_TICKS: i64 = 10;
pub const DEFAULT_TICK_DURATION_SECS: i64 = 60;
pub const DEFAULT_SUBMIT_PERIOD_SECS: i64 = 5;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BATCH_LIMIT: i64 = 2000;
pub const DEFAULT_TCP_PORT: u16 = 1337;

pub const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FAILURE_THRESHOLD: i64 = 4;
pub const DEFAULT_MAX_FAILURES: i64 = 12;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 10;

pub const SWEEP_INTERVAL_SECS: u64 = 7;
pub const SUBMIT_BACKOFF_SECS: u64 = 5;
pub const SESSION_LIFETIME_SECS: i64 = 72 * 60 * 60;
pub const SESSION_COOKIE_NAME: &str = "farm_session";

/// Message the expiry sweeper writes into `system_message` (§4.1).
pub const EXPIRED_MESSAGE: &str = "Expired";
