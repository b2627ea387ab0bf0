//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Cache staleness windows
pub const DEFAULT_EVENT_STALENESS_SECS: u64 = 60 * 60;
pub const DEFAULT_PATTERN_STALENESS_SECS: u64 = 24 * 60 * 60;

// Refresh window: first day of the current month through this many months
pub const DEFAULT_WINDOW_MONTHS: u32 = 6;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

// Analyzer tuning
pub const DEFAULT_MIN_OCCURRENCES: usize = 3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const WEEKLY_INTERVAL_DAYS: i64 = 7;
pub const INTERVAL_TOLERANCE_DAYS: i64 = 2;

// Organisation defaults
pub const DEFAULT_TIMEZONE: chrono_tz::Tz = chrono_tz::America::New_York;
pub const DEFAULT_DB_PATH: &str = "data/steeple.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

// Google Calendar
pub const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_PAGE_SIZE: u32 = 250;

// Listing limits
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 500;
