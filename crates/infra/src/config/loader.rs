//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Searches several paths for a config file
//! 4. Supports JSON and TOML formats
//!
//! Whichever source wins, the result is checked with [`Config::validate`].
//!
//! ## Environment Variables
//! Required (otherwise the file is used):
//! - `STEEPLE_DB_PATH`: Database file path
//! - `STEEPLE_CALENDAR_PROVIDER`: `google` or `seed`
//!
//! Optional (defaults from [`Config::default`]):
//! - `STEEPLE_DB_POOL_SIZE`, `STEEPLE_DB_BUSY_TIMEOUT_MS`
//! - `STEEPLE_CALENDAR_ID`, `STEEPLE_GOOGLE_CLIENT_ID`,
//!   `STEEPLE_GOOGLE_CLIENT_SECRET`, `STEEPLE_GOOGLE_REFRESH_TOKEN`,
//!   `STEEPLE_GOOGLE_API_BASE`, `STEEPLE_GOOGLE_TOKEN_URL`, `STEEPLE_SEED_FILE`
//! - `STEEPLE_TIMEZONE`: IANA name such as `America/Chicago`
//! - `STEEPLE_FETCH_TIMEOUT_SECS`, `STEEPLE_WINDOW_MONTHS`
//! - `STEEPLE_EVENT_STALENESS_SECS`, `STEEPLE_PATTERN_STALENESS_SECS`
//! - `STEEPLE_MIN_OCCURRENCES`, `STEEPLE_CONFIDENCE_THRESHOLD`
//! - `STEEPLE_BIND_ADDR`, `STEEPLE_LOG_JSON`
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./steeple.json` or `./steeple.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use steeple_domain::{CalendarProviderKind, Config, Result, SteepleError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `SteepleError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<Config> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SteepleError::Config` if required variables are missing or a
/// value does not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("STEEPLE_DB_PATH")?;
    config.calendar.provider = env_var("STEEPLE_CALENDAR_PROVIDER").and_then(|s| {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(CalendarProviderKind::Google),
            "seed" => Ok(CalendarProviderKind::Seed),
            other => Err(SteepleError::Config(format!("Invalid calendar provider: {other}"))),
        }
    })?;

    if let Some(size) = env_parse::<u32>("STEEPLE_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }
    if let Some(ms) = env_parse::<u64>("STEEPLE_DB_BUSY_TIMEOUT_MS")? {
        config.database.busy_timeout_ms = ms;
    }

    if let Some(id) = env_opt("STEEPLE_CALENDAR_ID") {
        config.calendar.calendar_id = id;
    }
    config.calendar.client_id = env_opt("STEEPLE_GOOGLE_CLIENT_ID");
    config.calendar.client_secret = env_opt("STEEPLE_GOOGLE_CLIENT_SECRET");
    config.calendar.refresh_token = env_opt("STEEPLE_GOOGLE_REFRESH_TOKEN");
    if let Some(base) = env_opt("STEEPLE_GOOGLE_API_BASE") {
        config.calendar.api_base_url = base;
    }
    if let Some(url) = env_opt("STEEPLE_GOOGLE_TOKEN_URL") {
        config.calendar.token_url = url;
    }
    config.calendar.seed_file = env_opt("STEEPLE_SEED_FILE");
    if let Some(tz) = env_opt("STEEPLE_TIMEZONE") {
        config.calendar.timezone = Tz::from_str(tz.trim())
            .map_err(|e| SteepleError::Config(format!("Invalid timezone {tz}: {e}")))?;
    }
    if let Some(secs) = env_parse::<u64>("STEEPLE_FETCH_TIMEOUT_SECS")? {
        config.calendar.fetch_timeout_secs = secs;
    }
    if let Some(months) = env_parse::<u32>("STEEPLE_WINDOW_MONTHS")? {
        config.calendar.window_months = months;
    }

    if let Some(secs) = env_parse::<u64>("STEEPLE_EVENT_STALENESS_SECS")? {
        config.cache.event_staleness_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("STEEPLE_PATTERN_STALENESS_SECS")? {
        config.cache.pattern_staleness_secs = secs;
    }

    if let Some(min) = env_parse::<usize>("STEEPLE_MIN_OCCURRENCES")? {
        config.analyzer.min_occurrences = min;
    }
    if let Some(threshold) = env_parse::<f64>("STEEPLE_CONFIDENCE_THRESHOLD")? {
        config.analyzer.confidence_threshold = threshold;
    }

    if let Some(addr) = env_opt("STEEPLE_BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    config.server.log_json = env_bool("STEEPLE_LOG_JSON", false);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches several locations for a config file.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `SteepleError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SteepleError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            SteepleError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SteepleError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SteepleError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SteepleError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(SteepleError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search several paths for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    const NAMES: [&str; 8] = [
        "config.json",
        "config.toml",
        "steeple.json",
        "steeple.toml",
        "../config.json",
        "../config.toml",
        "../../config.json",
        "../../config.toml",
    ];

    let mut roots = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        SteepleError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; blank counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Optional environment variable parsed into `T`
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SteepleError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use once_cell::sync::Lazy;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 5] = [
        "STEEPLE_DB_PATH",
        "STEEPLE_CALENDAR_PROVIDER",
        "STEEPLE_SEED_FILE",
        "STEEPLE_TIMEZONE",
        "STEEPLE_DB_POOL_SIZE",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("STEEPLE_TEST_BOOL_YES", "yes");
        std::env::set_var("STEEPLE_TEST_BOOL_UPPER", "TRUE");
        std::env::set_var("STEEPLE_TEST_BOOL_OFF", "off");

        assert!(env_bool("STEEPLE_TEST_BOOL_YES", false));
        assert!(env_bool("STEEPLE_TEST_BOOL_UPPER", false));
        assert!(!env_bool("STEEPLE_TEST_BOOL_OFF", true));

        std::env::remove_var("STEEPLE_TEST_BOOL_MISSING");
        assert!(env_bool("STEEPLE_TEST_BOOL_MISSING", true));

        std::env::remove_var("STEEPLE_TEST_BOOL_YES");
        std::env::remove_var("STEEPLE_TEST_BOOL_UPPER");
        std::env::remove_var("STEEPLE_TEST_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_with_seed_provider() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STEEPLE_DB_PATH", "/tmp/steeple-test.db");
        std::env::set_var("STEEPLE_CALENDAR_PROVIDER", "Seed");
        std::env::set_var("STEEPLE_SEED_FILE", "demo/parish.json");
        std::env::set_var("STEEPLE_TIMEZONE", "America/Chicago");
        std::env::set_var("STEEPLE_DB_POOL_SIZE", "3");

        let config = load_from_env().unwrap();
        assert_eq!(config.database.path, "/tmp/steeple-test.db");
        assert_eq!(config.database.pool_size, 3);
        assert_eq!(config.calendar.provider, CalendarProviderKind::Seed);
        assert_eq!(config.calendar.seed_file.as_deref(), Some("demo/parish.json"));
        assert_eq!(config.calendar.timezone, chrono_tz::America::Chicago);
        assert_eq!(config.cache.event_staleness_secs, 3600);
        assert!(config.validate().is_ok());

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, SteepleError::Config(msg) if msg.contains("STEEPLE_DB_PATH")));
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STEEPLE_DB_PATH", "/tmp/steeple-test.db");
        std::env::set_var("STEEPLE_CALENDAR_PROVIDER", "outlook");
        assert!(matches!(load_from_env(), Err(SteepleError::Config(_))));

        std::env::set_var("STEEPLE_CALENDAR_PROVIDER", "google");
        std::env::set_var("STEEPLE_DB_POOL_SIZE", "not-a-number");
        assert!(matches!(load_from_env(), Err(SteepleError::Config(_))));

        std::env::remove_var("STEEPLE_DB_POOL_SIZE");
        std::env::set_var("STEEPLE_TIMEZONE", "Mars/Olympus");
        assert!(matches!(load_from_env(), Err(SteepleError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(SteepleError::Config(_))));
    }

    #[test]
    fn test_parse_config_json() {
        let json_content = r#"{
            "database": { "path": "test.db", "pool_size": 4 },
            "calendar": { "provider": "seed", "seed_file": "seed.json" }
        }"#;

        let config = parse_config(json_content, &PathBuf::from("test.json")).unwrap();
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.calendar.provider, CalendarProviderKind::Seed);
        assert_eq!(config.analyzer.min_occurrences, 3);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_content = r#"
[database]
path = "test.db"

[cache]
event_staleness_secs = 600

[server]
log_json = true
"#;

        let config = parse_config(toml_content, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(config.cache.event_staleness_secs, 600);
        assert_eq!(config.cache.pattern_staleness_secs, 86_400);
        assert!(config.server.log_json);
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }
}
