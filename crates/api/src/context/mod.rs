//! Application context - dependency injection container

use std::sync::Arc;

use steeple_common::time::{Clock, SystemClock};
use steeple_core::{
    CalendarService, EventCache, EventCacheSettings, PatternAnalyzer, PatternCache,
    PatternCacheSettings, ReconciliationService,
};
use steeple_domain::{Config, Result};
use steeple_infra::database::{
    DbManager, SqliteDirectory, SqliteEventSnapshotRepository, SqliteInstanceOverrideRepository,
    SqlitePatternRepository, SqliteRefreshLogRepository,
};
use steeple_infra::{config, create_event_source};
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub calendar: Arc<CalendarService>,
    pub admin: Arc<ReconciliationService>,
    /// Concrete directory, so operators can register ministries and
    /// special event types
    pub directory: Arc<SqliteDirectory>,
}

impl AppContext {
    /// Create a context from `STEEPLE_*` variables or a config file
    pub fn new() -> Result<Self> {
        Self::new_with_config(config::load()?)
    }

    /// Create a context from an explicit configuration using the system clock
    pub fn new_with_config(config: Config) -> Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock))
    }

    /// Create a context with a caller-supplied clock.
    ///
    /// Tests use this with a `MockClock` to pin "today".
    pub fn new_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let source = create_event_source(&config.calendar)?;
        let event_cache = EventCache::new(
            source,
            Arc::new(SqliteEventSnapshotRepository::new(Arc::clone(&db))),
            Arc::new(SqliteRefreshLogRepository::new(Arc::clone(&db))),
            Arc::clone(&clock),
            EventCacheSettings::from_config(&config),
        );
        let pattern_cache = PatternCache::new(
            PatternAnalyzer::new(config.calendar.timezone, config.analyzer),
            Arc::new(SqlitePatternRepository::new(Arc::clone(&db))),
            Arc::clone(&clock),
            PatternCacheSettings::from_config(&config),
        );
        let calendar = Arc::new(CalendarService::new(event_cache, pattern_cache, clock));

        let directory = Arc::new(SqliteDirectory::new(Arc::clone(&db)));
        let admin = Arc::new(ReconciliationService::new(
            Arc::clone(&calendar),
            directory.clone(),
            Arc::new(SqliteInstanceOverrideRepository::new(Arc::clone(&db))),
        ));

        info!(
            provider = ?config.calendar.provider,
            timezone = %config.calendar.timezone,
            database = %db.path().display(),
            "Application context initialised"
        );

        Ok(Self { config, db, calendar, admin, directory })
    }

    /// Check health of the database and the calendar provider
    ///
    /// The provider counts as healthy until a refresh has failed; its most
    /// recent refresh decides.
    pub async fn health_check(&self) -> HealthStatus {
        let mut status = HealthStatus::new()
            .add_component(self.check_database_health().await)
            .add_component(self.check_provider_health().await);
        status.calculate_score();
        status
    }

    /// Uses spawn_blocking so the pool checkout never blocks the runtime.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed");
                ComponentHealth::unhealthy("database", e.to_string())
            }
            Err(e) => {
                warn!(error = %e, "database health check task panicked");
                ComponentHealth::unhealthy("database", format!("task panic: {e}"))
            }
        }
    }

    async fn check_provider_health(&self) -> ComponentHealth {
        match self.calendar.recent_refreshes(1).await {
            Ok(records) => match records.first() {
                Some(last) if !last.succeeded => ComponentHealth::unhealthy(
                    "calendar_provider",
                    last.error_message.clone().unwrap_or_else(|| "last refresh failed".into()),
                ),
                Some(_) => ComponentHealth::healthy("calendar_provider"),
                None => ComponentHealth::healthy("calendar_provider")
                    .with_message("no refresh has run yet"),
            },
            Err(e) => ComponentHealth::unhealthy("calendar_provider", e.to_string()),
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("provider", &self.config.calendar.provider)
            .field("database", &self.db.path())
            .finish_non_exhaustive()
    }
}

