use crate::config::AppConfig;
use crate::errors::{AppError, ServiceError};
use sea_orm::sea_query::{Alias, Asterisk, Expr, Query};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    /// Untuned single-connection settings, used when the pooled connection cannot be made.
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
///
/// # Errors
/// Returns an `AppError` if the connection cannot be established
pub async fn establish_connection(database_url: &str) -> Result<DbPool, AppError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns an `AppError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, AppError> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt)
        .await
        .map_err(AppError::DatabaseError)?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// One named way of reaching the database.
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    pub label: String,
    pub config: DbConfig,
}

impl ConnectAttempt {
    pub fn new(label: impl Into<String>, config: DbConfig) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }
}

/// Which attempt produced the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    Primary,
    Fallback {
        label: String,
        primary_error: String,
    },
}

#[derive(Debug)]
pub struct Connected {
    pub pool: DbPool,
    pub outcome: ConnectOutcome,
}

/// The tuned pool first, then a direct connection to the fallback URL.
pub fn connect_attempts(cfg: &AppConfig) -> Vec<ConnectAttempt> {
    vec![
        ConnectAttempt::new("primary", DbConfig::from(cfg)),
        ConnectAttempt::new("direct", DbConfig::direct(cfg.fallback_database_url())),
    ]
}

/// Tries each attempt in order and returns the first pool that answers a ping.
pub async fn connect_with_fallback(attempts: &[ConnectAttempt]) -> Result<Connected, AppError> {
    let mut failures: Vec<(String, String)> = Vec::new();

    for (position, attempt) in attempts.iter().enumerate() {
        info!("Connecting to database ({} connection)", attempt.label);

        let result = match establish_connection_with_config(&attempt.config).await {
            Ok(pool) => check_connection(&pool).await.map(|_| pool),
            Err(e) => Err(e),
        };

        match result {
            Ok(pool) => {
                if position == 0 {
                    return Ok(Connected {
                        pool,
                        outcome: ConnectOutcome::Primary,
                    });
                }
                warn!(
                    "Using {} connection after earlier attempts failed",
                    attempt.label
                );
                let primary_error = failures
                    .first()
                    .map(|(_, e)| e.clone())
                    .unwrap_or_default();
                return Ok(Connected {
                    pool,
                    outcome: ConnectOutcome::Fallback {
                        label: attempt.label.clone(),
                        primary_error,
                    },
                });
            }
            Err(e) => {
                warn!("{} connection failed: {}", attempt.label, e);
                failures.push((attempt.label.clone(), e.to_string()));
            }
        }
    }

    let summary = if failures.is_empty() {
        "no connection attempts configured".to_string()
    } else {
        failures
            .iter()
            .map(|(label, e)| format!("{label}: {e}"))
            .collect::<Vec<_>>()
            .join("; ")
    };
    error!("All database connection attempts failed: {}", summary);
    Err(ServiceError::ConnectionFailed(summary))
}

/// Runs database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()));

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Reverts every applied migration
pub async fn rollback_migrations(pool: &DbPool) -> Result<(), AppError> {
    info!("Rolling back database migrations");

    crate::migrator::Migrator::down(pool, None)
        .await
        .map_err(|e| {
            error!("Migration rollback failed: {}", e);
            ServiceError::MigrationError(e.to_string())
        })?;

    info!("Database migrations rolled back");
    Ok(())
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), AppError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(AppError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => debug!("Database connection check successful in {:?}", elapsed),
        Err(e) => error!(
            "Database connection check failed after {:?}: {}",
            elapsed, e
        ),
    }

    result
}

/// `SELECT COUNT(*)` of a table
pub async fn count_rows<C: ConnectionTrait>(db: &C, table: &str) -> Result<u64, AppError> {
    let stmt = Query::select()
        .expr(Expr::col(Asterisk).count())
        .from(Alias::new(table))
        .to_owned();

    let row = db
        .query_one(db.get_database_backend().build(&stmt))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("row count of {table}")))?;

    let count: i64 = row.try_get_by_index(0)?;
    Ok(count.max(0) as u64)
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), AppError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(AppError::DatabaseError)
}
