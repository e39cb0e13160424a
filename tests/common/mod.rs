#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use library_dw::{
    calendar::PatternTable,
    config::{AppConfig, HolidayConfig, LoaderConfig},
    db::{self, DbPool},
    services::calendar_seed::CalendarSeeder,
};
use tempfile::TempDir;

/// Helper harness backed by a migrated, file-backed SQLite database in a temp directory.
pub struct TestDb {
    pub pool: Arc<DbPool>,
    pub config: AppConfig,
    dir: TempDir,
}

impl TestDb {
    /// Construct a fresh database with every migration applied.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        let mut config = AppConfig::default();
        config.database_url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("warehouse.db").display()
        );
        config.db_max_connections = 1;
        config.db_min_connections = 1;
        config.loader = LoaderConfig {
            input_dir: dir.path().to_path_buf(),
            ..LoaderConfig::default()
        };

        let pool = db::establish_connection_with_config(&(&config).into())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        Self {
            pool: Arc::new(pool),
            config,
            dir,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn holiday_config(&self) -> HolidayConfig {
        self.config.holidays.clone()
    }

    /// Seeds `days` calendar rows starting on `start`.
    pub async fn seed_calendar(&self, start: NaiveDate, days: u32) {
        CalendarSeeder::new(self.pool.clone(), &PatternTable::PRIMARY)
            .seed(start, days, false)
            .await
            .expect("failed to seed calendar");
    }

    pub async fn count(&self, table: &str) -> u64 {
        db::count_rows(&*self.pool, table)
            .await
            .expect("count failed")
    }
}
