use crate::{
    calendar::PatternTable,
    db::DbPool,
    entities::date_dim,
    errors::ServiceError,
};
use chrono::{Duration, NaiveDate};
use sea_orm::{EntityTrait, PaginatorTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};

const SEED_INSERT_CHUNK: usize = 1_000;

/// Fills `date_dim` with one row per date key, phase included.
#[derive(Clone)]
pub struct CalendarSeeder {
    db_pool: Arc<DbPool>,
    pattern: &'static PatternTable,
}

impl CalendarSeeder {
    pub fn new(db_pool: Arc<DbPool>, pattern: &'static PatternTable) -> Self {
        Self { db_pool, pattern }
    }

    /// Rows for keys `1..=days`, key `k` falling on `start_date + (k - 1)` days.
    pub fn rows(
        &self,
        start_date: NaiveDate,
        days: u32,
    ) -> Result<Vec<date_dim::ActiveModel>, ServiceError> {
        (1..=days)
            .map(|key| {
                let cal_date = start_date
                    .checked_add_signed(Duration::days(i64::from(key) - 1))
                    .ok_or_else(|| {
                        ServiceError::InvalidInput(format!(
                            "date key {} overflows the calendar from {}",
                            key, start_date
                        ))
                    })?;
                let date_key = i32::try_from(key).map_err(|_| {
                    ServiceError::InvalidInput(format!("date key {} out of range", key))
                })?;

                Ok(date_dim::ActiveModel {
                    date_key: Set(date_key),
                    cal_date: Set(cal_date),
                    academic_phase: Set(self.pattern.classify(key).to_string()),
                    holiday_ind: Set("N".to_string()),
                    festive_event: Set(None),
                })
            })
            .collect()
    }

    /// Inserts the calendar in one transaction. An already populated table is only
    /// overwritten when `replace` is set.
    #[instrument(skip(self))]
    pub async fn seed(
        &self,
        start_date: NaiveDate,
        days: u32,
        replace: bool,
    ) -> Result<u64, ServiceError> {
        let existing = date_dim::Entity::find().count(&*self.db_pool).await?;
        if existing > 0 && !replace {
            return Err(ServiceError::InvalidInput(format!(
                "date_dim already holds {} rows; use replace to rebuild it",
                existing
            )));
        }

        let rows = self.rows(start_date, days)?;
        let txn = self.db_pool.begin().await?;

        if existing > 0 {
            let deleted = date_dim::Entity::delete_many().exec(&txn).await?;
            info!("Removed {} existing calendar rows", deleted.rows_affected);
        }

        let mut inserted: u64 = 0;
        for chunk in rows.chunks(SEED_INSERT_CHUNK) {
            date_dim::Entity::insert_many(chunk.to_vec())
                .exec(&txn)
                .await?;
            inserted += chunk.len() as u64;
        }

        txn.commit().await?;
        info!(
            "Seeded {} calendar rows starting {}",
            inserted, start_date
        );
        Ok(inserted)
    }
}
