use crate::{
    calendar::{calendar_from_config, HolidayCalendar, HolidayMap, LayeredCalendar},
    config::HolidayConfig,
    db::DbPool,
    entities::date_dim,
    errors::{is_missing_object, ServiceError},
};
use chrono::Datelike;
use sea_orm::sea_query::{Alias, ColumnDef, Query, Table};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, EntityTrait, QueryOrder, Statement, TransactionTrait,
};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const STAGE_INSERT_CHUNK: usize = 1_000;

/// Holiday attributes for one calendar row, as staged before the merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolidayProjection {
    pub date_key: i32,
    pub holiday_ind: &'static str,
    pub festive_event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayUpdateSummary {
    pub calendar_rows: usize,
    pub holiday_days: usize,
    pub updated_rows: u64,
    pub years: Option<RangeInclusive<i32>>,
}

/// Left-joins `holidays` onto calendar rows by date.
pub fn project_holidays(
    rows: &[date_dim::Model],
    holidays: &HolidayMap,
    event_max_len: usize,
) -> Vec<HolidayProjection> {
    rows.iter()
        .map(|row| match holidays.get(&row.cal_date) {
            Some(name) => HolidayProjection {
                date_key: row.date_key,
                holiday_ind: "Y",
                festive_event: name.chars().take(event_max_len).collect(),
            },
            None => HolidayProjection {
                date_key: row.date_key,
                holiday_ind: "N",
                festive_event: String::new(),
            },
        })
        .collect()
}

/// Refreshes `date_dim.holiday_ind` and `festive_event` through a staging table.
pub struct HolidayUpdater<C = LayeredCalendar> {
    db_pool: Arc<DbPool>,
    calendar: C,
    config: HolidayConfig,
}

impl HolidayUpdater<LayeredCalendar> {
    pub fn from_config(db_pool: Arc<DbPool>, config: HolidayConfig) -> Result<Self, ServiceError> {
        let calendar = calendar_from_config(&config)?;
        Ok(Self::new(db_pool, calendar, config))
    }
}

impl<C: HolidayCalendar> HolidayUpdater<C> {
    pub fn new(db_pool: Arc<DbPool>, calendar: C, config: HolidayConfig) -> Self {
        Self {
            db_pool,
            calendar,
            config,
        }
    }

    /// Runs the whole merge in one transaction; any failure rolls it back.
    #[instrument(skip(self), fields(staging_table = %self.config.staging_table))]
    pub async fn update_holidays(&self) -> Result<HolidayUpdateSummary, ServiceError> {
        let rows = date_dim::Entity::find()
            .order_by_asc(date_dim::Column::DateKey)
            .all(&*self.db_pool)
            .await?;

        let (first, last) = match (
            rows.iter().map(|r| r.cal_date).min(),
            rows.iter().map(|r| r.cal_date).max(),
        ) {
            (Some(first), Some(last)) => (first.year(), last.year()),
            _ => {
                warn!("date_dim is empty; nothing to update");
                return Ok(HolidayUpdateSummary::default());
            }
        };
        info!("Read {} calendar rows spanning {}..={}", rows.len(), first, last);

        let holidays = self.calendar.holidays(first..=last);
        let projection = project_holidays(&rows, &holidays, self.config.event_max_len);
        let holiday_days = projection.iter().filter(|p| p.holiday_ind == "Y").count();
        info!(
            "Matched {} holiday dates ({} calendar entries)",
            holiday_days,
            holidays.len()
        );

        let txn = self.db_pool.begin().await?;
        let updated_rows = match self.merge(&txn, &projection).await {
            Ok(updated) => updated,
            Err(e) => {
                error!("Holiday update failed: {}", e);
                match txn.rollback().await {
                    Ok(()) => warn!("Holiday update transaction rolled back"),
                    Err(rb) => error!("Rollback failed: {}", rb),
                }
                return Err(e);
            }
        };
        txn.commit().await?;
        info!("Holiday update committed: {} rows updated", updated_rows);

        Ok(HolidayUpdateSummary {
            calendar_rows: rows.len(),
            holiday_days,
            updated_rows,
            years: Some(first..=last),
        })
    }

    async fn merge(
        &self,
        txn: &DatabaseTransaction,
        projection: &[HolidayProjection],
    ) -> Result<u64, ServiceError> {
        let stage = self.config.staging_table.as_str();

        drop_staging_if_present(txn, stage).await?;
        self.create_staging(txn).await?;
        insert_staging(txn, stage, projection).await?;

        let sql = merge_sql(stage);
        debug!("Merging staged holidays: {}", sql);
        let result = txn
            .execute(Statement::from_string(txn.get_database_backend(), sql))
            .await?;
        info!("Merged {} rows from {}", result.rows_affected(), stage);

        let drop_stage = Table::drop().table(Alias::new(stage)).to_owned();
        txn.execute(txn.get_database_backend().build(&drop_stage))
            .await?;
        info!("Dropped staging table {}", stage);

        Ok(result.rows_affected())
    }

    async fn create_staging(&self, txn: &DatabaseTransaction) -> Result<(), ServiceError> {
        let stage = self.config.staging_table.as_str();
        let create = Table::create()
            .table(Alias::new(stage))
            .col(
                ColumnDef::new(Alias::new("date_key"))
                    .integer()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(Alias::new("holiday_ind"))
                    .string_len(1)
                    .not_null(),
            )
            .col(
                ColumnDef::new(Alias::new("festive_event"))
                    .string_len(self.config.event_max_len as u32)
                    .null(),
            )
            .to_owned();

        let backend = txn.get_database_backend();
        txn.execute(backend.build(&create)).await?;
        info!("Created staging table {}", stage);
        Ok(())
    }
}

/// Drops `stage` under a savepoint, treating "table does not exist" as success.
pub async fn drop_staging_if_present(
    txn: &DatabaseTransaction,
    stage: &str,
) -> Result<(), ServiceError> {
    let savepoint = txn.begin().await?;
    let backend = savepoint.get_database_backend();
    let drop_stage = Table::drop().table(Alias::new(stage)).to_owned();

    match savepoint.execute(backend.build(&drop_stage)).await {
        Ok(_) => {
            savepoint.commit().await?;
            info!("Dropped leftover staging table {}", stage);
            Ok(())
        }
        Err(e) if is_missing_object(&e) => {
            savepoint.rollback().await?;
            debug!("Staging table {} not present", stage);
            Ok(())
        }
        Err(e) => {
            if let Err(rb) = savepoint.rollback().await {
                warn!("Savepoint rollback failed: {}", rb);
            }
            Err(e.into())
        }
    }
}

async fn insert_staging(
    txn: &DatabaseTransaction,
    stage: &str,
    projection: &[HolidayProjection],
) -> Result<(), ServiceError> {
    let backend = txn.get_database_backend();

    for chunk in projection.chunks(STAGE_INSERT_CHUNK) {
        let mut insert = Query::insert();
        insert.into_table(Alias::new(stage)).columns([
            Alias::new("date_key"),
            Alias::new("holiday_ind"),
            Alias::new("festive_event"),
        ]);
        for row in chunk {
            insert.values([
                row.date_key.into(),
                row.holiday_ind.into(),
                row.festive_event.clone().into(),
            ])?;
        }
        txn.execute(backend.build(&insert)).await?;
    }

    info!("Staged {} rows into {}", projection.len(), stage);
    Ok(())
}

/// Update-only merge keyed on `date_key`; PostgreSQL and SQLite share `UPDATE ... FROM`.
fn merge_sql(stage: &str) -> String {
    format!(
        "UPDATE \"date_dim\" SET \"holiday_ind\" = s.\"holiday_ind\", \
         \"festive_event\" = s.\"festive_event\" FROM \"{stage}\" AS s \
         WHERE \"date_dim\".\"date_key\" = s.\"date_key\""
    )
}

/// Builds the configured calendar and runs the merge.
pub async fn run_holiday_update(
    db_pool: Arc<DbPool>,
    config: &HolidayConfig,
) -> Result<HolidayUpdateSummary, ServiceError> {
    HolidayUpdater::from_config(db_pool, config.clone())?
        .update_holidays()
        .await
}
