use crate::{
    config::LoaderConfig,
    db::{self, DbPool},
    errors::ServiceError,
    generator::FactKind,
};
use sea_orm::sea_query::{Alias, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbErr, TransactionTrait, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on bind parameters in one statement; SQLite allows 32 766.
const MAX_BIND_PARAMS: usize = 30_000;

/// A CSV file held fully in memory with typed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Empty → NULL, integer → BIGINT, finite decimal → DOUBLE, anything else → text.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(None);
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::BigInt(Some(int));
    }
    match trimmed.parse::<f64>() {
        Ok(float) if float.is_finite() && trimmed.bytes().any(|b| b.is_ascii_digit()) => {
            Value::Double(Some(float))
        }
        _ => Value::String(Some(Box::new(raw.to_string()))),
    }
}

/// Reads a headed CSV file into memory.
pub fn read_csv(path: &Path) -> Result<CsvTable, ServiceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(parse_cell).collect());
    }

    debug!(
        "Read {} rows with {} columns from {}",
        rows.len(),
        headers.len(),
        path.display()
    );
    Ok(CsvTable { headers, rows })
}

/// Result of loading one file; a failure never stops the rest of the run.
#[derive(Debug)]
pub enum FileLoadOutcome {
    Loaded { rows: u64 },
    Missing { path: PathBuf },
    Failed { error: ServiceError },
}

impl FileLoadOutcome {
    pub fn rows_loaded(&self) -> u64 {
        match self {
            FileLoadOutcome::Loaded { rows } => *rows,
            FileLoadOutcome::Missing { .. } => 0,
            FileLoadOutcome::Failed { error } => error.committed_rows().unwrap_or(0),
        }
    }
}

#[derive(Debug)]
pub struct LoadReport {
    pub outcomes: Vec<(FactKind, FileLoadOutcome)>,
    /// Row counts read back from the database after loading
    pub table_counts: Vec<(FactKind, u64)>,
    pub total_rows: u64,
}

/// Batched CSV → table loader with periodic commits.
#[derive(Clone)]
pub struct BulkLoader {
    db_pool: Arc<DbPool>,
    config: LoaderConfig,
}

impl BulkLoader {
    pub fn new(db_pool: Arc<DbPool>, config: LoaderConfig) -> Self {
        Self { db_pool, config }
    }

    /// Inserts every row of `table` into `destination`.
    ///
    /// Rows go in `batch_size` multi-row INSERTs; a commit happens once `commit_every` rows are
    /// pending and at the end. A failing batch rolls back only the uncommitted rows and the
    /// error reports how many rows were already committed.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn load(&self, table: &CsvTable, destination: &str) -> Result<u64, ServiceError> {
        if table.is_empty() {
            info!("No rows to load into {}", destination);
            return Ok(0);
        }

        let columns: Vec<Alias> = table.headers.iter().map(Alias::new).collect();
        let batch_size = self.config.batch_size.max(1);
        let commit_every = self.config.commit_every.max(1) as u64;

        let mut committed: u64 = 0;
        let mut pending: u64 = 0;
        let mut txn = self.db_pool.begin().await?;

        for (batch_no, batch) in table.rows.chunks(batch_size).enumerate() {
            if let Err(source) = insert_rows(&txn, destination, &columns, batch).await {
                error!(
                    "Batch {} into {} failed after {} committed rows: {}",
                    batch_no + 1,
                    destination,
                    committed,
                    source
                );
                if let Err(e) = txn.rollback().await {
                    warn!("Rollback of {} failed: {}", destination, e);
                }
                return Err(ServiceError::BatchInsert {
                    table: destination.to_string(),
                    committed_rows: committed,
                    source,
                });
            }

            pending += batch.len() as u64;
            info!(
                "Inserted batch {} ({} rows) into {}",
                batch_no + 1,
                batch.len(),
                destination
            );

            if pending >= commit_every {
                txn.commit().await?;
                committed += pending;
                pending = 0;
                info!("Committed {} rows into {}", committed, destination);
                txn = self.db_pool.begin().await?;
            }
        }

        txn.commit().await?;
        committed += pending;
        info!("Loaded {} rows into {}", committed, destination);
        Ok(committed)
    }

    /// Reads and loads one file, reporting the outcome instead of failing.
    pub async fn load_file(&self, path: &Path, destination: &str) -> FileLoadOutcome {
        if !path.exists() {
            return FileLoadOutcome::Missing {
                path: path.to_path_buf(),
            };
        }

        let table = match read_csv(path) {
            Ok(table) => table,
            Err(error) => return FileLoadOutcome::Failed { error },
        };

        match self.load(&table, destination).await {
            Ok(rows) => FileLoadOutcome::Loaded { rows },
            Err(error) => FileLoadOutcome::Failed { error },
        }
    }

    /// Loads `<input_dir>/<table>.csv` for each kind, then reads back the table counts.
    pub async fn load_all(&self, kinds: &[FactKind]) -> Result<LoadReport, ServiceError> {
        let mut outcomes = Vec::with_capacity(kinds.len());

        for kind in kinds {
            let path = self.config.input_dir.join(kind.file_name());
            let table = kind.table_name();
            info!("Loading {} into {}", path.display(), table);

            let outcome = self.load_file(&path, table).await;
            match &outcome {
                FileLoadOutcome::Loaded { rows } => info!("{}: loaded {} rows", table, rows),
                FileLoadOutcome::Missing { path } => {
                    warn!("{}: {} not found, skipping", table, path.display())
                }
                FileLoadOutcome::Failed { error } => error!("{}: load failed: {}", table, error),
            }
            outcomes.push((*kind, outcome));
        }

        let mut table_counts = Vec::with_capacity(kinds.len());
        let mut total_rows = 0;
        for kind in kinds {
            let count = db::count_rows(&*self.db_pool, kind.table_name()).await?;
            info!("{}: {} rows", kind.table_name(), count);
            total_rows += count;
            table_counts.push((*kind, count));
        }
        info!("Total fact rows: {}", total_rows);

        Ok(LoadReport {
            outcomes,
            table_counts,
            total_rows,
        })
    }
}

/// One logical batch, split into as many statements as the bind-parameter limit needs.
async fn insert_rows(
    txn: &DatabaseTransaction,
    destination: &str,
    columns: &[Alias],
    rows: &[Vec<Value>],
) -> Result<(), DbErr> {
    let rows_per_statement = (MAX_BIND_PARAMS / columns.len().max(1)).max(1);
    let backend = txn.get_database_backend();

    for chunk in rows.chunks(rows_per_statement) {
        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(destination))
            .columns(columns.iter().cloned());

        for row in chunk {
            insert
                .values(row.iter().cloned().map(SimpleExpr::from))
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        txn.execute(backend.build(&insert)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cells_are_typed() {
        assert_eq!(parse_cell(""), Value::String(None));
        assert_eq!(parse_cell("1042"), Value::BigInt(Some(1042)));
        assert_eq!(parse_cell("-3"), Value::BigInt(Some(-3)));
        assert_eq!(parse_cell("12.50"), Value::Double(Some(12.5)));
        assert_eq!(
            parse_cell("L00001"),
            Value::String(Some(Box::new("L00001".to_string())))
        );
        assert_eq!(
            parse_cell("NaN"),
            Value::String(Some(Box::new("NaN".to_string())))
        );
    }

    #[test]
    fn read_csv_keeps_header_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date_key,order_id,order_unit_price").unwrap();
        writeln!(file, "15,S00000,31.25").unwrap();
        writeln!(file, "16,S00001,").unwrap();

        let table = read_csv(file.path()).unwrap();
        assert_eq!(table.headers, ["date_key", "order_id", "order_unit_price"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1][2], Value::String(None));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2,3").unwrap();

        assert!(matches!(read_csv(file.path()), Err(ServiceError::Csv(_))));
    }
}
