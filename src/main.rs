use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use strum::IntoEnumIterator;
use tracing::{debug, error, info, warn};

use library_dw::{
    config::{self, AppConfig},
    db::{self, ConnectOutcome, DbPool},
    generator::{self, FactKind, GenerationMode},
    services::{
        bulk_loader::{BulkLoader, FileLoadOutcome},
        calendar_seed::CalendarSeeder,
        holiday_update::run_holiday_update,
    },
};

#[derive(Parser)]
#[command(
    name = "library-dw",
    about = "Synthetic fact generation and loading for the library data warehouse",
    version
)]
struct Cli {
    /// Configuration profile (config/<ENV>.toml); defaults to RUN_ENV or APP_ENV
    #[arg(long, global = true)]
    config_env: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply (or revert) the warehouse schema migrations
    Migrate(MigrateArgs),
    #[command(subcommand)]
    Calendar(CalendarCommands),
    /// Write the four fact CSV files
    Generate(GenerateArgs),
    /// Load fact CSV files into their tables, then report row counts
    Load(LoadArgs),
    /// Merge holiday flags into date_dim through a staging table
    Holidays,
}

#[derive(Args)]
struct MigrateArgs {
    #[arg(long, action = ArgAction::SetTrue)]
    down: bool,
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Fill date_dim with one row per date key
    Seed(SeedArgs),
}

#[derive(Args)]
struct SeedArgs {
    /// Calendar date of date key 1 (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,
    /// Number of date keys; defaults to the generator's last date key
    #[arg(long)]
    days: Option<u32>,
    /// Rebuild an already populated date_dim
    #[arg(long, action = ArgAction::SetTrue)]
    replace: bool,
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, value_enum)]
    mode: Option<GenerationMode>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct LoadArgs {
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Restrict loading to these fact kinds
    #[arg(long, value_enum, num_args = 1..)]
    only: Vec<FactKind>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_profile(cli.config_env.as_deref())
        .context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    match cli.command {
        Commands::Generate(args) => handle_generate(&config, args),
        Commands::Migrate(args) => {
            let db = connect(&config, false).await?;
            let result = if args.down {
                db::rollback_migrations(&db).await
            } else {
                db::run_migrations(&db).await
            };
            shutdown(db).await;
            result.context("migration failed")?;
            println!("Migrations {}", if args.down { "reverted" } else { "applied" });
            Ok(())
        }
        Commands::Calendar(CalendarCommands::Seed(args)) => {
            let db = connect(&config, config.auto_migrate).await?;
            let days = args
                .days
                .unwrap_or(config.generator.ranges.date_keys.end);
            let seeder = CalendarSeeder::new(db.clone(), config.generator.pattern.table());
            let result = seeder.seed(args.start, days, args.replace).await;
            drop(seeder);
            shutdown(db).await;
            let rows = result.context("calendar seed failed")?;
            println!("Seeded {} date_dim rows from {}", rows, args.start);
            Ok(())
        }
        Commands::Load(args) => handle_load(&config, args).await,
        Commands::Holidays => handle_holidays(&config).await,
    }
}

fn handle_generate(config: &AppConfig, args: GenerateArgs) -> Result<()> {
    let mut settings = config.generator.clone();
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(out) = args.out {
        settings.output_dir = out;
    }

    let files = generator::generate_all(&settings).context("generation failed")?;
    for file in files {
        println!("{}: {} rows -> {}", file.kind, file.rows, file.path.display());
    }
    Ok(())
}

async fn handle_load(config: &AppConfig, args: LoadArgs) -> Result<()> {
    let mut loader_config = config.loader.clone();
    if let Some(dir) = args.dir {
        loader_config.input_dir = dir;
    }
    let kinds: Vec<FactKind> = if args.only.is_empty() {
        FactKind::iter().collect()
    } else {
        args.only
    };

    let db = connect(config, config.auto_migrate).await?;
    let loader = BulkLoader::new(db.clone(), loader_config);
    let result = loader.load_all(&kinds).await;
    drop(loader);
    shutdown(db).await;

    let report = result.context("row count verification failed")?;
    for (kind, outcome) in &report.outcomes {
        match outcome {
            FileLoadOutcome::Loaded { rows } => println!("{}: loaded {} rows", kind, rows),
            FileLoadOutcome::Missing { path } => {
                println!("{}: skipped, {} not found", kind, path.display())
            }
            FileLoadOutcome::Failed { error } => println!(
                "{}: failed after {} committed rows ({})",
                kind,
                outcome.rows_loaded(),
                error
            ),
        }
    }
    for (kind, count) in &report.table_counts {
        println!("{}: {} rows in table", kind.table_name(), count);
    }
    println!("Total: {} rows", report.total_rows);
    Ok(())
}

async fn handle_holidays(config: &AppConfig) -> Result<()> {
    let db = connect(config, config.auto_migrate).await?;
    let result = run_holiday_update(db.clone(), &config.holidays).await;
    shutdown(db).await;

    match result {
        Ok(summary) => {
            println!(
                "Updated {} of {} date_dim rows ({} holidays)",
                summary.updated_rows, summary.calendar_rows, summary.holiday_days
            );
            Ok(())
        }
        Err(e) => {
            error!("Holiday update error: {}", e);
            error!("Transaction rolled back; date_dim is unchanged");
            Err(e).context("holiday update rolled back")
        }
    }
}

async fn connect(config: &AppConfig, migrate: bool) -> Result<Arc<DbPool>> {
    let connected = db::connect_with_fallback(&db::connect_attempts(config))
        .await
        .context("failed to connect to database")?;

    if let ConnectOutcome::Fallback {
        label,
        primary_error,
    } = &connected.outcome
    {
        warn!(
            "Primary connection failed ({}); continuing on {} connection",
            primary_error, label
        );
    }

    if migrate {
        db::run_migrations(&connected.pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    Ok(Arc::new(connected.pool))
}

async fn shutdown(db: Arc<DbPool>) {
    match Arc::try_unwrap(db) {
        Ok(pool) => {
            if let Err(e) = db::close_pool(pool).await {
                warn!("Closing database pool failed: {}", e);
            } else {
                info!("Database pool closed");
            }
        }
        Err(_) => debug!("Database pool still shared; dropping handle"),
    }
}
