use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use kicad_libdb_core::{LoadConfig, SchemaVariant};
use kicad_libdb_sqlite::{LibraryQuery, LoadOptions, LoadReport, Migration, SchemaOptions};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific schema variant enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliSchemaVariant {
    Flattened,
    Normalized,
}

impl From<CliSchemaVariant> for SchemaVariant {
    fn from(variant: CliSchemaVariant) -> Self {
        match variant {
            CliSchemaVariant::Flattened => Self::Flattened,
            CliSchemaVariant::Normalized => Self::Normalized,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "kicad-libdb")]
#[command(about = "Load KiCad symbol and footprint libraries into SQLite")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover libraries under one or more roots and load them.
    Load(LoadArgs),
    /// Create, drop, or inspect the database tables.
    Migrate(MigrateArgs),
    /// List symbols whose name matches a SQL LIKE pattern, with their pins.
    Query(QueryArgs),
}

/// Schema selection shared by every subcommand that touches tables.
#[derive(Debug, Args)]
struct SchemaArgs {
    /// Load configuration YAML file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Table layout (overrides the configuration file).
    #[arg(long, value_enum)]
    schema: Option<CliSchemaVariant>,
    /// Table name prefix (overrides the configuration file).
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// Database file path.
    db: PathBuf,
    /// Directories to search for libraries.
    #[arg(required = true)]
    roots: Vec<PathBuf>,
    #[command(flatten)]
    schema: SchemaArgs,
    /// Drop and recreate the tables before loading.
    #[arg(long)]
    fresh: bool,
    /// Abort after this many consecutive skipped files or parts.
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    max_consecutive_failures: Option<usize>,
    /// Print the load report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create the tables in the database.
    Up(MigrateOpArgs),
    /// Drop the tables from the database.
    Down(MigrateOpArgs),
    /// Show table status and row counts.
    Status(MigrateOpArgs),
}

#[derive(Debug, Args)]
struct MigrateOpArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    #[command(flatten)]
    schema: SchemaArgs,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table name prefix.
    #[arg(long, default_value = "")]
    prefix: String,
    /// Symbol name pattern (SQL LIKE, e.g. `LED%`).
    name: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Command::Load(args) => run_load(args),
        Command::Migrate(args) => run_migrate(args),
        Command::Query(args) => run_query(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the configuration file (if any) and applies flag overrides.
fn resolve_config(args: &SchemaArgs) -> Result<LoadConfig, String> {
    let mut config = match &args.config {
        Some(path) => LoadConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => LoadConfig::default(),
    };

    if let Some(variant) = args.schema {
        config.schema.variant = variant.into();
    }
    if let Some(prefix) = &args.prefix {
        config.schema.prefix = prefix.clone();
    }
    debug!(
        variant = %config.schema.variant,
        prefix = %config.schema.prefix,
        "Resolved configuration"
    );
    Ok(config)
}

fn open_migration(db: &Path, config: &LoadConfig) -> Result<Migration, String> {
    let conn = Connection::open(db)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))?;
    Migration::new(conn, SchemaOptions::from(&config.schema))
        .map_err(|e| format!("Failed to initialize migration: {e}"))
}

fn run_load(args: LoadArgs) -> Result<(), String> {
    let mut config = resolve_config(&args.schema)?;
    if let Some(max) = args.max_consecutive_failures {
        config.failure.max_consecutive_failures = Some(max);
    }

    let options = LoadOptions::from_config(&config);
    let mut migration = open_migration(&args.db, &config)?;
    let report = if args.fresh {
        migration
            .refresh(&args.roots, &options)
            .map_err(|e| format!("Load failed: {e}"))?
    } else {
        migration
            .load(&args.roots, &options)
            .map_err(|e| format!("Load failed: {e}"))?
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {e}"))?;
        println!("{json}");
    } else {
        print_report(&report, &args.db);
    }
    Ok(())
}

fn print_report(report: &LoadReport, db: &Path) {
    println!(
        "Load complete ({} schema) into '{}':",
        report.variant,
        db.display()
    );
    println!("  Libraries processed: {}", report.libraries.len());
    println!("  Symbols inserted: {}", report.symbols_inserted);
    println!("  Pins inserted: {}", report.pins_inserted);
    println!("  Properties inserted: {}", report.properties_inserted);
    println!("  Footprints inserted: {}", report.footprints_inserted);
    println!("  Skipped: {}", report.skipped.len());
    for item in &report.skipped {
        match &item.part {
            Some(part) => println!("    {} ({part}): {}", item.path.display(), item.reason),
            None => println!("    {}: {}", item.path.display(), item.reason),
        }
    }
}

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Up(a) => run_migrate_up(a),
        MigrateOperation::Down(a) => run_migrate_down(a),
        MigrateOperation::Status(a) => run_migrate_status(a),
    }
}

fn run_migrate_up(args: MigrateOpArgs) -> Result<(), String> {
    let config = resolve_config(&args.schema)?;
    let mut migration = open_migration(&args.db, &config)?;
    migration
        .up()
        .map_err(|e| format!("Migration up failed: {e}"))?;
    println!(
        "Migration up complete. {} tables created with prefix '{}' in '{}'.",
        config.schema.variant,
        config.schema.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_down(args: MigrateOpArgs) -> Result<(), String> {
    let config = resolve_config(&args.schema)?;
    let mut migration = open_migration(&args.db, &config)?;
    migration
        .down()
        .map_err(|e| format!("Migration down failed: {e}"))?;
    println!(
        "Migration down complete. Tables with prefix '{}' dropped from '{}'.",
        config.schema.prefix,
        args.db.display()
    );
    Ok(())
}

fn run_migrate_status(args: MigrateOpArgs) -> Result<(), String> {
    let config = resolve_config(&args.schema)?;
    let migration = open_migration(&args.db, &config)?;
    let status = migration
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;
    println!("Migration Status:");
    println!(
        "  Tables exist: {}",
        if status.tables_exist { "yes" } else { "no" }
    );
    println!(
        "  Schema variant: {}",
        status
            .variant
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Symbol count: {}", status.symbol_count);
    println!("  Pin count: {}", status.pin_count);
    println!("  Footprint count: {}", status.footprint_count);
    println!("  Property count: {}", status.property_count);
    println!(
        "  Last load: {}",
        status.last_load.as_deref().unwrap_or("never")
    );
    Ok(())
}

fn run_query(args: QueryArgs) -> Result<(), String> {
    let conn = Connection::open_with_flags(&args.db, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| format!("Failed to open database '{}': {e}", args.db.display()))?;
    let query = LibraryQuery::new(&conn, args.prefix.as_str()).map_err(|e| e.to_string())?;

    let symbols = query
        .find_symbols(&args.name)
        .map_err(|e| format!("Query failed: {e}"))?;
    if symbols.is_empty() {
        println!("No symbols match '{}'.", args.name);
        return Ok(());
    }

    for symbol in &symbols {
        let pins = query
            .pins_for_symbol(symbol.id)
            .map_err(|e| format!("Query failed: {e}"))?;
        println!("{}:{} ({} pins)", symbol.library, symbol.name, pins.len());
        for pin in &pins {
            let marker = if pin.is_alternate { " (alternate)" } else { "" };
            println!(
                "  {:>4}  {:<16} {}{marker}",
                pin.number, pin.name, pin.electrical_type
            );
        }
    }
    Ok(())
}
