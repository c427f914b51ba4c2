// Holiday Data Service - Importer CLI
//
// `import <folder>` rebuilds the store from a CSV source tree;
// `summary` prints the current entity counts.

use anyhow::Result;
use rusqlite::Connection;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use holiday_data::{
    entity_counts, setup_database, ConsoleProgress, Importer, Snapshot, SourcesConfig,
};

const DEFAULT_DB_FILE: &str = "holidays.db";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("import") if args.len() >= 3 => {
            run_import(Path::new(&args[2]), &db_path(args.get(3)))
        }
        Some("summary") => run_summary(&db_path(args.get(2))),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("✗ {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn db_path(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

fn print_usage() {
    eprintln!("Holiday Data Service v{}", holiday_data::VERSION);
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  holiday-data import <source-folder> [db-file]");
    eprintln!("  holiday-data summary [db-file]");
}

fn run_import(root: &Path, db_file: &Path) -> Result<()> {
    println!("🗄️  Holiday import: CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Resolve the source layout
    let sources = SourcesConfig::resolve(root)?;
    println!(
        "✓ Sources: {} regional folder(s) under {}",
        sources.regional.len(),
        root.display()
    );

    // 2. Rebuild the schema, dropping any data from earlier runs
    let conn = Connection::open(db_file)?;
    setup_database(&conn)?;
    println!("✓ Database rebuilt with WAL mode");

    // 3. Replay the sources in dependency order
    let mut progress = ConsoleProgress;
    let summary = Importer::new(&conn, &mut progress).run(root, &sources)?;

    // 4. Verify counts
    let counts = entity_counts(&conn)?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "🎉 Imported {} records from {} files",
        summary.records, summary.files
    );
    print_counts(&counts);

    Ok(())
}

fn run_summary(db_file: &Path) -> Result<()> {
    if !db_file.exists() {
        anyhow::bail!(
            "database {} not found, run: holiday-data import <source-folder>",
            db_file.display()
        );
    }

    let conn = Connection::open(db_file)?;
    let counts = entity_counts(&conn)?;
    print_counts(&counts);

    // Exercise the snapshot the query side will serve from
    let snapshot = Snapshot::load(&conn)?;
    let iso_codes: Vec<&str> = snapshot
        .countries
        .iter()
        .map(|c| c.iso_code.as_str())
        .collect();
    println!("✓ Countries: {}", iso_codes.join(", "));

    Ok(())
}

fn print_counts(counts: &holiday_data::StoreCounts) {
    println!("✓ {} countries", counts.countries);
    println!("✓ {} languages", counts.languages);
    println!("✓ {} subdivisions", counts.subdivisions);
    println!("✓ {} organizational units", counts.ounits);
    println!("✓ {} holidays", counts.holidays);
}
