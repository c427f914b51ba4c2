// Holiday Data Service - Core Library
// Exposes all modules for use in the importer CLI, API server, and tests

pub mod db;
pub mod entities;
pub mod error;
pub mod formats;
pub mod import;
pub mod localized;
pub mod query;
pub mod regions;
pub mod responses;
pub mod snapshot;
pub mod sources;

// Re-export commonly used types
pub use db::{
    entity_counts, setup_database, StoreCounts,
};
pub use entities::{Country, Holiday, HolidayType, Language, OUnit, Subdivision, TypeFamily};
pub use error::{ImportError, QueryError};
pub use import::{
    CancelToken, ConsoleProgress, Importer, ImportSummary, ProgressReport, SilentProgress,
};
pub use localized::{
    resolve, resolve_language, resolve_text, LocalizedText, DEFAULT_LANGUAGE,
};
pub use query::{
    holidays_by_date, holidays_in_range, ounit_tree, statistics, subdivision_tree,
    DateStatistics, HolidayFilter, MAX_RANGE_DAYS,
};
pub use regions::{code_contains, RegionIndex};
pub use snapshot::Snapshot;
pub use sources::{RegionalSource, SourcesConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
