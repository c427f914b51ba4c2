// Bulk CSV import pipeline
//
// Reads semicolon-separated source files and persists validated entities
// in a fixed dependency order: countries -> languages -> per country
// (subdivisions -> organizational units -> holidays). Later record types
// resolve foreign keys against rows inserted by earlier ones, so the pass
// is strictly sequential. Any parse, reference, validation or store
// failure aborts the whole run and reports the offending file and row.

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::db;
use crate::entities::{Country, Holiday, HolidayType, Language, OUnit, Subdivision};
use crate::error::ImportError;
use crate::localized::LocalizedText;
use crate::regions::is_extension_of;
use crate::sources::SourcesConfig;

// ============================================================================
// COOPERATIVE CANCELLATION
// ============================================================================

/// Cancellation signal checked on every record boundary. Record commits
/// are atomic, so observing the signal between records never leaves a
/// half-written record behind.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ============================================================================
// PROGRESS REPORTING
// ============================================================================

/// Injected progress surface: one start/finish/cancel cycle per file plus
/// a monotonically increasing processed-record counter.
pub trait ProgressReport {
    fn caption(&mut self, _text: &str) {}
    fn start(&mut self, _text: &str) {}
    fn advance(&mut self, _records: u64) {}
    fn finish(&mut self, _records: u64) {}
    fn cancel(&mut self) {}
    fn success(&mut self, _text: &str) {}
}

/// Console reporter used by the CLI.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressReport for ConsoleProgress {
    fn caption(&mut self, text: &str) {
        println!("\n{text}");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    fn start(&mut self, text: &str) {
        println!("{text}");
    }

    fn finish(&mut self, records: u64) {
        println!("✓ {records} records");
    }

    fn cancel(&mut self) {
        println!("✗ aborted");
    }

    fn success(&mut self, text: &str) {
        println!("✓ {text}");
    }
}

/// No-op reporter for tests and embedding.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl ProgressReport for SilentProgress {}

// ============================================================================
// ROW ACCESS AND CELL CONVERTERS
// ============================================================================

/// One CSV row with header lookup and source position, shared by the
/// typed cell converters so every error carries file and row.
pub struct RowContext<'a> {
    file: &'a str,
    /// 1-based row number in the source file, header included
    row: usize,
    headers: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl<'a> RowContext<'a> {
    /// Raw cell value; `None` when the column is absent or empty.
    pub fn value(&self, column: &str) -> Option<&'a str> {
        let index = *self.headers.get(column)?;
        match self.record.get(index) {
            Some("") | None => None,
            Some(value) => Some(value),
        }
    }

    /// First non-empty cell among alternative column spellings. Source
    /// generations disagree on singular vs plural headers.
    fn value_any(&self, columns: &[&str]) -> Option<&'a str> {
        columns.iter().find_map(|column| self.value(column))
    }

    pub fn require(&self, column: &str) -> Result<&'a str, ImportError> {
        self.value(column)
            .ok_or_else(|| self.parse_error(format!("missing value for column {column}")))
    }

    /// Parses a `,`-joined list of `LANGCODE TEXT` pairs with URL-escaped
    /// text payloads, e.g. `DE Sommerferien,EN Summer%20holidays`.
    pub fn localized(&self, columns: &[&str]) -> Result<Vec<LocalizedText>, ImportError> {
        let Some(value) = self.value_any(columns) else {
            return Ok(Vec::new());
        };

        let mut texts = Vec::new();
        for part in value.split(',') {
            if part.len() < 4 || part.as_bytes()[2] != b' ' {
                return Err(self.parse_error(format!("malformed localized text: {part}")));
            }
            let text = urlencoding::decode(&part[3..])
                .map_err(|e| self.parse_error(format!("malformed localized text: {e}")))?;
            texts.push(LocalizedText::new(&part[..2], text.into_owned()));
        }
        Ok(texts)
    }

    /// Parses a bare `,`-joined token list.
    pub fn string_list(&self, columns: &[&str]) -> Vec<String> {
        match self.value_any(columns) {
            Some(value) => value.split(',').map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>, ImportError> {
        self.value(column)
            .map(|value| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .map_err(|_| self.parse_error(format!("invalid date: {value}")))
            })
            .transpose()
    }

    pub fn require_date(&self, column: &str) -> Result<NaiveDate, ImportError> {
        self.date(column)?
            .ok_or_else(|| self.parse_error(format!("missing value for column {column}")))
    }

    pub fn require_uuid(&self, column: &str) -> Result<Uuid, ImportError> {
        let value = self.require(column)?;
        Uuid::parse_str(value).map_err(|_| self.parse_error(format!("invalid id: {value}")))
    }

    fn parse_error(&self, message: String) -> ImportError {
        ImportError::parse(self.file, self.row, message)
    }

    fn reference_error(&self, message: impl Into<String>) -> ImportError {
        ImportError::reference(self.file, self.row, message)
    }

    fn validation_error(&self, message: impl Into<String>) -> ImportError {
        ImportError::validation(self.file, self.row, message)
    }

    fn store_error(&self, error: anyhow::Error) -> ImportError {
        ImportError::store(self.file, self.row, error.to_string())
    }

    /// Resolves the owning country or fails with a reference error.
    fn resolve_country(&self, conn: &Connection, iso_code: &str) -> Result<Uuid, ImportError> {
        db::country_id_by_iso(conn, iso_code)
            .map_err(|e| self.store_error(e))?
            .ok_or_else(|| self.reference_error(format!("unknown country: {iso_code}")))
    }
}

// ============================================================================
// TYPED CSV RECORDS
// ============================================================================

/// One record shape of the import format: parse the raw row into a typed
/// record, then resolve references, validate and commit it.
trait CsvRecord: Sized {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError>;
    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError>;
}

/// CSV record of a country as defined in ISO 3166-1.
struct CsvCountry {
    iso_code: String,
    names: Vec<LocalizedText>,
    official_languages: Vec<String>,
}

impl CsvRecord for CsvCountry {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError> {
        Ok(CsvCountry {
            iso_code: row.require("IsoCode")?.to_string(),
            names: row.localized(&["Name", "Names"])?,
            official_languages: row.string_list(&["OfficialLanguages"]),
        })
    }

    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError> {
        if self.names.is_empty() {
            return Err(row.validation_error("no country names defined"));
        }
        if self.official_languages.is_empty() {
            return Err(row.validation_error("no official languages defined"));
        }

        let country = Country {
            id: Uuid::new_v4(),
            iso_code: self.iso_code.clone(),
            names: self.names.clone(),
            official_languages: self.official_languages.clone(),
        };
        db::insert_country(conn, &country).map_err(|e| row.store_error(e))
    }
}

/// CSV record of a language as defined in ISO-639-1.
struct CsvLanguage {
    iso_code: String,
    names: Vec<LocalizedText>,
}

impl CsvRecord for CsvLanguage {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError> {
        Ok(CsvLanguage {
            iso_code: row.require("IsoCode")?.to_string(),
            names: row.localized(&["Name", "Names"])?,
        })
    }

    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError> {
        if self.names.is_empty() {
            return Err(row.validation_error("no language names defined"));
        }

        let language = Language {
            id: Uuid::new_v4(),
            iso_code: self.iso_code.clone(),
            names: self.names.clone(),
        };
        db::insert_language(conn, &language).map_err(|e| row.store_error(e))
    }
}

/// CSV record of a subdivision, e.g. a federal state.
struct CsvSubdivision {
    country: String,
    code: String,
    iso_code: Option<String>,
    short_name: String,
    parent: Option<String>,
    categories: Vec<LocalizedText>,
    names: Vec<LocalizedText>,
    comments: Vec<LocalizedText>,
    official_languages: Vec<String>,
}

impl CsvRecord for CsvSubdivision {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError> {
        Ok(CsvSubdivision {
            country: row.require("Country")?.to_string(),
            code: row.require("Code")?.to_string(),
            iso_code: row.value("IsoCode").map(str::to_string),
            short_name: row.require("ShortName")?.to_string(),
            parent: row.value("Parent").map(str::to_string),
            categories: row.localized(&["Category", "Categories"])?,
            names: row.localized(&["Name", "Names"])?,
            comments: row.localized(&["Comment", "Comments"])?,
            official_languages: row.string_list(&["OfficialLanguages"]),
        })
    }

    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError> {
        let country_id = row.resolve_country(conn, &self.country)?;

        if self.names.is_empty() {
            return Err(row.validation_error("no subdivision names defined"));
        }
        if self.categories.is_empty() {
            return Err(row.validation_error("no subdivision categories defined"));
        }
        if self.official_languages.is_empty() {
            return Err(row.validation_error("no official languages defined"));
        }

        let parent_id = match &self.parent {
            Some(parent) => {
                let (parent_id, parent_code) = db::subdivision_ref(conn, country_id, parent)
                    .map_err(|e| row.store_error(e))?
                    .ok_or_else(|| {
                        row.reference_error(format!("unknown parent subdivision: {parent}"))
                    })?;
                if !is_extension_of(&parent_code, &self.code) {
                    return Err(row.validation_error(format!(
                        "parent code {parent_code} is not a prefix of {}",
                        self.code
                    )));
                }
                Some(parent_id)
            }
            None => None,
        };

        let subdivision = Subdivision {
            id: Uuid::new_v4(),
            country_id,
            code: self.code.clone(),
            iso_code: self.iso_code.clone(),
            short_name: self.short_name.clone(),
            categories: self.categories.clone(),
            names: self.names.clone(),
            comments: self.comments.clone(),
            official_languages: self.official_languages.clone(),
            parent_id,
        };
        db::insert_subdivision(conn, &subdivision).map_err(|e| row.store_error(e))
    }
}

/// CSV record of an organizational unit.
struct CsvOUnit {
    country: String,
    code: String,
    short_name: String,
    parent: Option<String>,
    names: Vec<LocalizedText>,
    comments: Vec<LocalizedText>,
    subdivisions: Vec<String>,
}

impl CsvRecord for CsvOUnit {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError> {
        Ok(CsvOUnit {
            country: row.require("Country")?.to_string(),
            code: row.require("Code")?.to_string(),
            short_name: row.require("ShortName")?.to_string(),
            parent: row.value("Parent").map(str::to_string),
            names: row.localized(&["Name", "Names"])?,
            comments: row.localized(&["Comment", "Comments"])?,
            subdivisions: row.string_list(&["Subdivisions"]),
        })
    }

    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError> {
        let country_id = row.resolve_country(conn, &self.country)?;

        if self.names.is_empty() {
            return Err(row.validation_error("no organizational unit names defined"));
        }

        let mut subdivision_ids = Vec::with_capacity(self.subdivisions.len());
        for reference in &self.subdivisions {
            let (subdivision_id, _) = db::subdivision_ref(conn, country_id, reference)
                .map_err(|e| row.store_error(e))?
                .ok_or_else(|| {
                    row.reference_error(format!("unknown subdivision: {reference}"))
                })?;
            subdivision_ids.push(subdivision_id);
        }

        let parent_id = match &self.parent {
            Some(parent) => {
                let (parent_id, parent_code) = db::ounit_ref(conn, country_id, parent)
                    .map_err(|e| row.store_error(e))?
                    .ok_or_else(|| {
                        row.reference_error(format!("unknown parent organizational unit: {parent}"))
                    })?;
                if !is_extension_of(&parent_code, &self.code) {
                    return Err(row.validation_error(format!(
                        "parent code {parent_code} is not a prefix of {}",
                        self.code
                    )));
                }
                Some(parent_id)
            }
            None => None,
        };

        let ounit = OUnit {
            id: Uuid::new_v4(),
            country_id,
            code: self.code.clone(),
            short_name: self.short_name.clone(),
            names: self.names.clone(),
            comments: self.comments.clone(),
            parent_id,
            subdivision_ids,
        };
        db::insert_ounit(conn, &ounit).map_err(|e| row.store_error(e))
    }
}

/// CSV record of a holiday.
struct CsvHoliday {
    id: Uuid,
    country: String,
    holiday_type: HolidayType,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    names: Vec<LocalizedText>,
    comments: Vec<LocalizedText>,
    subdivisions: Vec<String>,
    ounits: Vec<String>,
}

impl CsvRecord for CsvHoliday {
    fn parse(row: &RowContext<'_>) -> Result<Self, ImportError> {
        let type_value = row.require("Type")?;
        let holiday_type = HolidayType::parse(type_value)
            .ok_or_else(|| row.parse_error(format!("unknown holiday type: {type_value}")))?;

        Ok(CsvHoliday {
            id: row.require_uuid("Id")?,
            country: row.require("Country")?.to_string(),
            holiday_type,
            start_date: row.require_date("StartDate")?,
            end_date: row.date("EndDate")?,
            names: row.localized(&["Name", "Names"])?,
            comments: row.localized(&["Comment", "Comments"])?,
            subdivisions: row.string_list(&["Subdivisions"]),
            ounits: row.string_list(&["OUnits"]),
        })
    }

    fn commit(&self, conn: &Connection, row: &RowContext<'_>) -> Result<(), ImportError> {
        let country_id = row.resolve_country(conn, &self.country)?;

        if self.names.is_empty() {
            return Err(row.validation_error("no holiday names defined"));
        }

        // A missing end date means a single-day holiday
        let end_date = self.end_date.unwrap_or(self.start_date);
        if end_date < self.start_date {
            return Err(row.validation_error(format!(
                "end date {end_date} is before start date {}",
                self.start_date
            )));
        }

        let mut subdivision_ids = Vec::with_capacity(self.subdivisions.len());
        for reference in &self.subdivisions {
            let (subdivision_id, _) = db::subdivision_ref(conn, country_id, reference)
                .map_err(|e| row.store_error(e))?
                .ok_or_else(|| {
                    row.reference_error(format!("unknown subdivision: {reference}"))
                })?;
            subdivision_ids.push(subdivision_id);
        }

        let mut ounit_ids = Vec::with_capacity(self.ounits.len());
        for reference in &self.ounits {
            let (ounit_id, _) = db::ounit_ref(conn, country_id, reference)
                .map_err(|e| row.store_error(e))?
                .ok_or_else(|| {
                    row.reference_error(format!("unknown organizational unit: {reference}"))
                })?;
            ounit_ids.push(ounit_id);
        }

        let holiday = Holiday {
            id: self.id,
            country_id,
            holiday_type: self.holiday_type,
            start_date: self.start_date,
            end_date,
            names: self.names.clone(),
            comments: self.comments.clone(),
            // Nationwide is true iff no explicit regional scoping exists
            nationwide: subdivision_ids.is_empty() && ounit_ids.is_empty(),
            subdivision_ids,
            ounit_ids,
        };
        db::insert_holiday(conn, &holiday).map_err(|e| row.store_error(e))
    }
}

// ============================================================================
// IMPORT MANAGER
// ============================================================================

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files: u64,
    pub records: u64,
}

/// Drives a full import run against an already prepared (dropped and
/// recreated) store.
pub struct Importer<'a> {
    conn: &'a Connection,
    progress: &'a mut dyn ProgressReport,
    cancel: CancelToken,
}

impl<'a> Importer<'a> {
    pub fn new(conn: &'a Connection, progress: &'a mut dyn ProgressReport) -> Self {
        Importer {
            conn,
            progress,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the full import in dependency order. Missing optional files
    /// are skipped; any record failure aborts the run.
    pub fn run(&mut self, root: &Path, sources: &SourcesConfig) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary::default();

        self.progress.caption("Import global data");

        let countries_file = root.join(&sources.countries_file);
        if countries_file.is_file() {
            self.import_file::<CsvCountry>(&countries_file, &mut summary)?;
        }

        let languages_file = root.join(&sources.languages_file);
        if languages_file.is_file() {
            self.import_file::<CsvLanguage>(&languages_file, &mut summary)?;
        }

        self.progress.success("Data successfully imported!");

        for regional in &sources.regional {
            self.progress
                .caption(&format!("Import {} data", regional.country_code));

            let country_folder = root.join(&regional.country_folder);

            if let Some(file_name) = &regional.subdivisions_file {
                let file = country_folder.join(file_name);
                if file.is_file() {
                    self.import_file::<CsvSubdivision>(&file, &mut summary)?;
                }
            }

            if let Some(file_name) = &regional.ounits_file {
                let file = country_folder.join(file_name);
                if file.is_file() {
                    self.import_file::<CsvOUnit>(&file, &mut summary)?;
                }
            }

            let holidays_folder = country_folder.join(&regional.holidays_folder);
            if holidays_folder.is_dir() {
                for file in csv_files(&holidays_folder)? {
                    self.import_file::<CsvHoliday>(&file, &mut summary)?;
                }
            }

            self.progress.success("Data successfully imported!");
        }

        Ok(summary)
    }

    fn import_file<T: CsvRecord>(
        &mut self,
        path: &Path,
        summary: &mut ImportSummary,
    ) -> Result<(), ImportError> {
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.progress.start(&format!("Import file {file}..."));

        match self.import_rows::<T>(path, &file) {
            Ok(records) => {
                self.progress.finish(records);
                summary.files += 1;
                summary.records += records;
                Ok(())
            }
            Err(error) => {
                self.progress.cancel();
                Err(error)
            }
        }
    }

    fn import_rows<T: CsvRecord>(&mut self, path: &Path, file: &str) -> Result<u64, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_path(path)
            .map_err(|e| ImportError::Source {
                file: file.to_string(),
                message: e.to_string(),
            })?;

        let headers: HashMap<String, usize> = reader
            .headers()
            .map_err(|e| ImportError::parse(file, 1, e.to_string()))?
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index))
            .collect();

        let mut records = 0;
        for (index, result) in reader.records().enumerate() {
            // Cancellation boundaries fall strictly between record commits
            if self.cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }

            let row = index + 2; // 1-based, after the header row
            let record = result.map_err(|e| ImportError::parse(file, row, e.to_string()))?;
            let context = RowContext {
                file,
                row,
                headers: &headers,
                record: &record,
            };

            let parsed = T::parse(&context)?;
            parsed.commit(self.conn, &context)?;

            records += 1;
            self.progress.advance(records);
        }

        Ok(records)
    }
}

/// The *.csv files of a folder, sorted by name for a deterministic replay
/// order.
fn csv_files(folder: &Path) -> Result<Vec<std::path::PathBuf>, ImportError> {
    let entries = std::fs::read_dir(folder).map_err(|e| ImportError::Source {
        file: folder.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map(|ext| ext == "csv").unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{entity_counts, load_holidays, load_subdivisions, setup_database};
    use std::fs;

    const HOLIDAY_ID: &str = "63aeed7a-8c31-47af-b1c7-f26dd51f3c19";

    fn write_source_tree(root: &Path) {
        fs::write(
            root.join("countries.csv"),
            "IsoCode;Name;OfficialLanguages\n\
             DE;DE Deutschland,EN Germany;DE\n",
        )
        .unwrap();
        fs::write(
            root.join("languages.csv"),
            "IsoCode;Name\n\
             DE;DE Deutsch,EN German\n",
        )
        .unwrap();

        let de = root.join("DE");
        fs::create_dir(&de).unwrap();
        fs::write(
            de.join("subdivisions.csv"),
            "Country;Code;IsoCode;ShortName;Parent;Category;Name;OfficialLanguages\n\
             DE;DE-BE;DE-BE;BE;;EN federal%20state;DE Berlin,EN Berlin;DE\n\
             DE;DE-BE-1;;BE-1;BE;EN district;DE Mitte;DE\n",
        )
        .unwrap();
        fs::write(
            de.join("ounits.csv"),
            "Country;Code;ShortName;Parent;Name;Subdivisions\n\
             DE;DE-ABS;ABS;;EN general%20schools;BE\n",
        )
        .unwrap();

        let holidays = de.join("holidays");
        fs::create_dir(&holidays).unwrap();
        fs::write(
            holidays.join("2023.csv"),
            format!(
                "Id;Country;Type;StartDate;EndDate;Name;Subdivisions;OUnits;Comment\n\
                 {HOLIDAY_ID};DE;Public;2023-10-03;;DE Tag%20der%20Deutschen%20Einheit,EN German%20Unity%20Day;;;\n\
                 8c4b11cc-3f6e-4d0b-9c29-1a2b3c4d5e6f;DE;School;2023-06-22;2023-08-04;DE Sommerferien;BE;;EN school%20summer%20break\n"
            ),
        )
        .unwrap();
    }

    fn run_import(conn: &Connection, root: &Path) -> Result<ImportSummary, ImportError> {
        let sources = SourcesConfig::resolve(root).unwrap();
        let mut progress = SilentProgress;
        Importer::new(conn, &mut progress).run(root, &sources)
    }

    #[test]
    fn full_import_populates_all_entities() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let summary = run_import(&conn, root.path()).unwrap();

        assert_eq!(summary.files, 5);
        assert_eq!(summary.records, 7);

        let counts = entity_counts(&conn).unwrap();
        assert_eq!(counts.countries, 1);
        assert_eq!(counts.languages, 1);
        assert_eq!(counts.subdivisions, 2);
        assert_eq!(counts.ounits, 1);
        assert_eq!(counts.holidays, 2);

        let holidays = load_holidays(&conn).unwrap();
        let summer = holidays
            .iter()
            .find(|h| h.holiday_type == HolidayType::School)
            .unwrap();
        assert!(!summer.nationwide);
        assert_eq!(summer.subdivision_ids.len(), 1);
        assert_eq!(summer.comments.len(), 1);

        let unity_day = holidays
            .iter()
            .find(|h| h.holiday_type == HolidayType::Public)
            .unwrap();
        assert!(unity_day.nationwide);
        // Missing end date defaults to the start date
        assert_eq!(unity_day.start_date, unity_day.end_date);
        assert_eq!(unity_day.id, HOLIDAY_ID.parse::<Uuid>().unwrap());
    }

    #[test]
    fn reimport_after_rebuild_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());

        let conn = Connection::open_in_memory().unwrap();

        setup_database(&conn).unwrap();
        run_import(&conn, root.path()).unwrap();
        let first_counts = entity_counts(&conn).unwrap();
        let mut first_ids: Vec<Uuid> =
            load_holidays(&conn).unwrap().iter().map(|h| h.id).collect();
        first_ids.sort();

        // Second full run: drop/recreate then replay the same sources
        setup_database(&conn).unwrap();
        run_import(&conn, root.path()).unwrap();
        let second_counts = entity_counts(&conn).unwrap();
        let mut second_ids: Vec<Uuid> =
            load_holidays(&conn).unwrap().iter().map(|h| h.id).collect();
        second_ids.sort();

        assert_eq!(first_counts, second_counts);
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn subdivision_before_country_fails_with_reference_error() {
        let root = tempfile::tempdir().unwrap();
        // Regional data only, no countries.csv: the subdivision's country
        // reference cannot resolve
        let de = root.path().join("DE");
        fs::create_dir(&de).unwrap();
        fs::write(
            de.join("subdivisions.csv"),
            "Country;Code;ShortName;Category;Name;OfficialLanguages\n\
             DE;DE-BE;BE;EN federal%20state;DE Berlin;DE\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let error = run_import(&conn, root.path()).unwrap_err();
        assert!(matches!(error, ImportError::Reference { row: 2, .. }));

        // Adding the missing country and re-running the full import succeeds
        fs::write(
            root.path().join("countries.csv"),
            "IsoCode;Name;OfficialLanguages\nDE;EN Germany;DE\n",
        )
        .unwrap();
        setup_database(&conn).unwrap();
        run_import(&conn, root.path()).unwrap();
        assert_eq!(entity_counts(&conn).unwrap().subdivisions, 1);
    }

    #[test]
    fn holiday_with_unknown_subdivision_fails() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());
        fs::write(
            root.path().join("DE").join("holidays").join("2024.csv"),
            "Id;Country;Type;StartDate;EndDate;Name;Subdivisions\n\
             11111111-2222-3333-4444-555555555555;DE;School;2024-06-20;2024-08-02;DE Sommerferien;XX\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let error = run_import(&conn, root.path()).unwrap_err();
        assert!(matches!(error, ImportError::Reference { .. }));
        assert!(error.to_string().contains("2024.csv"));
    }

    #[test]
    fn parent_code_must_be_a_true_prefix() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("countries.csv"),
            "IsoCode;Name;OfficialLanguages\nDE;EN Germany;DE\n",
        )
        .unwrap();
        let de = root.path().join("DE");
        fs::create_dir(&de).unwrap();
        fs::write(
            de.join("subdivisions.csv"),
            "Country;Code;ShortName;Parent;Category;Name;OfficialLanguages\n\
             DE;DE-BE;BE;;EN federal%20state;DE Berlin;DE\n\
             DE;DE-XY;XY;BE;EN district;DE Beispiel;DE\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let error = run_import(&conn, root.path()).unwrap_err();
        assert!(matches!(error, ImportError::Validation { row: 3, .. }));
    }

    #[test]
    fn missing_names_fail_validation() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join("countries.csv"),
            "IsoCode;Name;OfficialLanguages\nDE;;DE\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let error = run_import(&conn, root.path()).unwrap_err();
        assert!(matches!(error, ImportError::Validation { .. }));
        assert!(error.to_string().contains("countries.csv, row 2"));
    }

    #[test]
    fn malformed_date_fails_with_parse_error() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());
        fs::write(
            root.path().join("DE").join("holidays").join("2024.csv"),
            "Id;Country;Type;StartDate;EndDate;Name\n\
             11111111-2222-3333-4444-555555555555;DE;Public;03.10.2024;;DE Feiertag\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let error = run_import(&conn, root.path()).unwrap_err();
        assert!(matches!(error, ImportError::Parse { .. }));
    }

    #[test]
    fn cancelled_token_aborts_between_records() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let sources = SourcesConfig::resolve(root.path()).unwrap();
        let mut progress = SilentProgress;
        let error = Importer::new(&conn, &mut progress)
            .with_cancel(cancel)
            .run(root.path(), &sources)
            .unwrap_err();

        assert!(matches!(error, ImportError::Cancelled));
        // Nothing was committed: the signal was observed before the first record
        assert_eq!(entity_counts(&conn).unwrap().countries, 0);
    }

    #[test]
    fn localized_cells_decode_url_escapes() {
        let root = tempfile::tempdir().unwrap();
        write_source_tree(root.path());

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        run_import(&conn, root.path()).unwrap();

        let subdivisions = load_subdivisions(&conn).unwrap();
        let berlin = subdivisions.iter().find(|s| s.code == "DE-BE").unwrap();
        assert_eq!(berlin.categories[0].text, "federal state");
        assert_eq!(berlin.names[0], LocalizedText::new("DE", "Berlin"));

        // Parent reference resolved by short name, prefix rule holds
        let mitte = subdivisions.iter().find(|s| s.code == "DE-BE-1").unwrap();
        assert_eq!(mitte.parent_id, Some(berlin.id));
    }
}
