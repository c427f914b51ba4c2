// SQLite persistence: schema lifecycle, record inserts, snapshot loading
//
// The schema is owned by the import pipeline: every run drops and
// recreates all tables before replaying the CSV sources, so the store is
// always rebuilt from canonical data and never incrementally patched.
// Localized text lists and language code lists are stored as JSON in TEXT
// columns; holiday/ounit region references live in junction tables whose
// rowid preserves insertion order.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{Country, Holiday, HolidayType, Language, OUnit, Subdivision};
use crate::localized::LocalizedText;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Full rebuild: drop everything from the previous run first, children
    // before parents
    conn.execute_batch(
        "DROP TABLE IF EXISTS holiday_ounits;
         DROP TABLE IF EXISTS holiday_subdivisions;
         DROP TABLE IF EXISTS ounit_subdivisions;
         DROP TABLE IF EXISTS holidays;
         DROP TABLE IF EXISTS ounits;
         DROP TABLE IF EXISTS subdivisions;
         DROP TABLE IF EXISTS languages;
         DROP TABLE IF EXISTS countries;",
    )?;

    conn.execute_batch(
        "CREATE TABLE countries (
            id TEXT PRIMARY KEY,
            iso_code TEXT UNIQUE NOT NULL,
            names TEXT NOT NULL,
            official_languages TEXT NOT NULL
        );

        CREATE TABLE languages (
            id TEXT PRIMARY KEY,
            iso_code TEXT UNIQUE NOT NULL,
            names TEXT NOT NULL
        );

        CREATE TABLE subdivisions (
            id TEXT PRIMARY KEY,
            country_id TEXT NOT NULL REFERENCES countries(id),
            code TEXT UNIQUE NOT NULL,
            iso_code TEXT,
            short_name TEXT NOT NULL,
            categories TEXT NOT NULL,
            names TEXT NOT NULL,
            comments TEXT NOT NULL,
            official_languages TEXT NOT NULL,
            parent_id TEXT REFERENCES subdivisions(id),
            UNIQUE (country_id, short_name)
        );

        CREATE TABLE ounits (
            id TEXT PRIMARY KEY,
            country_id TEXT NOT NULL REFERENCES countries(id),
            code TEXT UNIQUE NOT NULL,
            short_name TEXT NOT NULL,
            names TEXT NOT NULL,
            comments TEXT NOT NULL,
            parent_id TEXT REFERENCES ounits(id),
            UNIQUE (country_id, short_name)
        );

        CREATE TABLE ounit_subdivisions (
            ounit_id TEXT NOT NULL REFERENCES ounits(id),
            subdivision_id TEXT NOT NULL REFERENCES subdivisions(id),
            PRIMARY KEY (ounit_id, subdivision_id)
        );

        CREATE TABLE holidays (
            id TEXT PRIMARY KEY,
            country_id TEXT NOT NULL REFERENCES countries(id),
            holiday_type TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            names TEXT NOT NULL,
            comments TEXT NOT NULL,
            nationwide INTEGER NOT NULL
        );

        CREATE TABLE holiday_subdivisions (
            holiday_id TEXT NOT NULL REFERENCES holidays(id),
            subdivision_id TEXT NOT NULL REFERENCES subdivisions(id),
            PRIMARY KEY (holiday_id, subdivision_id)
        );

        CREATE TABLE holiday_ounits (
            holiday_id TEXT NOT NULL REFERENCES holidays(id),
            ounit_id TEXT NOT NULL REFERENCES ounits(id),
            PRIMARY KEY (holiday_id, ounit_id)
        );

        CREATE INDEX idx_subdivisions_country ON subdivisions(country_id);
        CREATE INDEX idx_ounits_country ON ounits(country_id);
        CREATE INDEX idx_holidays_country ON holidays(country_id);
        CREATE INDEX idx_holidays_start_date ON holidays(start_date);",
    )?;

    Ok(())
}

// ============================================================================
// Inserts (import side)
// ============================================================================

pub fn insert_country(conn: &Connection, country: &Country) -> Result<()> {
    conn.execute(
        "INSERT INTO countries (id, iso_code, names, official_languages)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            country.id.to_string(),
            country.iso_code,
            serde_json::to_string(&country.names)?,
            serde_json::to_string(&country.official_languages)?,
        ],
    )?;
    Ok(())
}

pub fn insert_language(conn: &Connection, language: &Language) -> Result<()> {
    conn.execute(
        "INSERT INTO languages (id, iso_code, names) VALUES (?1, ?2, ?3)",
        params![
            language.id.to_string(),
            language.iso_code,
            serde_json::to_string(&language.names)?,
        ],
    )?;
    Ok(())
}

pub fn insert_subdivision(conn: &Connection, subdivision: &Subdivision) -> Result<()> {
    conn.execute(
        "INSERT INTO subdivisions (
            id, country_id, code, iso_code, short_name,
            categories, names, comments, official_languages, parent_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            subdivision.id.to_string(),
            subdivision.country_id.to_string(),
            subdivision.code,
            subdivision.iso_code,
            subdivision.short_name,
            serde_json::to_string(&subdivision.categories)?,
            serde_json::to_string(&subdivision.names)?,
            serde_json::to_string(&subdivision.comments)?,
            serde_json::to_string(&subdivision.official_languages)?,
            subdivision.parent_id.map(|id| id.to_string()),
        ],
    )?;
    Ok(())
}

pub fn insert_ounit(conn: &Connection, ounit: &OUnit) -> Result<()> {
    conn.execute(
        "INSERT INTO ounits (id, country_id, code, short_name, names, comments, parent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            ounit.id.to_string(),
            ounit.country_id.to_string(),
            ounit.code,
            ounit.short_name,
            serde_json::to_string(&ounit.names)?,
            serde_json::to_string(&ounit.comments)?,
            ounit.parent_id.map(|id| id.to_string()),
        ],
    )?;

    for subdivision_id in &ounit.subdivision_ids {
        conn.execute(
            "INSERT INTO ounit_subdivisions (ounit_id, subdivision_id) VALUES (?1, ?2)",
            params![ounit.id.to_string(), subdivision_id.to_string()],
        )?;
    }

    Ok(())
}

pub fn insert_holiday(conn: &Connection, holiday: &Holiday) -> Result<()> {
    conn.execute(
        "INSERT INTO holidays (
            id, country_id, holiday_type, start_date, end_date,
            names, comments, nationwide
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            holiday.id.to_string(),
            holiday.country_id.to_string(),
            holiday.holiday_type.as_str(),
            holiday.start_date.to_string(),
            holiday.end_date.to_string(),
            serde_json::to_string(&holiday.names)?,
            serde_json::to_string(&holiday.comments)?,
            holiday.nationwide as i64,
        ],
    )?;

    for subdivision_id in &holiday.subdivision_ids {
        conn.execute(
            "INSERT INTO holiday_subdivisions (holiday_id, subdivision_id) VALUES (?1, ?2)",
            params![holiday.id.to_string(), subdivision_id.to_string()],
        )?;
    }

    for ounit_id in &holiday.ounit_ids {
        conn.execute(
            "INSERT INTO holiday_ounits (holiday_id, ounit_id) VALUES (?1, ?2)",
            params![holiday.id.to_string(), ounit_id.to_string()],
        )?;
    }

    Ok(())
}

// ============================================================================
// Reference lookups (import side)
// ============================================================================

/// Looks up a country id by its ISO 3166-1 code.
pub fn country_id_by_iso(conn: &Connection, iso_code: &str) -> Result<Option<Uuid>> {
    let mut stmt = conn.prepare("SELECT id FROM countries WHERE iso_code = ?1")?;
    let mut rows = stmt.query(params![iso_code])?;
    match rows.next()? {
        Some(row) => {
            let id: String = row.get(0)?;
            Ok(Some(parse_uuid(&id)?))
        }
        None => Ok(None),
    }
}

/// Looks up a subdivision within a country by short name or code and
/// returns `(id, code)`.
pub fn subdivision_ref(
    conn: &Connection,
    country_id: Uuid,
    short_name_or_code: &str,
) -> Result<Option<(Uuid, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, code FROM subdivisions
         WHERE country_id = ?1 AND (short_name = ?2 OR code = ?2)",
    )?;
    let mut rows = stmt.query(params![country_id.to_string(), short_name_or_code])?;
    match rows.next()? {
        Some(row) => {
            let id: String = row.get(0)?;
            let code: String = row.get(1)?;
            Ok(Some((parse_uuid(&id)?, code)))
        }
        None => Ok(None),
    }
}

/// Looks up an organizational unit within a country by short name or code
/// and returns `(id, code)`.
pub fn ounit_ref(
    conn: &Connection,
    country_id: Uuid,
    short_name_or_code: &str,
) -> Result<Option<(Uuid, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, code FROM ounits
         WHERE country_id = ?1 AND (short_name = ?2 OR code = ?2)",
    )?;
    let mut rows = stmt.query(params![country_id.to_string(), short_name_or_code])?;
    match rows.next()? {
        Some(row) => {
            let id: String = row.get(0)?;
            let code: String = row.get(1)?;
            Ok(Some((parse_uuid(&id)?, code)))
        }
        None => Ok(None),
    }
}

// ============================================================================
// Snapshot loading (query side)
// ============================================================================

pub fn load_countries(conn: &Connection) -> Result<Vec<Country>> {
    let mut stmt = conn.prepare(
        "SELECT id, iso_code, names, official_languages FROM countries ORDER BY iso_code",
    )?;
    let countries = stmt
        .query_map([], |row| {
            Ok(Country {
                id: column_uuid(row, 0)?,
                iso_code: row.get(1)?,
                names: column_texts(row, 2)?,
                official_languages: column_strings(row, 3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(countries)
}

pub fn load_languages(conn: &Connection) -> Result<Vec<Language>> {
    let mut stmt = conn.prepare("SELECT id, iso_code, names FROM languages ORDER BY iso_code")?;
    let languages = stmt
        .query_map([], |row| {
            Ok(Language {
                id: column_uuid(row, 0)?,
                iso_code: row.get(1)?,
                names: column_texts(row, 2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(languages)
}

pub fn load_subdivisions(conn: &Connection) -> Result<Vec<Subdivision>> {
    let mut stmt = conn.prepare(
        "SELECT id, country_id, code, iso_code, short_name,
                categories, names, comments, official_languages, parent_id
         FROM subdivisions ORDER BY code",
    )?;
    let subdivisions = stmt
        .query_map([], |row| {
            Ok(Subdivision {
                id: column_uuid(row, 0)?,
                country_id: column_uuid(row, 1)?,
                code: row.get(2)?,
                iso_code: row.get(3)?,
                short_name: row.get(4)?,
                categories: column_texts(row, 5)?,
                names: column_texts(row, 6)?,
                comments: column_texts(row, 7)?,
                official_languages: column_strings(row, 8)?,
                parent_id: column_uuid_opt(row, 9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(subdivisions)
}

pub fn load_ounits(conn: &Connection) -> Result<Vec<OUnit>> {
    let mut references = load_junction(conn, "ounit_subdivisions", "ounit_id", "subdivision_id")?;

    let mut stmt = conn.prepare(
        "SELECT id, country_id, code, short_name, names, comments, parent_id
         FROM ounits ORDER BY code",
    )?;
    let ounits = stmt
        .query_map([], |row| {
            Ok(OUnit {
                id: column_uuid(row, 0)?,
                country_id: column_uuid(row, 1)?,
                code: row.get(2)?,
                short_name: row.get(3)?,
                names: column_texts(row, 4)?,
                comments: column_texts(row, 5)?,
                parent_id: column_uuid_opt(row, 6)?,
                subdivision_ids: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(ounits
        .into_iter()
        .map(|mut ounit| {
            ounit.subdivision_ids = references.remove(&ounit.id).unwrap_or_default();
            ounit
        })
        .collect())
}

pub fn load_holidays(conn: &Connection) -> Result<Vec<Holiday>> {
    let mut subdivision_refs =
        load_junction(conn, "holiday_subdivisions", "holiday_id", "subdivision_id")?;
    let mut ounit_refs = load_junction(conn, "holiday_ounits", "holiday_id", "ounit_id")?;

    let mut stmt = conn.prepare(
        "SELECT id, country_id, holiday_type, start_date, end_date,
                names, comments, nationwide
         FROM holidays ORDER BY start_date, id",
    )?;
    let holidays = stmt
        .query_map([], |row| {
            Ok(Holiday {
                id: column_uuid(row, 0)?,
                country_id: column_uuid(row, 1)?,
                holiday_type: column_holiday_type(row, 2)?,
                start_date: column_date(row, 3)?,
                end_date: column_date(row, 4)?,
                names: column_texts(row, 5)?,
                comments: column_texts(row, 6)?,
                nationwide: row.get::<_, i64>(7)? != 0,
                subdivision_ids: Vec::new(),
                ounit_ids: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(holidays
        .into_iter()
        .map(|mut holiday| {
            holiday.subdivision_ids = subdivision_refs.remove(&holiday.id).unwrap_or_default();
            holiday.ounit_ids = ounit_refs.remove(&holiday.id).unwrap_or_default();
            holiday
        })
        .collect())
}

/// Reads a whole junction table into owner -> members lists, preserving
/// insertion order via rowid.
fn load_junction(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    member_column: &str,
) -> Result<HashMap<Uuid, Vec<Uuid>>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {owner_column}, {member_column} FROM {table} ORDER BY rowid"
    ))?;
    let mut references: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    let rows = stmt.query_map([], |row| {
        let owner: String = row.get(0)?;
        let member: String = row.get(1)?;
        Ok((owner, member))
    })?;
    for row in rows {
        let (owner, member) = row?;
        references
            .entry(parse_uuid(&owner)?)
            .or_default()
            .push(parse_uuid(&member)?);
    }
    Ok(references)
}

// ============================================================================
// Store summary
// ============================================================================

/// Row counts per entity table, for post-import reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub countries: i64,
    pub languages: i64,
    pub subdivisions: i64,
    pub ounits: i64,
    pub holidays: i64,
}

pub fn entity_counts(conn: &Connection) -> Result<StoreCounts> {
    let count = |table: &str| -> Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .with_context(|| format!("failed to count rows in {table}"))
    };
    Ok(StoreCounts {
        countries: count("countries")?,
        languages: count("languages")?,
        subdivisions: count("subdivisions")?,
        ounits: count("ounits")?,
        holidays: count("holidays")?,
    })
}

// ============================================================================
// Column helpers
// ============================================================================

fn parse_uuid(value: &str) -> std::result::Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn column_uuid(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<Uuid, rusqlite::Error> {
    let value: String = row.get(index)?;
    parse_uuid(&value)
}

fn column_uuid_opt(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<Option<Uuid>, rusqlite::Error> {
    let value: Option<String> = row.get(index)?;
    value.as_deref().map(parse_uuid).transpose()
}

fn column_texts(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<Vec<LocalizedText>, rusqlite::Error> {
    let value: String = row.get(index)?;
    serde_json::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn column_strings(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<Vec<String>, rusqlite::Error> {
    let value: String = row.get(index)?;
    serde_json::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn column_date(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<NaiveDate, rusqlite::Error> {
    let value: String = row.get(index)?;
    value.parse().map_err(|e: chrono::ParseError| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn column_holiday_type(
    row: &rusqlite::Row<'_>,
    index: usize,
) -> std::result::Result<HolidayType, rusqlite::Error> {
    let value: String = row.get(index)?;
    HolidayType::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            format!("unknown holiday type: {value}").into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lang: &str, value: &str) -> LocalizedText {
        LocalizedText::new(lang, value)
    }

    fn test_country(conn: &Connection) -> Country {
        let country = Country {
            id: Uuid::new_v4(),
            iso_code: "DE".to_string(),
            names: vec![text("DE", "Deutschland"), text("EN", "Germany")],
            official_languages: vec!["DE".to_string()],
        };
        insert_country(conn, &country).unwrap();
        country
    }

    #[test]
    fn setup_is_repeatable_and_clears_data() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        test_country(&conn);
        assert_eq!(entity_counts(&conn).unwrap().countries, 1);

        // Re-running setup drops everything
        setup_database(&conn).unwrap();
        assert_eq!(entity_counts(&conn).unwrap().countries, 0);
    }

    #[test]
    fn country_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let country = test_country(&conn);

        let loaded = load_countries(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, country.id);
        assert_eq!(loaded[0].names, country.names);
        assert_eq!(loaded[0].official_languages, country.official_languages);

        assert_eq!(country_id_by_iso(&conn, "DE").unwrap(), Some(country.id));
        assert_eq!(country_id_by_iso(&conn, "FR").unwrap(), None);
    }

    #[test]
    fn duplicate_iso_code_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        test_country(&conn);

        let duplicate = Country {
            id: Uuid::new_v4(),
            iso_code: "DE".to_string(),
            names: vec![text("EN", "Germany")],
            official_languages: vec!["DE".to_string()],
        };
        assert!(insert_country(&conn, &duplicate).is_err());
    }

    #[test]
    fn subdivision_lookup_by_short_name_or_code() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let country = test_country(&conn);

        let subdivision = Subdivision {
            id: Uuid::new_v4(),
            country_id: country.id,
            code: "DE-BE".to_string(),
            iso_code: Some("DE-BE".to_string()),
            short_name: "BE".to_string(),
            categories: vec![text("EN", "federal state")],
            names: vec![text("DE", "Berlin")],
            comments: vec![],
            official_languages: vec!["DE".to_string()],
            parent_id: None,
        };
        insert_subdivision(&conn, &subdivision).unwrap();

        let by_name = subdivision_ref(&conn, country.id, "BE").unwrap();
        let by_code = subdivision_ref(&conn, country.id, "DE-BE").unwrap();
        assert_eq!(by_name, Some((subdivision.id, "DE-BE".to_string())));
        assert_eq!(by_code, by_name);
        assert_eq!(subdivision_ref(&conn, country.id, "XX").unwrap(), None);
    }

    #[test]
    fn holiday_round_trip_with_references() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let country = test_country(&conn);

        let subdivision = Subdivision {
            id: Uuid::new_v4(),
            country_id: country.id,
            code: "DE-BE".to_string(),
            iso_code: None,
            short_name: "BE".to_string(),
            categories: vec![text("EN", "federal state")],
            names: vec![text("DE", "Berlin")],
            comments: vec![],
            official_languages: vec!["DE".to_string()],
            parent_id: None,
        };
        insert_subdivision(&conn, &subdivision).unwrap();

        let holiday = Holiday {
            id: Uuid::new_v4(),
            country_id: country.id,
            holiday_type: HolidayType::School,
            start_date: "2023-06-01".parse().unwrap(),
            end_date: "2023-06-10".parse().unwrap(),
            names: vec![text("DE", "Sommerferien")],
            comments: vec![],
            nationwide: false,
            subdivision_ids: vec![subdivision.id],
            ounit_ids: vec![],
        };
        insert_holiday(&conn, &holiday).unwrap();

        let loaded = load_holidays(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, holiday.id);
        assert_eq!(loaded[0].subdivision_ids, vec![subdivision.id]);
        assert_eq!(loaded[0].holiday_type, HolidayType::School);
        assert!(!loaded[0].nationwide);
    }
}
