// Response projections for the query surface
//
// Every localized field passes through the resolver with the caller's
// language code before it leaves the system. Field order is stable per
// schema version; JSON keeps empty collections, the compact formats drop
// them.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{Country, Holiday, HolidayType, Language};
use crate::localized::{self, LocalizedText};
use crate::query::{DateStatistics, OUnitNode, SubdivisionNode};
use crate::snapshot::Snapshot;

/// Reference to a subdivision a holiday is scoped to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdivisionReference {
    pub code: String,
    pub short_name: String,
}

/// Reference to an organizational unit a holiday is scoped to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OUnitReference {
    pub code: String,
    pub short_name: String,
}

/// Reference to a country.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryReference {
    pub iso_code: String,
}

/// Representation of a holiday.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayResponse {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub holiday_type: HolidayType,
    pub names: Vec<LocalizedText>,
    pub nationwide: bool,
    pub subdivisions: Vec<SubdivisionReference>,
    #[serde(rename = "oUnits")]
    pub ounits: Vec<OUnitReference>,
    pub comments: Vec<LocalizedText>,
}

impl HolidayResponse {
    pub fn new(snapshot: &Snapshot, holiday: &Holiday, language: Option<&str>) -> Self {
        HolidayResponse {
            id: holiday.id,
            start_date: holiday.start_date,
            end_date: holiday.end_date,
            holiday_type: holiday.holiday_type,
            names: localized::resolve(&holiday.names, language),
            nationwide: holiday.nationwide,
            subdivisions: holiday
                .subdivision_ids
                .iter()
                .filter_map(|&id| snapshot.subdivision(id))
                .map(|s| SubdivisionReference {
                    code: s.code.clone(),
                    short_name: s.short_name.clone(),
                })
                .collect(),
            ounits: holiday
                .ounit_ids
                .iter()
                .filter_map(|&id| snapshot.ounit(id))
                .map(|o| OUnitReference {
                    code: o.code.clone(),
                    short_name: o.short_name.clone(),
                })
                .collect(),
            comments: localized::resolve(&holiday.comments, language),
        }
    }
}

/// Representation of a holiday matched by a single date, country included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolidayByDateResponse {
    pub id: Uuid,
    pub country: CountryReference,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub holiday_type: HolidayType,
    pub names: Vec<LocalizedText>,
    pub nationwide: bool,
    pub subdivisions: Vec<SubdivisionReference>,
    #[serde(rename = "oUnits")]
    pub ounits: Vec<OUnitReference>,
    pub comments: Vec<LocalizedText>,
}

impl HolidayByDateResponse {
    pub fn new(snapshot: &Snapshot, holiday: &Holiday, language: Option<&str>) -> Self {
        let base = HolidayResponse::new(snapshot, holiday, language);
        let iso_code = snapshot
            .countries
            .iter()
            .find(|c| c.id == holiday.country_id)
            .map(|c| c.iso_code.clone())
            .unwrap_or_default();

        HolidayByDateResponse {
            id: base.id,
            country: CountryReference { iso_code },
            start_date: base.start_date,
            end_date: base.end_date,
            holiday_type: base.holiday_type,
            names: base.names,
            nationwide: base.nationwide,
            subdivisions: base.subdivisions,
            ounits: base.ounits,
            comments: base.comments,
        }
    }
}

/// Representation of a country as defined in ISO 3166-1.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryResponse {
    pub iso_code: String,
    pub names: Vec<LocalizedText>,
    pub official_languages: Vec<String>,
}

impl CountryResponse {
    pub fn new(country: &Country, language: Option<&str>) -> Self {
        CountryResponse {
            iso_code: country.iso_code.clone(),
            names: localized::resolve(&country.names, language),
            official_languages: country.official_languages.clone(),
        }
    }
}

/// Representation of a language as defined in ISO-639-1.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageResponse {
    pub iso_code: String,
    pub names: Vec<LocalizedText>,
}

impl LanguageResponse {
    pub fn new(lang: &Language, language: Option<&str>) -> Self {
        LanguageResponse {
            iso_code: lang.iso_code.clone(),
            names: localized::resolve(&lang.names, language),
        }
    }
}

/// Representation of a subdivision with its children nested recursively.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubdivisionResponse {
    pub code: String,
    pub iso_code: Option<String>,
    pub short_name: String,
    pub categories: Vec<LocalizedText>,
    pub names: Vec<LocalizedText>,
    pub official_languages: Vec<String>,
    pub comments: Vec<LocalizedText>,
    pub children: Vec<SubdivisionResponse>,
}

impl SubdivisionResponse {
    pub fn new(node: &SubdivisionNode<'_>, language: Option<&str>) -> Self {
        let subdivision = node.subdivision;
        SubdivisionResponse {
            code: subdivision.code.clone(),
            iso_code: subdivision.iso_code.clone(),
            short_name: subdivision.short_name.clone(),
            categories: localized::resolve(&subdivision.categories, language),
            names: localized::resolve(&subdivision.names, language),
            official_languages: subdivision.official_languages.clone(),
            comments: localized::resolve(&subdivision.comments, language),
            children: node
                .children
                .iter()
                .map(|child| SubdivisionResponse::new(child, language))
                .collect(),
        }
    }
}

/// Representation of an organizational unit with its children nested
/// recursively.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OUnitResponse {
    pub code: String,
    pub short_name: String,
    pub names: Vec<LocalizedText>,
    pub comments: Vec<LocalizedText>,
    /// Codes of the subdivisions this unit spans
    pub subdivisions: Vec<String>,
    pub children: Vec<OUnitResponse>,
}

impl OUnitResponse {
    pub fn new(snapshot: &Snapshot, node: &OUnitNode<'_>, language: Option<&str>) -> Self {
        let ounit = node.ounit;
        OUnitResponse {
            code: ounit.code.clone(),
            short_name: ounit.short_name.clone(),
            names: localized::resolve(&ounit.names, language),
            comments: localized::resolve(&ounit.comments, language),
            subdivisions: ounit
                .subdivision_ids
                .iter()
                .filter_map(|&id| snapshot.subdivision(id))
                .map(|s| s.code.clone())
                .collect(),
            children: node
                .children
                .iter()
                .map(|child| OUnitResponse::new(snapshot, child, language))
                .collect(),
        }
    }
}

/// Statistical data about stored holidays.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResponse {
    pub oldest_start_date: Option<NaiveDate>,
    pub youngest_start_date: Option<NaiveDate>,
}

impl From<DateStatistics> for StatisticsResponse {
    fn from(stats: DateStatistics) -> Self {
        StatisticsResponse {
            oldest_start_date: stats.oldest_start_date,
            youngest_start_date: stats.youngest_start_date,
        }
    }
}
