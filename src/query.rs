// Holiday query engine
//
// All queries are read-only and stateless per call, served from the
// immutable snapshot. Result lists ascend by start date. Unknown country
// or region codes are opaque filters and yield empty results, never
// errors; only an oversized date range is rejected.

use chrono::NaiveDate;

use crate::entities::{Holiday, OUnit, Subdivision, TypeFamily};
use crate::error::QueryError;
use crate::regions::code_contains;
use crate::snapshot::Snapshot;

/// Maximum span of a single range query, in days. Bounds result-set and
/// computation size per call.
pub const MAX_RANGE_DAYS: i64 = 365 * 3;

/// Filter shared by the range and statistics queries.
#[derive(Debug, Clone, Copy)]
pub struct HolidayFilter<'a> {
    /// ISO 3166-1 code of the country
    pub country_iso_code: &'a str,
    /// Subdivision or organizational unit code, hierarchical
    pub region_code: Option<&'a str>,
    /// Public-like or school-like surface
    pub family: TypeFamily,
}

impl<'a> HolidayFilter<'a> {
    pub fn new(country_iso_code: &'a str, family: TypeFamily) -> Self {
        HolidayFilter {
            country_iso_code,
            region_code: None,
            family,
        }
    }

    pub fn with_region(mut self, region_code: Option<&'a str>) -> Self {
        self.region_code = match region_code {
            Some("") | None => None,
            Some(code) => Some(code),
        };
        self
    }
}

/// Returns the holidays of the requested family for a country whose
/// `[start_date, end_date]` overlaps `[valid_from, valid_to]`, scoped by
/// the optional region code.
///
/// A holiday is in scope when it is nationwide, no region code was
/// requested, or the requested code contains one of its associated
/// subdivision/organizational unit codes (so a request for `DE-BE` also
/// matches holidays scoped to the finer `DE-BE-1`).
pub fn holidays_in_range<'a>(
    snapshot: &'a Snapshot,
    filter: &HolidayFilter<'_>,
    valid_from: NaiveDate,
    valid_to: NaiveDate,
) -> Result<Vec<&'a Holiday>, QueryError> {
    if (valid_to - valid_from).num_days() > MAX_RANGE_DAYS {
        return Err(QueryError::DateRangeTooLarge {
            max_days: MAX_RANGE_DAYS,
        });
    }

    let Some(country) = snapshot.country_by_iso(filter.country_iso_code) else {
        return Ok(Vec::new());
    };

    let mut holidays: Vec<&Holiday> = snapshot
        .holidays
        .iter()
        .filter(|h| h.country_id == country.id)
        .filter(|h| filter.family.includes(h.holiday_type))
        .filter(|h| h.overlaps(valid_from, valid_to))
        .filter(|h| matches_region(snapshot, h, filter.region_code))
        .collect();
    holidays.sort_by_key(|h| h.start_date);

    Ok(holidays)
}

/// Returns the holidays of a family falling on a single date, across all
/// countries.
pub fn holidays_by_date(
    snapshot: &Snapshot,
    family: TypeFamily,
    date: NaiveDate,
) -> Vec<&Holiday> {
    let mut holidays: Vec<&Holiday> = snapshot
        .holidays
        .iter()
        .filter(|h| family.includes(h.holiday_type))
        .filter(|h| h.covers(date))
        .collect();
    holidays.sort_by_key(|h| h.start_date);
    holidays
}

/// Min/max start date over the range-query predicate, without the date
/// bound itself. `None` fields when nothing matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateStatistics {
    pub oldest_start_date: Option<NaiveDate>,
    pub youngest_start_date: Option<NaiveDate>,
}

pub fn statistics(snapshot: &Snapshot, filter: &HolidayFilter<'_>) -> DateStatistics {
    let Some(country) = snapshot.country_by_iso(filter.country_iso_code) else {
        return DateStatistics::default();
    };

    let mut stats = DateStatistics::default();
    for holiday in snapshot
        .holidays
        .iter()
        .filter(|h| h.country_id == country.id)
        .filter(|h| filter.family.includes(h.holiday_type))
        .filter(|h| matches_region(snapshot, h, filter.region_code))
    {
        let start = holiday.start_date;
        if stats.oldest_start_date.map(|d| start < d).unwrap_or(true) {
            stats.oldest_start_date = Some(start);
        }
        if stats.youngest_start_date.map(|d| start > d).unwrap_or(true) {
            stats.youngest_start_date = Some(start);
        }
    }
    stats
}

fn matches_region(snapshot: &Snapshot, holiday: &Holiday, region_code: Option<&str>) -> bool {
    let Some(requested) = region_code else {
        return true;
    };
    holiday.nationwide
        || snapshot
            .holiday_region_codes(holiday)
            .any(|code| code_contains(requested, code))
}

// ============================================================================
// Regional listings
// ============================================================================

/// A subdivision with its children materialized recursively.
#[derive(Debug)]
pub struct SubdivisionNode<'a> {
    pub subdivision: &'a Subdivision,
    pub children: Vec<SubdivisionNode<'a>>,
}

/// Top-level subdivisions of a country with nested children, ordered by
/// code on every level.
pub fn subdivision_tree<'a>(snapshot: &'a Snapshot, country_iso_code: &str) -> Vec<SubdivisionNode<'a>> {
    let Some(country) = snapshot.country_by_iso(country_iso_code) else {
        return Vec::new();
    };

    let mut roots: Vec<&Subdivision> = snapshot
        .subdivisions
        .iter()
        .filter(|s| s.country_id == country.id && s.parent_id.is_none())
        .collect();
    roots.sort_by(|a, b| a.code.cmp(&b.code));

    roots
        .into_iter()
        .map(|root| subdivision_node(snapshot, root))
        .collect()
}

fn subdivision_node<'a>(snapshot: &'a Snapshot, subdivision: &'a Subdivision) -> SubdivisionNode<'a> {
    let mut children: Vec<&Subdivision> = snapshot
        .subdivision_children
        .children(subdivision.id)
        .iter()
        .filter_map(|&id| snapshot.subdivision(id))
        .collect();
    children.sort_by(|a, b| a.code.cmp(&b.code));

    SubdivisionNode {
        subdivision,
        children: children
            .into_iter()
            .map(|child| subdivision_node(snapshot, child))
            .collect(),
    }
}

/// An organizational unit with its children materialized recursively.
#[derive(Debug)]
pub struct OUnitNode<'a> {
    pub ounit: &'a OUnit,
    pub children: Vec<OUnitNode<'a>>,
}

/// Organizational units of a country with nested children, ordered by
/// code. Without a subdivision filter the top-level units are listed;
/// with one, every unit (on any level) spanning a subdivision inside the
/// requested code becomes a root.
pub fn ounit_tree<'a>(
    snapshot: &'a Snapshot,
    country_iso_code: &str,
    subdivision_code: Option<&str>,
) -> Vec<OUnitNode<'a>> {
    let Some(country) = snapshot.country_by_iso(country_iso_code) else {
        return Vec::new();
    };

    let subdivision_code = match subdivision_code {
        Some("") | None => None,
        Some(code) => Some(code),
    };

    let mut roots: Vec<&OUnit> = snapshot
        .ounits
        .iter()
        .filter(|o| o.country_id == country.id)
        .filter(|o| match subdivision_code {
            None => o.parent_id.is_none(),
            Some(code) => spans_subdivision(snapshot, o, code),
        })
        .collect();
    roots.sort_by(|a, b| a.code.cmp(&b.code));

    roots
        .into_iter()
        .map(|root| ounit_node(snapshot, root))
        .collect()
}

fn spans_subdivision(snapshot: &Snapshot, ounit: &OUnit, code: &str) -> bool {
    ounit
        .subdivision_ids
        .iter()
        .filter_map(|&id| snapshot.subdivision(id))
        .any(|s| code_contains(code, &s.code))
}

fn ounit_node<'a>(snapshot: &'a Snapshot, ounit: &'a OUnit) -> OUnitNode<'a> {
    let mut children: Vec<&OUnit> = snapshot
        .ounit_children
        .children(ounit.id)
        .iter()
        .filter_map(|&id| snapshot.ounit(id))
        .collect();
    children.sort_by(|a, b| a.code.cmp(&b.code));

    OUnitNode {
        ounit,
        children: children
            .into_iter()
            .map(|child| ounit_node(snapshot, child))
            .collect(),
    }
}
