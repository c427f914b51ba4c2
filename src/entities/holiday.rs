// Holiday entity and type classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::localized::LocalizedText;

/// Type of holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolidayType {
    /// Public holiday
    Public,

    /// Bank holiday
    Bank,

    /// School holiday
    School,

    /// Back to school (informative date, no holiday)
    BackToSchool,

    /// End of lessons (informative date, no holiday)
    EndOfLessons,
}

impl HolidayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolidayType::Public => "Public",
            HolidayType::Bank => "Bank",
            HolidayType::School => "School",
            HolidayType::BackToSchool => "BackToSchool",
            HolidayType::EndOfLessons => "EndOfLessons",
        }
    }

    /// Parses the CSV spelling of a holiday type.
    pub fn parse(value: &str) -> Option<HolidayType> {
        match value {
            "Public" => Some(HolidayType::Public),
            "Bank" => Some(HolidayType::Bank),
            "School" => Some(HolidayType::School),
            "BackToSchool" => Some(HolidayType::BackToSchool),
            "EndOfLessons" => Some(HolidayType::EndOfLessons),
            _ => None,
        }
    }

    /// The query surface this type belongs to.
    pub fn family(&self) -> TypeFamily {
        match self {
            HolidayType::Public | HolidayType::Bank => TypeFamily::Public,
            HolidayType::School | HolidayType::BackToSchool | HolidayType::EndOfLessons => {
                TypeFamily::School
            }
        }
    }
}

/// Routing of holiday types into the two disjoint query surfaces:
/// public-like holidays and school-like holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    /// Public and bank holidays
    Public,
    /// School holidays and school-related informative dates
    School,
}

impl TypeFamily {
    pub fn includes(&self, holiday_type: HolidayType) -> bool {
        holiday_type.family() == *self
    }
}

/// A holiday entry.
///
/// The `id` is caller-supplied in the source data and stable across
/// re-imports. `nationwide` is true exactly when the holiday carries no
/// explicit subdivision or organizational unit scoping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Uuid,

    /// Owning country
    pub country_id: Uuid,

    pub holiday_type: HolidayType,

    /// First day of the holiday
    pub start_date: NaiveDate,

    /// Last day of the holiday, inclusive; never before `start_date`
    pub end_date: NaiveDate,

    /// Localized holiday names, at least one
    pub names: Vec<LocalizedText>,

    /// Additional localized comments
    pub comments: Vec<LocalizedText>,

    /// True iff no explicit regional scoping was supplied
    pub nationwide: bool,

    /// Explicitly associated subdivisions
    pub subdivision_ids: Vec<Uuid>,

    /// Explicitly associated organizational units
    pub ounit_ids: Vec<Uuid>,
}

impl Holiday {
    /// Three-way date range overlap test: the holiday starts in the range,
    /// ends in the range, or spans the whole range.
    pub fn overlaps(&self, valid_from: NaiveDate, valid_to: NaiveDate) -> bool {
        let starts_in_range = self.start_date >= valid_from && self.start_date <= valid_to;
        let ends_in_range = self.end_date >= valid_from && self.end_date <= valid_to;
        let spans_range = self.start_date < valid_from && self.end_date > valid_to;
        starts_in_range || ends_in_range || spans_range
    }

    /// True when `date` falls on the holiday, boundaries included.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn holiday(start: &str, end: &str) -> Holiday {
        Holiday {
            id: Uuid::new_v4(),
            country_id: Uuid::new_v4(),
            holiday_type: HolidayType::School,
            start_date: date(start),
            end_date: date(end),
            names: vec![],
            comments: vec![],
            nationwide: true,
            subdivision_ids: vec![],
            ounit_ids: vec![],
        }
    }

    #[test]
    fn families_are_disjoint_and_total() {
        for t in [
            HolidayType::Public,
            HolidayType::Bank,
            HolidayType::School,
            HolidayType::BackToSchool,
            HolidayType::EndOfLessons,
        ] {
            assert_ne!(
                TypeFamily::Public.includes(t),
                TypeFamily::School.includes(t)
            );
        }
        assert!(TypeFamily::Public.includes(HolidayType::Bank));
        assert!(TypeFamily::School.includes(HolidayType::EndOfLessons));
    }

    #[test]
    fn type_parse_round_trip() {
        for t in [
            HolidayType::Public,
            HolidayType::Bank,
            HolidayType::School,
            HolidayType::BackToSchool,
            HolidayType::EndOfLessons,
        ] {
            assert_eq!(HolidayType::parse(t.as_str()), Some(t));
        }
        assert_eq!(HolidayType::parse("Carnival"), None);
    }

    #[test]
    fn overlap_when_holiday_ends_inside_range() {
        let h = holiday("2023-06-01", "2023-06-10");
        assert!(h.overlaps(date("2023-06-05"), date("2023-06-20")));
    }

    #[test]
    fn overlap_when_holiday_fully_inside_range() {
        let h = holiday("2023-06-01", "2023-06-10");
        assert!(h.overlaps(date("2023-01-01"), date("2023-12-31")));
    }

    #[test]
    fn overlap_when_holiday_spans_range() {
        let h = holiday("2023-06-01", "2023-06-30");
        assert!(h.overlaps(date("2023-06-10"), date("2023-06-12")));
    }

    #[test]
    fn no_overlap_when_range_fully_after_holiday() {
        let h = holiday("2023-06-01", "2023-06-10");
        assert!(!h.overlaps(date("2023-07-01"), date("2023-12-31")));
    }

    #[test]
    fn covers_includes_boundaries() {
        let h = holiday("2023-06-01", "2023-06-10");
        assert!(h.covers(date("2023-06-01")));
        assert!(h.covers(date("2023-06-10")));
        assert!(!h.covers(date("2023-05-31")));
        assert!(!h.covers(date("2023-06-11")));
    }
}
