// Compact output formats: CSV and iCalendar
//
// Both formats carry a single language per text field: the scalar
// resolver projection reduces the (already language-filtered) response
// lists to one entry, preferring the default language when the caller
// did not request one. Empty collections are omitted rather than
// rendered as empty cells or properties.

use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};

use crate::localized::{self, LocalizedText, DEFAULT_LANGUAGE};
use crate::responses::{
    CountryResponse, HolidayResponse, LanguageResponse, OUnitResponse, SubdivisionResponse,
};

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush csv writer: {e}"))?;
    Ok(String::from_utf8(data)?)
}

fn single_text(texts: &[LocalizedText]) -> String {
    localized::resolve_text(texts, Some(DEFAULT_LANGUAGE)).unwrap_or_default()
}

// ============================================================================
// CSV
// ============================================================================

pub fn countries_to_csv(countries: &[CountryResponse]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["IsoCode", "Name", "OfficialLanguages"])?;
    for country in countries {
        writer.write_record([
            country.iso_code.as_str(),
            &single_text(&country.names),
            &country.official_languages.join(","),
        ])?;
    }
    into_string(writer)
}

pub fn languages_to_csv(languages: &[LanguageResponse]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["IsoCode", "Name"])?;
    for language in languages {
        writer.write_record([language.iso_code.as_str(), &single_text(&language.names)])?;
    }
    into_string(writer)
}

/// Flattens the subdivision tree depth-first, parents before children.
pub fn subdivisions_to_csv(subdivisions: &[SubdivisionResponse]) -> Result<String> {
    fn write_node(
        writer: &mut csv::Writer<Vec<u8>>,
        node: &SubdivisionResponse,
    ) -> Result<()> {
        writer.write_record([
            node.code.as_str(),
            node.iso_code.as_deref().unwrap_or(""),
            &node.short_name,
            &single_text(&node.categories),
            &single_text(&node.names),
            &node.official_languages.join(","),
        ])?;
        for child in &node.children {
            write_node(writer, child)?;
        }
        Ok(())
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Code",
        "IsoCode",
        "ShortName",
        "Category",
        "Name",
        "OfficialLanguages",
    ])?;
    for subdivision in subdivisions {
        write_node(&mut writer, subdivision)?;
    }
    into_string(writer)
}

pub fn ounits_to_csv(ounits: &[OUnitResponse]) -> Result<String> {
    fn write_node(writer: &mut csv::Writer<Vec<u8>>, node: &OUnitResponse) -> Result<()> {
        writer.write_record([
            node.code.as_str(),
            &node.short_name,
            &single_text(&node.names),
            &node.subdivisions.join(","),
        ])?;
        for child in &node.children {
            write_node(writer, child)?;
        }
        Ok(())
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Code", "ShortName", "Name", "Subdivisions"])?;
    for ounit in ounits {
        write_node(&mut writer, ounit)?;
    }
    into_string(writer)
}

pub fn holidays_to_csv(holidays: &[HolidayResponse]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Id",
        "StartDate",
        "EndDate",
        "Type",
        "Name",
        "Nationwide",
        "Subdivisions",
        "OUnits",
        "Comment",
    ])?;
    for holiday in holidays {
        let subdivisions: Vec<&str> = holiday
            .subdivisions
            .iter()
            .map(|s| s.code.as_str())
            .collect();
        let ounits: Vec<&str> = holiday.ounits.iter().map(|o| o.code.as_str()).collect();
        writer.write_record([
            holiday.id.to_string().as_str(),
            &holiday.start_date.to_string(),
            &holiday.end_date.to_string(),
            holiday.holiday_type.as_str(),
            &single_text(&holiday.names),
            if holiday.nationwide { "true" } else { "false" },
            &subdivisions.join(","),
            &ounits.join(","),
            &single_text(&holiday.comments),
        ])?;
    }
    into_string(writer)
}

// ============================================================================
// iCalendar
// ============================================================================

/// Renders holidays as a VCALENDAR with one VEVENT per holiday.
///
/// UID is the hyphenless holiday id, DTEND is exclusive (end date plus
/// one day). The summary is the resolved name, suffixed with the
/// subdivision short names when the holiday is not nationwide, the
/// organizational unit short names in brackets, and a `*` marker when a
/// comment carries further detail.
pub fn holidays_to_ics(holidays: &[HolidayResponse]) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, "PRODID:-//holiday-data//EN");

    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();

    for holiday in holidays {
        push_line(&mut out, "BEGIN:VEVENT");
        push_line(&mut out, &format!("UID:{}", holiday.id.simple()));
        push_line(&mut out, &format!("DTSTAMP:{timestamp}"));
        push_line(
            &mut out,
            &format!("DTSTART;VALUE=DATE:{}", ics_date(holiday.start_date)),
        );
        push_line(
            &mut out,
            &format!(
                "DTEND;VALUE=DATE:{}",
                ics_date(holiday.end_date + Days::new(1))
            ),
        );

        let mut summary = single_text(&holiday.names);
        if !holiday.nationwide && !holiday.subdivisions.is_empty() {
            let short_names: Vec<&str> = holiday
                .subdivisions
                .iter()
                .map(|s| s.short_name.as_str())
                .collect();
            summary = format!("{summary} ({})", short_names.join(","));
        }
        if !holiday.ounits.is_empty() {
            let short_names: Vec<&str> =
                holiday.ounits.iter().map(|o| o.short_name.as_str()).collect();
            summary = format!("{summary} [{}]", short_names.join(","));
        }
        if !holiday.comments.is_empty() {
            summary.push('*');
        }

        let language = localized::resolve_language(&holiday.names, Some(DEFAULT_LANGUAGE));
        match language {
            Some(language) => push_line(
                &mut out,
                &format!("SUMMARY;LANGUAGE={language}:{}", ics_escape(&summary)),
            ),
            None => push_line(&mut out, &format!("SUMMARY:{}", ics_escape(&summary))),
        }

        push_line(&mut out, &format!("CATEGORIES:{}", holiday.holiday_type.as_str()));
        push_line(&mut out, "CLASS:PUBLIC");
        push_line(&mut out, "TRANSP:OPAQUE");

        if let Some(comment) = localized::resolve_text(&holiday.comments, Some(DEFAULT_LANGUAGE)) {
            push_line(
                &mut out,
                &format!("DESCRIPTION:*{}", ics_escape(&comment)),
            );
        }

        push_line(&mut out, "END:VEVENT");
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

fn ics_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Escapes TEXT values per RFC 5545 §3.3.11.
fn ics_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::{OUnitReference, SubdivisionReference};
    use uuid::Uuid;

    fn holiday_response() -> HolidayResponse {
        HolidayResponse {
            id: "63aeed7a-8c31-47af-b1c7-f26dd51f3c19".parse().unwrap(),
            start_date: "2023-06-22".parse().unwrap(),
            end_date: "2023-08-04".parse().unwrap(),
            holiday_type: crate::entities::HolidayType::School,
            names: vec![LocalizedText::new("DE", "Sommerferien")],
            nationwide: false,
            subdivisions: vec![SubdivisionReference {
                code: "DE-BE".to_string(),
                short_name: "BE".to_string(),
            }],
            ounits: vec![],
            comments: vec![],
        }
    }

    #[test]
    fn holiday_csv_row_carries_single_language_text() {
        let csv = holidays_to_csv(&[holiday_response()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Id,StartDate,EndDate,Type,Name,Nationwide,Subdivisions,OUnits,Comment"
        );
        let row = lines.next().unwrap();
        assert!(row.contains("Sommerferien"));
        assert!(row.contains("2023-06-22"));
        assert!(row.contains("DE-BE"));
        assert!(row.ends_with(',')); // empty comment cell
    }

    #[test]
    fn requested_language_flows_into_csv_projection() {
        // Names as stored: EN and DE. Resolving for DE leaves exactly the
        // DE entry, and the CSV scalar projection picks it up.
        let stored = vec![
            LocalizedText::new("EN", "Summer holidays"),
            LocalizedText::new("DE", "Sommerferien"),
        ];
        let mut response = holiday_response();
        response.names = localized::resolve(&stored, Some("DE"));
        assert_eq!(response.names.len(), 1);

        let csv = holidays_to_csv(&[response]).unwrap();
        assert!(csv.contains("Sommerferien"));
        assert!(!csv.contains("Summer holidays"));
    }

    #[test]
    fn country_csv_prefers_default_language() {
        let country = CountryResponse {
            iso_code: "DE".to_string(),
            names: vec![
                LocalizedText::new("DE", "Deutschland"),
                LocalizedText::new("EN", "Germany"),
            ],
            official_languages: vec!["DE".to_string()],
        };
        let csv = countries_to_csv(&[country]).unwrap();
        assert!(csv.contains("DE,Germany,DE"));
    }

    #[test]
    fn ics_event_uses_exclusive_end_date_and_hyphenless_uid() {
        let ics = holidays_to_ics(&[holiday_response()]);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("UID:63aeed7a8c3147afb1c7f26dd51f3c19\r\n"));
        assert!(ics.contains("DTSTART;VALUE=DATE:20230622\r\n"));
        // End date is inclusive in the data model, exclusive in iCalendar
        assert!(ics.contains("DTEND;VALUE=DATE:20230805\r\n"));
        assert!(ics.contains("SUMMARY;LANGUAGE=DE:Sommerferien (BE)\r\n"));
        assert!(!ics.contains("DESCRIPTION"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn ics_comment_marks_summary_and_adds_description() {
        let mut response = holiday_response();
        response.comments = vec![LocalizedText::new("EN", "movable; school only")];
        response.ounits = vec![OUnitReference {
            code: "DE-ABS".to_string(),
            short_name: "ABS".to_string(),
        }];

        let ics = holidays_to_ics(&[response]);
        assert!(ics.contains("SUMMARY;LANGUAGE=DE:Sommerferien (BE) [ABS]*\r\n"));
        assert!(ics.contains("DESCRIPTION:*movable\\; school only\r\n"));
    }

    #[test]
    fn nationwide_summary_has_no_region_suffix() {
        let mut response = holiday_response();
        response.nationwide = true;
        response.subdivisions.clear();

        let ics = holidays_to_ics(&[response]);
        assert!(ics.contains("SUMMARY;LANGUAGE=DE:Sommerferien\r\n"));
    }

    #[test]
    fn uuid_formatting_is_stable() {
        let id: Uuid = "63aeed7a-8c31-47af-b1c7-f26dd51f3c19".parse().unwrap();
        assert_eq!(id.simple().to_string(), "63aeed7a8c3147afb1c7f26dd51f3c19");
    }
}
