use std::io::{Read, Write};

use serde::Deserialize;

use crate::config::MetricCatalog;
use crate::ingest::IDENTITY_HEADERS;
use crate::models::RosterEntry;

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Section")]
    section: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "A Number")]
    a_number: String,
    #[serde(rename = "Email", default)]
    email: String,
}

/// Course sections encode the AS year in their number ("AS 2101" is a 200).
pub fn as_year_for_section(section: &str) -> &'static str {
    if section.contains("11") {
        "100"
    } else if section.contains("21") {
        "200"
    } else if section.contains("31") {
        "300"
    } else if section.contains("41") {
        "400"
    } else {
        "0"
    }
}

pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<RosterEntry>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for record in csv_reader.deserialize::<RosterRow>() {
        let row = record?;
        entries.push(RosterEntry {
            as_year: as_year_for_section(&row.section).to_string(),
            a_number: row.a_number,
            last_name: row.last_name,
            first_name: row.first_name,
            email: row.email,
            flight: String::new(),
        });
    }

    Ok(entries)
}

/// Blank score-entry sheet: identity columns filled in, one column per
/// metric followed by its comments column.
pub fn write_score_sheet<W: Write>(
    writer: W,
    catalog: &MetricCatalog,
    cadets: &[RosterEntry],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut headers: Vec<String> = IDENTITY_HEADERS.iter().map(|h| h.to_string()).collect();
    for metric in catalog.ids() {
        headers.push(catalog.get(metric).name.clone());
        headers.push(catalog.comments_column(metric));
    }
    csv_writer.write_record(&headers)?;

    let blanks = vec![""; catalog.len() * 2];
    for cadet in cadets {
        let mut record = vec![
            cadet.a_number.as_str(),
            cadet.last_name.as_str(),
            cadet.first_name.as_str(),
            cadet.flight.as_str(),
            cadet.as_year.as_str(),
        ];
        record.extend(blanks.iter().copied());
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}
