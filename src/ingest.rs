use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::{MetricId, ScoringConfig};
use crate::error::ScoreError;
use crate::models::{Cadet, CadetIdentity, CohortAssignment, ScoreValue};

pub const A_NUMBER: &str = "A Number";
pub const LAST_NAME: &str = "Last Name";
pub const FIRST_NAME: &str = "First Name";
pub const FLIGHT: &str = "Flight";
pub const AS_YEAR: &str = "AS Year";

pub const IDENTITY_HEADERS: [&str; 5] = [A_NUMBER, LAST_NAME, FIRST_NAME, FLIGHT, AS_YEAR];
const REQUIRED_HEADERS: [&str; 4] = [A_NUMBER, LAST_NAME, FIRST_NAME, AS_YEAR];

/// One score sheet row keyed by column header.
pub type RawRow = HashMap<String, String>;

#[derive(Debug, Default)]
pub struct ScoreSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn read_sheet<R: Read>(reader: R) -> Result<ScoreSheet, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(ScoreSheet { headers, rows })
}

/// Checks the header row and returns the comments column bound to each metric.
fn comment_columns(
    headers: &[String],
    config: &ScoringConfig,
) -> Result<HashMap<MetricId, String>, ScoreError> {
    for required in REQUIRED_HEADERS {
        if !headers.iter().any(|header| header == required) {
            return Err(ScoreError::MissingColumn(required));
        }
    }

    let mut columns = HashMap::new();
    for header in headers {
        if let Some(metric) = config.metrics.comments_target(header)? {
            columns.insert(metric, header.clone());
        }
    }
    Ok(columns)
}

fn cell<'a>(row: &'a RawRow, column: &str) -> &'a str {
    row.get(column).map(String::as_str).unwrap_or("")
}

pub fn build_cadet(
    row: &RawRow,
    config: &ScoringConfig,
    comments: &HashMap<MetricId, String>,
) -> Result<Cadet, ScoreError> {
    let identity = CadetIdentity::new(
        cell(row, A_NUMBER),
        cell(row, LAST_NAME),
        cell(row, FIRST_NAME),
        cell(row, FLIGHT),
    );

    let label = cell(row, AS_YEAR).trim();
    let group = config
        .cohorts
        .resolve(label)
        .ok_or_else(|| ScoreError::UnknownCohortLabel {
            a_number: identity.a_number.clone(),
            label: label.to_string(),
        })?;
    let cohort = CohortAssignment {
        label: label.to_string(),
        group: group.group.clone(),
        pool: group.ranked.then(|| group.group.clone()),
    };

    let scores = config
        .metrics
        .ids()
        .map(|metric| {
            let def = config.metrics.get(metric);
            let mut value = ScoreValue::parse(metric, cell(row, &def.name), def.max_value);
            if let Some(column) = comments.get(&metric) {
                value.comment = cell(row, column).trim().to_string();
            }
            value
        })
        .collect();

    Ok(Cadet::new(identity, cohort, scores))
}

/// Turns every row into a cadet, failing the whole sheet on the first bad row.
pub fn build_cadets(sheet: &ScoreSheet, config: &ScoringConfig) -> Result<Vec<Cadet>, ScoreError> {
    let comments = comment_columns(&sheet.headers, config)?;
    for metric in config.metrics.ids() {
        let name = &config.metrics.get(metric).name;
        if !sheet.headers.iter().any(|header| header == name) {
            debug!(metric = %name, "metric column absent; scores treated as not attempted");
        }
    }

    sheet
        .rows
        .iter()
        .map(|row| build_cadet(row, config, &comments))
        .collect()
}

pub fn load_cadets(path: &Path, config: &ScoringConfig) -> anyhow::Result<Vec<Cadet>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open score sheet {}", path.display()))?;
    let sheet = read_sheet(file)
        .with_context(|| format!("failed to read score sheet {}", path.display()))?;
    let cadets = build_cadets(&sheet, config)?;
    info!(rows = sheet.rows.len(), path = %path.display(), "score sheet loaded");
    Ok(cadets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attempt;

    const SHEET: &str = "\
A Number,Last Name,First Name,Flight,AS Year,MKT,Radio Reports Practical,Radio Reports Practical Comments,Notes
 A001 , Lee ,Avery,Alpha,100,88,70,Clear and concise,ignored
A002,Moreno,Jules,Bravo,150,N/A,,,
,,,,,,,,
A003,Patel,Kiara,Alpha,300,91,80,Strong,
";

    fn sheet() -> ScoreSheet {
        read_sheet(SHEET.as_bytes()).expect("sheet parses")
    }

    #[test]
    fn skips_blank_rows() {
        assert_eq!(sheet().rows.len(), 3);
    }

    #[test]
    fn builds_cadets_with_comments_and_cohorts() {
        let config = ScoringConfig::builtin();
        let cadets = build_cadets(&sheet(), &config).expect("cadets build");
        assert_eq!(cadets.len(), 3);

        let lee = &cadets[0];
        assert_eq!(lee.identity().a_number, "A001");
        assert_eq!(lee.identity().last_name, "Lee");
        assert_eq!(lee.cohort().pool.as_deref(), Some("first-year"));

        let radio = config.metrics.lookup("Radio Reports Practical").unwrap();
        let practical = lee.score(radio).expect("score present");
        assert_eq!(practical.attempt, Attempt::Scored(70));
        assert_eq!(practical.comment, "Clear and concise");

        let moreno = &cadets[1];
        assert_eq!(moreno.cohort().group, "first-year");
        assert_eq!(moreno.totals().possible_score, 0);

        let patel = &cadets[2];
        assert_eq!(patel.cohort().group, "third-year");
        assert_eq!(patel.cohort().pool, None);
    }

    #[test]
    fn missing_metric_columns_are_not_attempted() {
        let config = ScoringConfig::builtin();
        let cadets = build_cadets(&sheet(), &config).unwrap();
        let mgrs = config.metrics.lookup("MGRS Test").unwrap();
        assert_eq!(
            cadets[0].score(mgrs).map(|score| score.attempt),
            Some(Attempt::NotAttempted)
        );
        assert_eq!(cadets[0].scores().len(), config.metrics.len());
    }

    #[test]
    fn huge_integer_cells_do_not_overflow_totals() {
        let raw = "A Number,Last Name,First Name,AS Year,MKT,MGRS Test\nA1,Doe,Jan,100,9223372036854775807,1\n";
        let sheet = read_sheet(raw.as_bytes()).unwrap();
        let cadets = build_cadets(&sheet, &ScoringConfig::builtin()).unwrap();
        assert_eq!(cadets[0].totals().total_score, i64::MAX);
        assert_eq!(cadets[0].totals().possible_score, 120);
    }

    #[test]
    fn unknown_cohort_label_fails_the_sheet() {
        let raw = "A Number,Last Name,First Name,AS Year,MKT\nA9,Doe,Jan,600,50\n";
        let sheet = read_sheet(raw.as_bytes()).unwrap();
        let err = build_cadets(&sheet, &ScoringConfig::builtin()).unwrap_err();
        assert_eq!(
            err,
            ScoreError::UnknownCohortLabel {
                a_number: "A9".to_string(),
                label: "600".to_string()
            }
        );
    }

    #[test]
    fn orphan_comments_column_is_unknown_metric() {
        let raw = "A Number,Last Name,First Name,AS Year,Drill Comments\nA9,Doe,Jan,100,sharp\n";
        let sheet = read_sheet(raw.as_bytes()).unwrap();
        let err = build_cadets(&sheet, &ScoringConfig::builtin()).unwrap_err();
        assert_eq!(err, ScoreError::UnknownMetric("Drill".to_string()));
    }

    #[test]
    fn missing_identity_column_is_rejected() {
        let raw = "A Number,Last Name,First Name,MKT\nA9,Doe,Jan,50\n";
        let sheet = read_sheet(raw.as_bytes()).unwrap();
        let err = build_cadets(&sheet, &ScoringConfig::builtin()).unwrap_err();
        assert_eq!(err, ScoreError::MissingColumn(AS_YEAR));
    }
}
