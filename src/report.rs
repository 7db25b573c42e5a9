use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{MetricCatalog, ScoringConfig};
use crate::models::{Attempt, RankedCadet, Standing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Markdown,
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreLine {
    pub metric: String,
    pub attempt: Attempt,
    pub max_value: u32,
    pub display: String,
    pub standing: Standing,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CadetSummary {
    pub a_number: String,
    pub last_name: String,
    pub first_name: String,
    pub flight: String,
    pub cohort_label: String,
    pub cohort_group: String,
    pub scores: Vec<ScoreLine>,
    pub total_score: i64,
    pub possible_score: u64,
    pub percent: f64,
    pub overall: Standing,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub title: String,
    pub generated_on: NaiveDate,
    pub cadets: Vec<CadetSummary>,
}

fn score_display(attempt: Attempt, max_value: u32) -> String {
    match attempt {
        Attempt::Scored(points) => format!("{points} / {max_value}"),
        Attempt::NotAttempted => "Not Attempted".to_string(),
    }
}

pub fn summarize_cadet(entry: &RankedCadet, catalog: &MetricCatalog) -> CadetSummary {
    let cadet = &entry.cadet;
    let identity = cadet.identity();
    let totals = cadet.totals();

    let scores = cadet
        .scores()
        .iter()
        .map(|score| {
            let def = catalog.get(score.metric);
            ScoreLine {
                metric: def.name.clone(),
                attempt: score.attempt,
                max_value: score.max_value,
                display: score_display(score.attempt, def.max_value),
                standing: entry.standing(score.metric),
                comment: score.comment.clone(),
            }
        })
        .collect();

    CadetSummary {
        a_number: identity.a_number.clone(),
        last_name: identity.last_name.clone(),
        first_name: identity.first_name.clone(),
        flight: identity.flight.clone(),
        cohort_label: cadet.cohort().label.clone(),
        cohort_group: cadet.cohort().group.clone(),
        scores,
        total_score: totals.total_score,
        possible_score: totals.possible_score,
        percent: totals.percent,
        overall: entry.overall,
    }
}

/// Orders summaries by cohort group (in cohort table order), then name, then
/// A Number.
pub fn assemble(
    title: &str,
    generated_on: NaiveDate,
    ranked: &[RankedCadet],
    config: &ScoringConfig,
) -> ScoreReport {
    let mut cadets: Vec<CadetSummary> = ranked
        .iter()
        .map(|entry| summarize_cadet(entry, &config.metrics))
        .collect();
    cadets.sort_by_cached_key(|summary| {
        (
            config.cohorts.group_order(&summary.cohort_group),
            summary.last_name.clone(),
            summary.first_name.clone(),
            summary.a_number.clone(),
        )
    });

    ScoreReport {
        title: title.to_string(),
        generated_on,
        cadets,
    }
}

pub fn render_markdown(report: &ScoreReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", report.title);
    let _ = writeln!(output, "Generated {}", report.generated_on);

    if report.cadets.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No cadets found on the score sheet.");
        return output;
    }

    for cadet in &report.cadets {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}, {} ({})", cadet.last_name, cadet.first_name, cadet.a_number);
        let flight = if cadet.flight.is_empty() {
            "unassigned"
        } else {
            cadet.flight.as_str()
        };
        let _ = writeln!(
            output,
            "AS {} ({}), flight {}",
            cadet.cohort_label, cadet.cohort_group, flight
        );
        let _ = writeln!(output);
        let _ = writeln!(output, "| Evaluation | Score | Standing | Comments |");
        let _ = writeln!(output, "| --- | --- | --- | --- |");
        for line in &cadet.scores {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} |",
                line.metric,
                line.display,
                line.standing.label(),
                line.comment.replace('|', "\\|")
            );
        }
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Total: {} / {} ({:.1}%), overall {}",
            cadet.total_score,
            cadet.possible_score,
            cadet.percent * 100.0,
            cadet.overall.label()
        );
    }

    output
}

pub fn render(report: &ScoreReport, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}
