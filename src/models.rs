use serde::Serialize;

use crate::config::MetricId;

/// Outcome of parsing one score cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "points", rename_all = "snake_case")]
pub enum Attempt {
    Scored(i64),
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreValue {
    pub metric: MetricId,
    pub raw: String,
    pub attempt: Attempt,
    pub max_value: u32,
    pub comment: String,
}

impl ScoreValue {
    /// Integer cells count toward totals; anything else is a non-attempt.
    pub fn parse(metric: MetricId, raw: &str, declared_max: u32) -> Self {
        let attempt = match raw.trim().parse::<i64>() {
            Ok(points) => Attempt::Scored(points),
            Err(_) => Attempt::NotAttempted,
        };
        let max_value = match attempt {
            Attempt::Scored(_) => declared_max,
            Attempt::NotAttempted => 0,
        };

        Self {
            metric,
            raw: raw.to_string(),
            attempt,
            max_value,
            comment: String::new(),
        }
    }

    pub fn points(&self) -> Option<i64> {
        match self.attempt {
            Attempt::Scored(points) => Some(points),
            Attempt::NotAttempted => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadetIdentity {
    pub a_number: String,
    pub last_name: String,
    pub first_name: String,
    pub flight: String,
}

impl CadetIdentity {
    pub fn new(a_number: &str, last_name: &str, first_name: &str, flight: &str) -> Self {
        Self {
            a_number: a_number.trim().to_string(),
            last_name: last_name.trim().to_string(),
            first_name: first_name.trim().to_string(),
            flight: flight.trim().to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Resolved cohort for one cadet. `pool` is `None` when the display group is
/// not ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortAssignment {
    pub label: String,
    pub group: String,
    pub pool: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total_score: i64,
    pub possible_score: u64,
    pub percent: f64,
}

impl Totals {
    pub fn from_scores(scores: &[ScoreValue]) -> Self {
        let (total_score, possible_score) = scores
            .iter()
            .filter_map(|score| score.points().map(|points| (points, score.max_value)))
            .fold((0i64, 0u64), |(total, possible), (points, max)| {
                (
                    total.saturating_add(points),
                    possible.saturating_add(u64::from(max)),
                )
            });

        let percent = if possible_score == 0 {
            0.0
        } else {
            total_score as f64 / possible_score as f64
        };

        Self {
            total_score,
            possible_score,
            percent,
        }
    }
}

/// One parsed score sheet row. Totals are derived once the score sequence is
/// complete and there is no way to change scores afterwards.
#[derive(Debug, Clone)]
pub struct Cadet {
    identity: CadetIdentity,
    cohort: CohortAssignment,
    scores: Vec<ScoreValue>,
    totals: Totals,
}

impl Cadet {
    pub fn new(identity: CadetIdentity, cohort: CohortAssignment, scores: Vec<ScoreValue>) -> Self {
        let totals = Totals::from_scores(&scores);
        Self {
            identity,
            cohort,
            scores,
            totals,
        }
    }

    pub fn identity(&self) -> &CadetIdentity {
        &self.identity
    }

    pub fn cohort(&self) -> &CohortAssignment {
        &self.cohort
    }

    pub fn scores(&self) -> &[ScoreValue] {
        &self.scores
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    pub fn score(&self, metric: MetricId) -> Option<&ScoreValue> {
        self.scores.iter().find(|score| score.metric == metric)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBand {
    Top,
    Middle,
    Bottom,
}

impl RankBand {
    pub fn label(self) -> &'static str {
        match self {
            RankBand::Top => "Top Third",
            RankBand::Middle => "Middle Third",
            RankBand::Bottom => "Bottom Third",
        }
    }
}

/// Terminal ranking state for one (cadet, metric) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Ranked(RankBand),
    NotRanked,
}

impl Standing {
    pub fn band(self) -> Option<RankBand> {
        match self {
            Standing::Ranked(band) => Some(band),
            Standing::NotRanked => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Standing::Ranked(band) => band.label(),
            Standing::NotRanked => "Not Ranked",
        }
    }
}

/// A cadet after a completed ranking pass. `standings` is indexed by metric id.
#[derive(Debug, Clone)]
pub struct RankedCadet {
    pub cadet: Cadet,
    pub standings: Vec<Standing>,
    pub overall: Standing,
}

impl RankedCadet {
    pub fn standing(&self, metric: MetricId) -> Standing {
        self.standings
            .get(metric.index())
            .copied()
            .unwrap_or(Standing::NotRanked)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub a_number: String,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub as_year: String,
    pub flight: String,
}
