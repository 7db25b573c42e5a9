use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{MetricCatalog, MetricId, ScoringConfig};
use crate::error::ScoreError;
use crate::models::{Cadet, RankBand, RankedCadet, Standing};

pub const OVERALL: &str = "overall";

/// What a ranking pass orders cadets by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankTarget {
    Metric(MetricId),
    /// Sorted by percent, tied on raw total.
    Overall,
}

impl RankTarget {
    pub fn parse(catalog: &MetricCatalog, name: &str) -> Result<Self, ScoreError> {
        if name.eq_ignore_ascii_case(OVERALL) {
            return Ok(RankTarget::Overall);
        }
        catalog.lookup(name).map(RankTarget::Metric)
    }

    pub fn name<'a>(&self, catalog: &'a MetricCatalog) -> &'a str {
        match self {
            RankTarget::Metric(metric) => &catalog.get(*metric).name,
            RankTarget::Overall => OVERALL,
        }
    }

    fn is_eligible(&self, cadet: &Cadet) -> bool {
        match self {
            RankTarget::Metric(metric) => cadet
                .score(*metric)
                .and_then(|score| score.points())
                .is_some(),
            RankTarget::Overall => cadet.scores().iter().any(|score| score.points().is_some()),
        }
    }

    /// Descending order; equal keys keep input order under a stable sort.
    fn compare(&self, a: &Cadet, b: &Cadet) -> Ordering {
        match self {
            RankTarget::Metric(_) => self.tie_key(b).cmp(&self.tie_key(a)),
            RankTarget::Overall => b.totals().percent.total_cmp(&a.totals().percent),
        }
    }

    fn tie_key(&self, cadet: &Cadet) -> i64 {
        match self {
            RankTarget::Metric(metric) => cadet
                .score(*metric)
                .and_then(|score| score.points())
                .unwrap_or_default(),
            RankTarget::Overall => cadet.totals().total_score,
        }
    }
}

/// Band for sorted position `position` in a pool of `size`, ignoring ties.
/// Integer cross-multiplication keeps the thirds exact.
pub fn band_for_position(position: usize, size: usize) -> RankBand {
    if position * 3 < size {
        RankBand::Top
    } else if position * 3 < size * 2 {
        RankBand::Middle
    } else {
        RankBand::Bottom
    }
}

/// Walks tie keys in sorted order; an entry equal to its predecessor inherits
/// the predecessor's band.
pub fn assign_bands<T: PartialEq>(sorted_keys: &[T]) -> Vec<RankBand> {
    let size = sorted_keys.len();
    let mut bands: Vec<RankBand> = Vec::with_capacity(size);

    for (position, key) in sorted_keys.iter().enumerate() {
        let band = match position {
            0 => RankBand::Top,
            _ if *key == sorted_keys[position - 1] => bands[position - 1],
            _ => band_for_position(position, size),
        };
        bands.push(band);
    }

    bands
}

/// Ranks every pool for one target. Cadets outside any pool, or not eligible,
/// stay `NotRanked`.
pub fn rank_target(cadets: &[Cadet], target: RankTarget) -> Vec<Standing> {
    let mut standings = vec![Standing::NotRanked; cadets.len()];
    let mut pools: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (index, cadet) in cadets.iter().enumerate() {
        let Some(pool) = cadet.cohort().pool.as_deref() else {
            continue;
        };
        if target.is_eligible(cadet) {
            pools.entry(pool).or_default().push(index);
        }
    }

    for (pool, mut members) in pools {
        members.sort_by(|&a, &b| target.compare(&cadets[a], &cadets[b]));
        let keys: Vec<i64> = members
            .iter()
            .map(|&index| target.tie_key(&cadets[index]))
            .collect();

        for (&index, band) in members.iter().zip(assign_bands(&keys)) {
            standings[index] = Standing::Ranked(band);
        }
        debug!(pool, ?target, size = members.len(), "pool ranked");
    }

    standings
}

/// Runs every metric pass plus the overall pass and returns ranked copies.
/// Nothing is observable until every pass has finished.
pub fn rank(cadets: Vec<Cadet>, config: &ScoringConfig) -> Vec<RankedCadet> {
    let per_metric: Vec<Vec<Standing>> = config
        .metrics
        .ids()
        .map(|metric| rank_target(&cadets, RankTarget::Metric(metric)))
        .collect();
    let overall = rank_target(&cadets, RankTarget::Overall);

    let unpooled = cadets
        .iter()
        .filter(|cadet| cadet.cohort().pool.is_none())
        .count();
    info!(
        cadets = cadets.len(),
        metrics = per_metric.len(),
        unpooled,
        "ranking complete"
    );

    cadets
        .into_iter()
        .enumerate()
        .map(|(index, cadet)| RankedCadet {
            standings: per_metric.iter().map(|column| column[index]).collect(),
            overall: overall[index],
            cadet,
        })
        .collect()
}

/// Ranked cadets for one target grouped by pool, best first. Cadets that were
/// not ranked for the target are left out.
pub fn leaderboard<'a>(
    ranked: &'a [RankedCadet],
    target: RankTarget,
) -> BTreeMap<&'a str, Vec<&'a RankedCadet>> {
    let mut pools: BTreeMap<&str, Vec<&RankedCadet>> = BTreeMap::new();
    for entry in ranked {
        let standing = match target {
            RankTarget::Metric(metric) => entry.standing(metric),
            RankTarget::Overall => entry.overall,
        };
        if let (Some(_), Some(pool)) = (standing.band(), entry.cadet.cohort().pool.as_deref()) {
            pools.entry(pool).or_default().push(entry);
        }
    }

    for members in pools.values_mut() {
        members.sort_by(|a, b| target.compare(&a.cadet, &b.cadet));
    }
    pools
}
