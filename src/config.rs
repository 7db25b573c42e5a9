use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ScoreError};

pub const COMMENTS_SUFFIX: &str = " Comments";

/// Process-level settings pulled from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: Option<String>,
    pub log_level: String,
}

impl AppSettings {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let log_level = env::var("SCORE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            log_level,
        }
    }
}

/// Index of a metric in the catalog. Only the catalog hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetricId(usize);

impl MetricId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDef {
    pub name: String,
    pub max_value: u32,
}

/// Ordered metric table; order is the score sheet's column order.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    metrics: Vec<MetricDef>,
}

impl MetricCatalog {
    pub fn new(metrics: Vec<MetricDef>) -> Result<Self, ConfigError> {
        if metrics.is_empty() {
            return Err(ConfigError::NoMetrics);
        }

        let mut seen = HashSet::new();
        for metric in &metrics {
            if metric.name.ends_with(COMMENTS_SUFFIX) {
                return Err(ConfigError::ReservedMetricName(metric.name.clone()));
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(ConfigError::DuplicateMetric(metric.name.clone()));
            }
        }

        Ok(Self { metrics })
    }

    pub fn lookup(&self, name: &str) -> Result<MetricId, ScoreError> {
        self.metrics
            .iter()
            .position(|metric| metric.name == name)
            .map(MetricId)
            .ok_or_else(|| ScoreError::UnknownMetric(name.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = MetricId> + '_ {
        (0..self.metrics.len()).map(MetricId)
    }

    pub fn get(&self, id: MetricId) -> &MetricDef {
        &self.metrics[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn comments_column(&self, id: MetricId) -> String {
        format!("{}{}", self.get(id).name, COMMENTS_SUFFIX)
    }

    /// Maps a `"<metric> Comments"` header to its metric. `Ok(None)` means the
    /// header is not a comments column at all.
    pub fn comments_target(&self, header: &str) -> Result<Option<MetricId>, ScoreError> {
        match header.strip_suffix(COMMENTS_SUFFIX) {
            Some(base) => self.lookup(base).map(Some),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortGroup {
    pub group: String,
    #[serde(default = "default_ranked")]
    pub ranked: bool,
}

fn default_ranked() -> bool {
    true
}

/// Raw cohort label (AS year) to display group. Ranked groups double as the
/// ranking pool key, so aliased labels share a pool.
#[derive(Debug, Clone)]
pub struct CohortTable {
    labels: BTreeMap<String, CohortGroup>,
}

impl CohortTable {
    pub fn new(labels: BTreeMap<String, CohortGroup>) -> Result<Self, ConfigError> {
        if labels.is_empty() {
            return Err(ConfigError::NoCohorts);
        }
        Ok(Self { labels })
    }

    pub fn resolve(&self, label: &str) -> Option<&CohortGroup> {
        self.labels.get(label)
    }

    /// Position of a display group by its lowest label; unknown groups sort last.
    pub fn group_order(&self, group: &str) -> usize {
        self.labels
            .values()
            .position(|entry| entry.group == group)
            .unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Deserialize)]
struct ScoringConfigFile {
    metrics: Vec<MetricDef>,
    cohorts: BTreeMap<String, CohortGroup>,
}

/// Static metric and cohort tables, immutable for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub metrics: MetricCatalog,
    pub cohorts: CohortTable,
}

impl ScoringConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ScoringConfigFile = serde_json::from_str(raw)?;
        Ok(Self {
            metrics: MetricCatalog::new(file.metrics)?,
            cohorts: CohortTable::new(file.cohorts)?,
        })
    }

    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?),
            None => Ok(Self::builtin()),
        }
    }

    /// The evaluation battery and AS year pools used when no config file is given.
    pub fn builtin() -> Self {
        let metric = |name: &str, max_value| MetricDef {
            name: name.to_string(),
            max_value,
        };
        let metrics = vec![
            metric("MKT", 100),
            metric("Radio Reports Practical", 80),
            metric("Radio Reports Test", 20),
            metric("MGRS Practical", 80),
            metric("MGRS Test", 20),
        ];

        let group = |name: &str, ranked| CohortGroup {
            group: name.to_string(),
            ranked,
        };
        let labels = BTreeMap::from([
            ("100".to_string(), group("first-year", true)),
            ("150".to_string(), group("first-year", true)),
            ("200".to_string(), group("second-year", true)),
            ("250".to_string(), group("second-year", true)),
            ("300".to_string(), group("third-year", false)),
            ("400".to_string(), group("fourth-year", false)),
            ("500".to_string(), group("extended", false)),
            ("700".to_string(), group("extended", false)),
            ("800".to_string(), group("extended", false)),
            ("900".to_string(), group("extended", false)),
        ]);

        Self {
            metrics: MetricCatalog { metrics },
            cohorts: CohortTable { labels },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn settings_default_log_level_is_info() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::remove_var("SCORE_LOG_LEVEL");
        let settings = AppSettings::load();
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn settings_pick_up_log_level_override() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("SCORE_LOG_LEVEL", "debug");
        let settings = AppSettings::load();
        env::remove_var("SCORE_LOG_LEVEL");
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn builtin_aliases_first_year_labels() {
        let config = ScoringConfig::builtin();
        let first = config.cohorts.resolve("100").expect("100 configured");
        let alias = config.cohorts.resolve("150").expect("150 configured");
        assert_eq!(first, alias);
        assert!(!config.cohorts.resolve("300").expect("300 configured").ranked);
        assert!(config.cohorts.resolve("999").is_none());
    }

    #[test]
    fn groups_order_by_their_lowest_label() {
        let cohorts = ScoringConfig::builtin().cohorts;
        let order: Vec<usize> = ["first-year", "second-year", "third-year", "fourth-year", "extended"]
            .iter()
            .map(|group| cohorts.group_order(group))
            .collect();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]), "{order:?}");
        assert_eq!(cohorts.group_order("unmapped"), usize::MAX);
    }

    #[test]
    fn lookup_rejects_unknown_metric() {
        let config = ScoringConfig::builtin();
        assert_eq!(config.metrics.lookup("MKT").map(MetricId::index), Ok(0));
        assert_eq!(
            config.metrics.lookup("PT Test"),
            Err(ScoreError::UnknownMetric("PT Test".to_string()))
        );
    }

    #[test]
    fn comments_target_follows_naming_convention() {
        let config = ScoringConfig::builtin();
        let mgrs = config.metrics.lookup("MGRS Practical").unwrap();
        assert_eq!(
            config.metrics.comments_target("MGRS Practical Comments"),
            Ok(Some(mgrs))
        );
        assert_eq!(config.metrics.comments_target("Flight"), Ok(None));
        assert!(config.metrics.comments_target("Drill Comments").is_err());
    }

    #[test]
    fn parses_json_config() {
        let raw = r#"{
            "metrics": [{"name": "Drill", "max_value": 50}],
            "cohorts": {"100": {"group": "first-year"}, "300": {"group": "poc", "ranked": false}}
        }"#;
        let config = ScoringConfig::from_json(raw).expect("config parses");
        assert_eq!(config.metrics.len(), 1);
        assert!(config.cohorts.resolve("100").unwrap().ranked);
        assert!(!config.cohorts.resolve("300").unwrap().ranked);
    }

    #[test]
    fn example_config_matches_builtin_metrics() {
        let config = ScoringConfig::from_json(include_str!("../scoring.example.json"))
            .expect("example config parses");
        let builtin = ScoringConfig::builtin();
        let names = |catalog: &MetricCatalog| -> Vec<(String, u32)> {
            catalog
                .ids()
                .map(|id| (catalog.get(id).name.clone(), catalog.get(id).max_value))
                .collect()
        };
        assert_eq!(names(&config.metrics), names(&builtin.metrics));
        assert_eq!(
            config.cohorts.resolve("250"),
            builtin.cohorts.resolve("250")
        );
    }

    #[test]
    fn rejects_duplicate_and_reserved_metric_names() {
        let dup = r#"{"metrics": [{"name": "MKT", "max_value": 1}, {"name": "MKT", "max_value": 2}],
                      "cohorts": {"100": {"group": "a"}}}"#;
        assert!(matches!(
            ScoringConfig::from_json(dup),
            Err(ConfigError::DuplicateMetric(name)) if name == "MKT"
        ));

        let reserved = r#"{"metrics": [{"name": "MKT Comments", "max_value": 1}],
                           "cohorts": {"100": {"group": "a"}}}"#;
        assert!(matches!(
            ScoringConfig::from_json(reserved),
            Err(ConfigError::ReservedMetricName(_))
        ));

        let empty = r#"{"metrics": [], "cohorts": {"100": {"group": "a"}}}"#;
        assert!(matches!(ScoringConfig::from_json(empty), Err(ConfigError::NoMetrics)));
    }
}
