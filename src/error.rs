/// Data/configuration mismatches that abort a scoring run before any output.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),
    #[error("unknown cohort label '{label}' for cadet {a_number}")]
    UnknownCohortLabel { a_number: String, label: String },
    #[error("score sheet is missing required column '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("scoring config must declare at least one metric")]
    NoMetrics,
    #[error("scoring config must declare at least one cohort label")]
    NoCohorts,
    #[error("metric '{0}' is declared more than once")]
    DuplicateMetric(String),
    #[error("metric '{0}' collides with the comments column naming convention")]
    ReservedMetricName(String),
    #[error("unable to read scoring config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scoring config: {0}")]
    Json(#[from] serde_json::Error),
}
