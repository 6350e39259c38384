use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CrewplanError, Result};
use crate::types::MonthOverflow;

pub const DEFAULT_PREVIEW_LIMIT: usize = 5;
pub const DEFAULT_MAX_OCCURRENCES: usize = 10_000;
pub const DEFAULT_LOG_FILTER: &str = "crewplan=info";

/// Top-level config (crewplan.toml + CREWPLAN_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewplanConfig {
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied by callers of the recurrence engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    /// Policy for pattern records that do not name one.
    #[serde(default)]
    pub month_overflow: MonthOverflow,
    /// Whether the anchor date counts as the first occurrence when it
    /// satisfies the pattern.
    #[serde(default = "bool_true")]
    pub include_anchor: bool,
    /// Number of dates shown by a preview when the caller gives no limit.
    #[serde(default = "default_preview_limit")]
    pub preview_limit: usize,
    /// Hard ceiling on a single expansion.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
    /// Cap used when scheduling a never-ending pattern. `None` means the
    /// caller must pass one explicitly.
    #[serde(default)]
    pub open_ended_limit: Option<usize>,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            month_overflow: MonthOverflow::default(),
            include_anchor: true,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            open_ended_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}
fn default_max_occurrences() -> usize {
    DEFAULT_MAX_OCCURRENCES
}
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl CrewplanConfig {
    /// Load config from a TOML file with CREWPLAN_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CREWPLAN_RECURRENCE__PREVIEW_LIMIT=10`. A missing file yields defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CrewplanConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CREWPLAN_").split("__"))
            .extract()
            .map_err(|e| CrewplanError::Config(e.to_string()))?;

        config.validate()?;
        tracing::debug!(%path, "configuration loaded");
        Ok(config)
    }

    /// Reject values that would make every expansion fail.
    pub fn validate(&self) -> Result<()> {
        let rec = &self.recurrence;
        if rec.preview_limit == 0 {
            return Err(CrewplanError::Config(
                "recurrence.preview_limit must be at least 1".to_string(),
            ));
        }
        if rec.max_occurrences == 0 {
            return Err(CrewplanError::Config(
                "recurrence.max_occurrences must be at least 1".to_string(),
            ));
        }
        if rec.open_ended_limit.is_some_and(|n| n > rec.max_occurrences) {
            return Err(CrewplanError::Config(format!(
                "recurrence.open_ended_limit exceeds max_occurrences ({})",
                rec.max_occurrences
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.crewplan/crewplan.toml", home)
}
