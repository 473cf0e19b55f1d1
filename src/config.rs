//! Application configuration, read from an optional TOML file.
//!
//! ```toml
//! bind_address = "127.0.0.1:8080"
//! log_filter = "info"
//!
//! [data]
//! subjects_path = "subjects.json"
//! rooms_path = "rooms.json"
//! subject_area = "Informatique"
//!
//! [calendar]
//! days = ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi"]
//! periods = [
//!     { label = "P1 (7h-10h)", weight = 5 },
//!     { label = "P2 (10h-13h)", weight = 4 },
//! ]
//!
//! [search]
//! backend = "branch_and_bound"
//! max_nodes = 1000000
//! time_limit_ms = 5000
//! parallel = false
//! ```

use crate::data::Calendar;
use crate::error::SchedulingError;
use crate::search::{SearchBudget, SearchConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    BranchAndBound,
    /// Hands the model to an ILP solver; needs the `ilp` cargo feature.
    Ilp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    pub backend: Backend,
    pub max_nodes: Option<u64>,
    pub time_limit_ms: Option<u64>,
    pub parallel: bool,
}

impl SearchSettings {
    pub fn budget(&self) -> SearchBudget {
        let mut budget = SearchBudget::unbounded();
        if let Some(max_nodes) = self.max_nodes {
            budget = budget.with_max_nodes(max_nodes);
        }
        if let Some(ms) = self.time_limit_ms {
            budget = budget.with_time_limit(Duration::from_millis(ms));
        }
        budget
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            budget: self.budget(),
            parallel: self.parallel,
        }
    }

    /// Replaces the budget fields that are set in `max_nodes` / `time_limit_ms`.
    pub fn with_overrides(mut self, max_nodes: Option<u64>, time_limit_ms: Option<u64>) -> Self {
        if max_nodes.is_some() {
            self.max_nodes = max_nodes;
        }
        if time_limit_ms.is_some() {
            self.time_limit_ms = time_limit_ms;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSettings {
    pub subjects_path: PathBuf,
    pub rooms_path: PathBuf,
    /// Key of the room list to schedule into.
    pub subject_area: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            subjects_path: PathBuf::from("subjects.json"),
            rooms_path: PathBuf::from("rooms.json"),
            subject_area: "Informatique".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: String,
    pub log_filter: String,
    pub data: DataSettings,
    pub calendar: Calendar,
    pub search: SearchSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            log_filter: "info".to_string(),
            data: DataSettings::default(),
            calendar: Calendar::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SchedulingError> {
        match path {
            Some(path) if path.exists() => Self::from_toml_str(&std::fs::read_to_string(path)?),
            Some(path) => Err(SchedulingError::Config(format!(
                "config file {} not found",
                path.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SchedulingError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        self.calendar.validate().map_err(SchedulingError::Config)?;
        if self.data.subject_area.trim().is_empty() {
            return Err(SchedulingError::Config(
                "data.subject_area must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.data.subject_area, "Informatique");
        assert!(config.search.budget().is_unbounded());
    }

    #[test]
    fn test_parses_sections() {
        let config = AppConfig::from_toml_str(
            r#"
            bind_address = "0.0.0.0:9000"

            [calendar]
            days = ["Lun", "Mar"]
            periods = [{ label = "Matin", weight = 2 }, { label = "Soir", weight = 1 }]

            [search]
            backend = "ilp"
            max_nodes = 5000
            time_limit_ms = 250
            parallel = true
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.calendar.weights(), vec![2, 1]);
        assert_eq!(config.search.backend, Backend::Ilp);
        let search = config.search.search_config();
        assert_eq!(search.budget.max_nodes, Some(5000));
        assert_eq!(search.budget.time_limit, Some(Duration::from_millis(250)));
        assert!(search.parallel);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_increasing_weights_are_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [calendar]
            periods = [{ label = "A", weight = 1 }, { label = "B", weight = 2 }]
            "#,
        );
        assert!(matches!(result, Err(SchedulingError::Config(_))));
    }

    #[test]
    fn test_overrides_only_replace_given_fields() {
        let settings = SearchSettings {
            max_nodes: Some(10),
            time_limit_ms: Some(100),
            ..SearchSettings::default()
        }
        .with_overrides(None, Some(5));
        assert_eq!(settings.max_nodes, Some(10));
        assert_eq!(settings.time_limit_ms, Some(5));
    }

    #[test]
    fn test_no_path_gives_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/schedule.toml"))).unwrap_err();
        assert!(matches!(err, SchedulingError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/schedule.toml"));
    }
}
