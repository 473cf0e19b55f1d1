use crate::data::{Level, Semester};
use crate::model::Violation;
use std::fmt;
use thiserror::Error;

/// Why no schedule came out of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleReason {
    /// The whole space was explored (or ruled out by bounds).
    Proven,
    /// The exploration budget ran out before any complete assignment was found.
    BudgetExhausted,
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibleReason::Proven => {
                f.write_str("no assignment satisfies the room, level and teacher constraints")
            }
            InfeasibleReason::BudgetExhausted => {
                f.write_str("search budget exhausted before any complete assignment was found")
            }
        }
    }
}

/// Everything a generation run can report instead of a schedule.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("no course data for level {level}, semester {semester}")]
    NoDataForSelector { level: Level, semester: Semester },

    #[error("every course of level {level}, semester {semester} has a blank name")]
    EmptyCatalogAfterFiltering { level: Level, semester: Semester },

    #[error("no rooms listed for subject area '{0}'")]
    UnknownSubjectArea(String),

    #[error("no feasible schedule: {0}")]
    Infeasible(InfeasibleReason),

    /// A projected assignment left a course undecided. Indicates a solver bug.
    #[error("assignment leaves course #{course} unscheduled")]
    IncompleteAssignment { course: usize },

    /// A backend answer broke a room, level or teacher constraint. Indicates a solver bug.
    #[error("solver returned an inconsistent assignment: {0}")]
    InvalidAssignment(Violation),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("ILP solver error: {0}")]
    Ilp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SchedulingError {
    /// True for the two "nothing to schedule" outcomes, which callers show as an empty timetable.
    pub fn is_nothing_to_schedule(&self) -> bool {
        matches!(
            self,
            SchedulingError::NoDataForSelector { .. }
                | SchedulingError::EmptyCatalogAfterFiltering { .. }
        )
    }
}
