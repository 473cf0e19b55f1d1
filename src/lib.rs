//! Weekly university timetable generation.
//!
//! A run takes the courses of one level and semester, the rooms of one
//! subject area and a week of weighted periods, and assigns every course to a
//! (room, day, period, teacher) slot so that no room, level or teacher is
//! booked twice, preferring earlier periods.
//!
//! Pipeline: [`catalog`] → [`variables`] → [`model`] → [`search`] (or [`ilp`])
//! → [`projector`]. [`solver`] chains the stages.

pub mod catalog;
pub mod config;
pub mod data;
pub mod error;
#[cfg(feature = "ilp")]
pub mod ilp;
pub mod model;
pub mod projector;
pub mod search;
pub mod server;
pub mod solver;
pub mod timetable;
pub mod variables;

pub use catalog::{Catalog, Dataset};
pub use config::AppConfig;
pub use data::{ScheduleEntry, SchedulingOutput, Selector, Semester};
pub use error::SchedulingError;
