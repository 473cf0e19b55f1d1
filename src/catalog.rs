use crate::data::{
    Calendar, Course, CourseId, CourseRecord, Level, Period, Room, RoomRecord, Selector, Teacher,
    TeacherId, UNASSIGNED_TEACHER,
};
use crate::error::SchedulingError;
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
struct SemesterBlock {
    #[serde(default)]
    subjects: Vec<CourseRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SubjectsFile {
    /// level -> semester -> subjects
    #[serde(default)]
    niveau: HashMap<String, HashMap<String, SemesterBlock>>,
}

/// The raw course and room data, loaded once and shared read-only across runs.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    subjects: SubjectsFile,
    rooms: HashMap<String, Vec<RoomRecord>>,
}

impl Dataset {
    pub fn load(
        subjects_path: impl AsRef<Path>,
        rooms_path: impl AsRef<Path>,
    ) -> Result<Self, SchedulingError> {
        let subjects = fs::read_to_string(subjects_path.as_ref())?;
        let rooms = fs::read_to_string(rooms_path.as_ref())?;
        let dataset = Self::from_json_str(&subjects, &rooms)?;
        info!(
            "Loaded dataset from {} and {} ({} levels, {} subject areas)",
            subjects_path.as_ref().display(),
            rooms_path.as_ref().display(),
            dataset.subjects.niveau.len(),
            dataset.rooms.len()
        );
        Ok(dataset)
    }

    pub fn from_json_str(subjects: &str, rooms: &str) -> Result<Self, SchedulingError> {
        Ok(Self {
            subjects: serde_json::from_str(subjects)?,
            rooms: serde_json::from_str(rooms)?,
        })
    }

    /// Course records for a selector, or `None` when the level or semester is absent.
    pub fn course_records(&self, selector: Selector) -> Option<&[CourseRecord]> {
        self.subjects
            .niveau
            .get(&selector.level.to_string())?
            .get(selector.semester.as_str())
            .map(|block| block.subjects.as_slice())
    }

    pub fn rooms(&self, subject_area: &str) -> Result<Vec<Room>, SchedulingError> {
        let records = self
            .rooms
            .get(subject_area)
            .filter(|records| !records.is_empty())
            .ok_or_else(|| SchedulingError::UnknownSubjectArea(subject_area.to_string()))?;
        Ok(records
            .iter()
            .cloned()
            .enumerate()
            .map(|(position, record)| Room::from_record(position, record))
            .collect())
    }
}

/// Everything one generation run may use: courses, rooms, teachers, levels and the week grid.
#[derive(Debug, Clone)]
pub struct Catalog {
    selector: Selector,
    calendar: Calendar,
    courses: Vec<Course>,
    rooms: Vec<Room>,
    teachers: Vec<Teacher>,
    levels: Vec<Level>,
}

impl Catalog {
    /// Builds the catalog for a selector from the shared dataset.
    pub fn build(
        dataset: &Dataset,
        selector: Selector,
        subject_area: &str,
        calendar: &Calendar,
    ) -> Result<Self, SchedulingError> {
        let records = dataset
            .course_records(selector)
            .filter(|records| !records.is_empty())
            .ok_or(SchedulingError::NoDataForSelector {
                level: selector.level,
                semester: selector.semester,
            })?;
        let courses = records
            .iter()
            .cloned()
            .enumerate()
            .map(|(position, record)| {
                Course::from_record(CourseId::try_from(position).unwrap_or(CourseId::MAX), record)
            })
            .collect();
        let rooms = dataset.rooms(subject_area)?;
        Self::from_parts(selector, calendar.clone(), courses, rooms)
    }

    /// Builds a catalog from already-normalised records.
    ///
    /// Courses without a usable name are dropped here; the teacher roster is
    /// derived from what remains.
    pub fn from_parts(
        selector: Selector,
        calendar: Calendar,
        courses: Vec<Course>,
        rooms: Vec<Room>,
    ) -> Result<Self, SchedulingError> {
        calendar.validate().map_err(SchedulingError::Config)?;
        if courses.is_empty() {
            return Err(SchedulingError::NoDataForSelector {
                level: selector.level,
                semester: selector.semester,
            });
        }

        let total = courses.len();
        let courses: Vec<Course> = courses
            .into_iter()
            .filter(Course::has_usable_name)
            .collect();
        let dropped = total - courses.len();
        if dropped > 0 {
            warn!("Dropped {dropped} course(s) with a blank name for {selector}");
        }
        if courses.is_empty() {
            return Err(SchedulingError::EmptyCatalogAfterFiltering {
                level: selector.level,
                semester: selector.semester,
            });
        }

        let teachers = teacher_roster(&courses);
        info!(
            "Catalog for {}: {} courses, {} rooms, {} teachers, {} days x {} periods",
            selector,
            courses.len(),
            rooms.len(),
            teachers.len(),
            calendar.days.len(),
            calendar.periods.len()
        );
        debug!(
            "Teachers: {}",
            teachers.iter().map(|t| t.name.as_str()).join(", ")
        );

        Ok(Self {
            selector,
            calendar,
            courses,
            rooms,
            teachers,
            levels: vec![selector.level],
        })
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.teachers
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn days(&self) -> &[String] {
        &self.calendar.days
    }

    pub fn periods(&self) -> &[Period] {
        &self.calendar.periods
    }
}

/// Deduplicates teacher names across courses in first-seen order.
///
/// Falls back to a single synthetic teacher when no course declares one.
pub fn teacher_roster(courses: &[Course]) -> Vec<Teacher> {
    let names: Vec<&str> = courses
        .iter()
        .flat_map(|c| c.teachers.iter())
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .unique()
        .collect();

    if names.is_empty() {
        return vec![Teacher {
            id: 0,
            name: UNASSIGNED_TEACHER.to_string(),
            synthetic: true,
        }];
    }

    names
        .into_iter()
        .enumerate()
        .map(|(id, name)| Teacher {
            id: TeacherId::try_from(id).unwrap_or(TeacherId::MAX),
            name: name.to_string(),
            synthetic: false,
        })
        .collect()
}
