use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Type aliases for clarity
pub type CourseId = u32;
pub type RoomId = u32;
pub type TeacherId = u32;
pub type Level = u32;
pub type Weight = u32;

/// Label of the teacher introduced when no course declares one.
pub const UNASSIGNED_TEACHER: &str = "Enseignant par défaut";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    S1,
    S2,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::S1 => "s1",
            Semester::S2 => "s2",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s1" => Ok(Semester::S1),
            "s2" => Ok(Semester::S2),
            other => Err(format!("unknown semester '{other}', expected s1 or s2")),
        }
    }
}

/// Which level and semester a generation run is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Selector {
    pub level: Level,
    pub semester: Semester,
}

impl Selector {
    pub fn new(level: Level, semester: Semester) -> Self {
        Self { level, semester }
    }

    /// Maps the numbered console menu (1..=10) onto level and semester:
    /// odd choices are the first semester, even ones the second.
    pub fn from_menu_choice(choice: u32) -> Option<Self> {
        if !(1..=10).contains(&choice) {
            return None;
        }
        let semester = if choice % 2 == 1 {
            Semester::S1
        } else {
            Semester::S2
        };
        Some(Self::new((choice + 1) / 2, semester))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {} / {}", self.level, self.semester)
    }
}

/// A text field in the dataset that is either a plain string or a list of fragments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawText {
    One(String),
    Many(Vec<Option<String>>),
}

impl Default for RawText {
    fn default() -> Self {
        RawText::Many(Vec::new())
    }
}

impl RawText {
    /// Normalises to an ordered list of fragments; a plain string becomes a single fragment.
    pub fn into_fragments(self) -> Vec<String> {
        match self {
            RawText::One(s) => vec![s],
            RawText::Many(parts) => parts.into_iter().flatten().collect(),
        }
    }
}

/// Course record as stored in `subjects.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CourseRecord {
    #[serde(default)]
    pub name: Option<RawText>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "Course Lecturer", alias = "teachers")]
    pub lecturers: Option<RawText>,
}

/// Room label as stored in `rooms.json`, where `num` may be text or a number.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawLabel {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for RawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawLabel::Text(s) => f.write_str(s),
            RawLabel::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Room record as stored in `rooms.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoomRecord {
    #[serde(default)]
    pub id: Option<RoomId>,
    #[serde(default, rename = "num", alias = "label")]
    pub label: Option<RawLabel>,
}

/// Represents a course to be scheduled once per week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: Vec<String>,
    pub code: String,
    pub teachers: Vec<String>,
}

impl Course {
    pub fn new(id: CourseId, name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            name: vec![name.into()],
            code: code.into(),
            teachers: Vec::new(),
        }
    }

    pub fn with_fragments(mut self, fragments: Vec<String>) -> Self {
        self.name = fragments;
        self
    }

    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teachers.push(teacher.into());
        self
    }

    pub fn from_record(id: CourseId, record: CourseRecord) -> Self {
        Self {
            id,
            name: record.name.map(RawText::into_fragments).unwrap_or_default(),
            code: record.code.unwrap_or_default(),
            teachers: record
                .lecturers
                .map(RawText::into_fragments)
                .unwrap_or_default(),
        }
    }

    /// False when every name fragment is empty or whitespace.
    pub fn has_usable_name(&self) -> bool {
        self.name.iter().any(|fragment| !fragment.trim().is_empty())
    }

    pub fn display_name(&self) -> String {
        self.name
            .iter()
            .map(|fragment| fragment.trim())
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Represents a physical room of the active subject area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub label: String,
}

impl Room {
    pub fn new(id: RoomId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    pub fn from_record(position: usize, record: RoomRecord) -> Self {
        let id = record
            .id
            .unwrap_or_else(|| RoomId::try_from(position).unwrap_or(RoomId::MAX));
        let label = record
            .label
            .map(|label| label.to_string())
            .unwrap_or_else(|| id.to_string());
        Self { id, label }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    /// Set on the stand-in teacher of a catalog with no declared lecturers.
    pub synthetic: bool,
}

/// A teaching period of the day and its preference weight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Period {
    pub label: String,
    pub weight: Weight,
}

impl Period {
    pub fn new(label: impl Into<String>, weight: Weight) -> Self {
        Self {
            label: label.into(),
            weight,
        }
    }
}

/// The ordered days and periods of a teaching week.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Calendar {
    pub days: Vec<String>,
    pub periods: Vec<Period>,
}

impl Calendar {
    pub fn new(days: Vec<String>, periods: Vec<Period>) -> Self {
        Self { days, periods }
    }

    /// Checks that both sets are non-empty and weights strictly decrease with the period index.
    pub fn validate(&self) -> Result<(), String> {
        if self.days.is_empty() {
            return Err("calendar needs at least one day".to_string());
        }
        if self.periods.is_empty() {
            return Err("calendar needs at least one period".to_string());
        }
        if let Some(pair) = self
            .periods
            .windows(2)
            .find(|pair| pair[0].weight <= pair[1].weight)
        {
            return Err(format!(
                "period weights must strictly decrease: '{}' ({}) is followed by '{}' ({})",
                pair[0].label, pair[0].weight, pair[1].label, pair[1].weight
            ));
        }
        Ok(())
    }

    pub fn weights(&self) -> Vec<Weight> {
        self.periods.iter().map(|p| p.weight).collect()
    }
}

impl Default for Calendar {
    fn default() -> Self {
        let days = ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi"]
            .into_iter()
            .map(String::from)
            .collect();
        let periods = vec![
            Period::new("P1 (7h-10h)", 5),
            Period::new("P2 (10h-13h)", 4),
            Period::new("P3 (13h-16h)", 3),
            Period::new("P4 (16h-19h)", 2),
            Period::new("P5 (19h-22h)", 1),
        ];
        Self { days, periods }
    }
}

/// Represents a single scheduled course session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub course_id: CourseId,
    pub course_name: String,
    pub course_code: String,
    pub day: String,
    pub day_index: usize,
    pub period: String,
    pub period_index: usize,
    pub room_id: RoomId,
    pub room: String,
    pub level: Level,
    pub teacher: String,
}

/// Whether the returned schedule is known to be optimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// The exploration budget ran out first; this is the best schedule seen.
    BestEffort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub nodes: u64,
    pub elapsed_ms: u64,
}

/// Describes a course that did not land in the most preferred period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetPreference {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// The final output of one generation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOutput {
    pub entries: Vec<ScheduleEntry>,
    pub score: u64,
    pub status: SolveStatus,
    pub stats: SearchStats,
    pub unmet_preferences: Vec<UnmetPreference>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_course_record_accepts_string_or_list() {
        let plain: CourseRecord = serde_json::from_value(json!({
            "name": "Algorithmique",
            "code": "INF111",
            "Course Lecturer": "Dr Mbarga"
        }))
        .unwrap();
        let course = Course::from_record(0, plain);
        assert_eq!(course.name, vec!["Algorithmique".to_string()]);
        assert_eq!(course.teachers, vec!["Dr Mbarga".to_string()]);

        let split: CourseRecord = serde_json::from_value(json!({
            "name": ["Bases de", "", "données"],
            "code": "INF232",
            "Course Lecturer": ["Pr Atsa", "Dr Kamga"]
        }))
        .unwrap();
        let course = Course::from_record(1, split);
        assert_eq!(course.display_name(), "Bases de données");
        assert_eq!(course.teachers.len(), 2);
    }

    #[test]
    fn test_missing_and_null_fields_default_to_empty() {
        let record: CourseRecord =
            serde_json::from_value(json!({ "name": null, "teachers": [null, "X"] })).unwrap();
        let course = Course::from_record(3, record);
        assert!(course.name.is_empty());
        assert!(course.code.is_empty());
        assert_eq!(course.teachers, vec!["X".to_string()]);
        assert!(!course.has_usable_name());
    }

    #[test]
    fn test_blank_fragments_are_not_a_usable_name() {
        let course = Course::new(0, "", "X").with_fragments(vec![" ".into(), "".into()]);
        assert!(!course.has_usable_name());
        assert_eq!(course.display_name(), "");
    }

    #[test]
    fn test_room_label_from_number_or_text() {
        let numbered: RoomRecord = serde_json::from_value(json!({ "num": 101 })).unwrap();
        assert_eq!(Room::from_record(4, numbered), Room::new(4, "101"));

        let named: RoomRecord =
            serde_json::from_value(json!({ "id": 9, "num": "S008" })).unwrap();
        assert_eq!(Room::from_record(0, named), Room::new(9, "S008"));
    }

    #[test]
    fn test_menu_choice_mapping() {
        assert_eq!(
            Selector::from_menu_choice(1),
            Some(Selector::new(1, Semester::S1))
        );
        assert_eq!(
            Selector::from_menu_choice(4),
            Some(Selector::new(2, Semester::S2))
        );
        assert_eq!(
            Selector::from_menu_choice(9),
            Some(Selector::new(5, Semester::S1))
        );
        assert_eq!(Selector::from_menu_choice(0), None);
        assert_eq!(Selector::from_menu_choice(11), None);
    }

    #[test]
    fn test_semester_parsing() {
        assert_eq!("S2".parse::<Semester>(), Ok(Semester::S2));
        assert!("s3".parse::<Semester>().is_err());
    }

    #[test]
    fn test_default_calendar_is_valid() {
        let calendar = Calendar::default();
        assert_eq!(calendar.days.len(), 6);
        assert_eq!(calendar.weights(), vec![5, 4, 3, 2, 1]);
        assert!(calendar.validate().is_ok());
    }

    #[test]
    fn test_calendar_rejects_non_decreasing_weights() {
        let calendar = Calendar::new(
            vec!["Lundi".into()],
            vec![Period::new("P1", 3), Period::new("P2", 3)],
        );
        assert!(calendar.validate().is_err());
    }
}
