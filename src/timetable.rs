//! Plain-text rendering of a generated timetable, grouped by day.

use crate::data::ScheduleEntry;
use itertools::Itertools;
use std::fmt::Write;

const WIDTH: usize = 100;
const COURSE_WIDTH: usize = 40;
const TEACHER_WIDTH: usize = 20;

/// Cuts `text` to `max` characters, ending in `...` when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Entries ordered by day, then period.
pub fn sorted_entries(entries: &[ScheduleEntry]) -> Vec<&ScheduleEntry> {
    entries
        .iter()
        .sorted_by_key(|e| (e.day_index, e.period_index))
        .collect()
}

pub fn render(entries: &[ScheduleEntry]) -> String {
    let mut out = String::new();
    if entries.is_empty() {
        out.push_str("Pas d'emploi du temps à afficher.\n");
        return out;
    }

    let rule = "=".repeat(WIDTH);
    let thin = "-".repeat(WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^WIDTH$}", "EMPLOI DU TEMPS");
    let _ = writeln!(out, "{rule}");

    for (_, sessions) in &sorted_entries(entries).into_iter().chunk_by(|e| e.day_index) {
        let sessions: Vec<_> = sessions.collect();
        let _ = writeln!(out, "\n{thin}");
        let _ = writeln!(out, "{:^WIDTH$}", sessions[0].day);
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(
            out,
            "{:<15}{:<40}{:<10}{:<20}{:<15}",
            "HORAIRE", "COURS", "CODE", "ENSEIGNANT", "SALLE"
        );
        let _ = writeln!(out, "{thin}");
        for s in sessions {
            let _ = writeln!(
                out,
                "{:<15}{:<40}{:<10}{:<20}{:<15}",
                s.period,
                truncate(&s.course_name, COURSE_WIDTH - 3),
                s.course_code,
                truncate(&s.teacher, TEACHER_WIDTH - 3),
                s.room
            );
        }
    }
    let _ = writeln!(out, "\n{rule}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(course: &str, day: (usize, &str), period: (usize, &str), teacher: &str) -> ScheduleEntry {
        ScheduleEntry {
            course_id: 0,
            course_name: course.to_string(),
            course_code: "INF".to_string(),
            day: day.1.to_string(),
            day_index: day.0,
            period: period.1.to_string(),
            period_index: period.0,
            room_id: 0,
            room: "S003".to_string(),
            level: 1,
            teacher: teacher.to_string(),
        }
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("Réseaux", 37), "Réseaux");
        assert_eq!(truncate("Théorie des langages et compilation avancée", 17), "Théorie des la...");
        assert_eq!(truncate("Théorie des langages et compilation avancée", 17).chars().count(), 17);
    }

    #[test]
    fn test_render_groups_by_day_in_order() {
        let entries = vec![
            entry("Compilation", (1, "Mardi"), (0, "P1"), "Dr Tchana"),
            entry("Réseaux", (0, "Lundi"), (2, "P3"), "Dr Ndi"),
            entry("Systèmes", (0, "Lundi"), (0, "P1"), "Dr Ndi"),
        ];
        let text = render(&entries);
        let lundi = text.find("Lundi").unwrap();
        let mardi = text.find("Mardi").unwrap();
        assert!(lundi < mardi);
        assert!(text.find("Systèmes").unwrap() < text.find("Réseaux").unwrap());
        assert_eq!(text.matches("HORAIRE").count(), 2);
    }

    #[test]
    fn test_render_empty() {
        assert!(render(&[]).contains("Pas d'emploi du temps"));
    }
}
