use crate::catalog::Catalog;
use crate::data::ScheduleEntry;
use crate::error::SchedulingError;
use crate::model::Assignment;
use crate::variables::VariableSpace;

/// Turns a complete assignment into one schedule entry per course, in catalog order.
pub fn project(
    catalog: &Catalog,
    space: &VariableSpace,
    assignment: &Assignment,
) -> Result<Vec<ScheduleEntry>, SchedulingError> {
    catalog
        .courses()
        .iter()
        .enumerate()
        .map(|(index, course)| {
            let var = assignment
                .get(index)
                .ok_or(SchedulingError::IncompleteAssignment { course: index })?;
            let key = space.key(var);
            let room = &catalog.rooms()[key.room];
            let period = &catalog.periods()[key.period];
            Ok(ScheduleEntry {
                course_id: course.id,
                course_name: course.display_name(),
                course_code: course.code.clone(),
                day: catalog.days()[key.day].clone(),
                day_index: key.day,
                period: period.label.clone(),
                period_index: key.period,
                room_id: room.id,
                room: room.label.clone(),
                level: catalog.levels()[key.level],
                teacher: catalog.teachers()[key.teacher].name.clone(),
            })
        })
        .collect()
}
