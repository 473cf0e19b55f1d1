//! Declarative constraints and objective over a [`VariableSpace`].
//!
//! Nothing here searches: the model only names which variable groups are
//! bounded and how each variable contributes to the objective. Both the
//! branch-and-bound engine and the ILP backend consume it.

use crate::data::Weight;
use crate::variables::{VarId, VariableSpace};
use log::info;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Each course meets exactly once per week.
    Coverage,
    /// A room hosts at most one session per (day, period).
    RoomExclusivity,
    /// A level attends at most one session per (day, period).
    LevelExclusivity,
    /// A teacher gives at most one session per (day, period).
    TeacherExclusivity,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 4] = [
        ConstraintKind::Coverage,
        ConstraintKind::RoomExclusivity,
        ConstraintKind::LevelExclusivity,
        ConstraintKind::TeacherExclusivity,
    ];

    fn groups(self, space: &VariableSpace) -> &[Vec<VarId>] {
        match self {
            ConstraintKind::Coverage => space.course_groups(),
            ConstraintKind::RoomExclusivity => space.room_slot_groups(),
            ConstraintKind::LevelExclusivity => space.level_slot_groups(),
            ConstraintKind::TeacherExclusivity => space.teacher_slot_groups(),
        }
    }

    fn relation(self) -> Relation {
        match self {
            ConstraintKind::Coverage => Relation::Exactly(1),
            _ => Relation::AtMost(1),
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::Coverage => "course scheduled once",
            ConstraintKind::RoomExclusivity => "no room overlap",
            ConstraintKind::LevelExclusivity => "no level overlap",
            ConstraintKind::TeacherExclusivity => "no teacher overlap",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Exactly(u32),
    AtMost(u32),
}

impl Relation {
    pub fn holds(self, count: u32) -> bool {
        match self {
            Relation::Exactly(n) => count == n,
            Relation::AtMost(n) => count <= n,
        }
    }
}

/// `sum(group) <relation>` over one group of one grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub group: usize,
    pub relation: Relation,
}

/// Maximise the sum of period weights over all true variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    period_weights: Vec<Weight>,
}

impl Objective {
    pub fn new(period_weights: Vec<Weight>) -> Self {
        Self { period_weights }
    }

    pub fn coefficient(&self, space: &VariableSpace, var: VarId) -> Weight {
        self.period_weights[space.key(var).period]
    }

    pub fn period_weights(&self) -> &[Weight] {
        &self.period_weights
    }

    pub fn value<'a>(
        &self,
        space: &VariableSpace,
        support: impl IntoIterator<Item = &'a VarId>,
    ) -> u64 {
        support
            .into_iter()
            .map(|&var| u64::from(self.coefficient(space, var)))
            .sum()
    }
}

/// Which variable, if any, is true for each course.
///
/// Holding one slot per course makes "at most one per course" structural;
/// coverage then only requires every slot to be filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    chosen: Vec<Option<VarId>>,
}

impl Assignment {
    pub fn empty(courses: usize) -> Self {
        Self {
            chosen: vec![None; courses],
        }
    }

    pub fn from_choices(chosen: Vec<Option<VarId>>) -> Self {
        Self { chosen }
    }

    pub fn get(&self, course: usize) -> Option<VarId> {
        self.chosen.get(course).copied().flatten()
    }

    pub fn set(&mut self, course: usize, var: Option<VarId>) {
        self.chosen[course] = var;
    }

    pub fn courses(&self) -> usize {
        self.chosen.len()
    }

    /// The variables set to true.
    pub fn support(&self) -> impl Iterator<Item = &VarId> {
        self.chosen.iter().flatten()
    }
}

/// A constraint the checked assignment breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub constraint: LinearConstraint,
    pub count: u32,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' violated on group {}: {} true variable(s), expected {:?}",
            self.constraint.kind, self.constraint.group, self.count, self.constraint.relation
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintModel {
    constraints: Vec<LinearConstraint>,
    objective: Objective,
}

impl ConstraintModel {
    pub fn build(space: &VariableSpace, period_weights: &[Weight]) -> Self {
        let mut constraints = Vec::new();
        for kind in ConstraintKind::ALL {
            let groups = kind.groups(space).len();
            info!("Adding {groups} '{kind}' constraints...");
            constraints.extend((0..groups).map(|group| LinearConstraint {
                kind,
                group,
                relation: kind.relation(),
            }));
        }
        Self {
            constraints,
            objective: Objective::new(period_weights.to_vec()),
        }
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn count(&self, kind: ConstraintKind) -> usize {
        self.constraints.iter().filter(|c| c.kind == kind).count()
    }

    /// The variables summed by a constraint.
    pub fn members<'a>(&self, space: &'a VariableSpace, constraint: &LinearConstraint) -> &'a [VarId] {
        &constraint.kind.groups(space)[constraint.group]
    }

    /// Checks every constraint and returns the objective value when all hold.
    pub fn check(
        &self,
        space: &VariableSpace,
        assignment: &Assignment,
    ) -> Result<u64, Violation> {
        let mut truth = vec![false; space.len()];
        for &var in assignment.support() {
            truth[var] = true;
        }
        for constraint in &self.constraints {
            let count = self
                .members(space, constraint)
                .iter()
                .filter(|&&var| truth[var])
                .count();
            let count = u32::try_from(count).unwrap_or(u32::MAX);
            if !constraint.relation.holds(count) {
                return Err(Violation {
                    constraint: *constraint,
                    count,
                });
            }
        }
        Ok(self.objective.value(space, assignment.support()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{Dimensions, VariableKey};

    fn sample_space() -> VariableSpace {
        VariableSpace::from_dimensions(Dimensions {
            courses: 2,
            rooms: 2,
            days: 2,
            periods: 3,
            levels: 1,
            teachers: 1,
        })
    }

    fn var_at(space: &VariableSpace, key: VariableKey) -> VarId {
        space.keys().iter().position(|k| *k == key).unwrap()
    }

    fn key(course: usize, room: usize, day: usize, period: usize) -> VariableKey {
        VariableKey {
            course,
            room,
            day,
            period,
            level: 0,
            teacher: 0,
        }
    }

    #[test]
    fn test_constraint_counts_per_kind() {
        let space = sample_space();
        let model = ConstraintModel::build(&space, &[3, 2, 1]);
        assert_eq!(model.count(ConstraintKind::Coverage), 2);
        assert_eq!(model.count(ConstraintKind::RoomExclusivity), 2 * 2 * 3);
        assert_eq!(model.count(ConstraintKind::LevelExclusivity), 2 * 3);
        assert_eq!(model.count(ConstraintKind::TeacherExclusivity), 2 * 3);
        let coverage = model.constraints()[0];
        assert_eq!(coverage.relation, Relation::Exactly(1));
        assert_eq!(model.members(&space, &coverage).len(), 2 * 2 * 3);
    }

    #[test]
    fn test_check_accepts_valid_assignment_and_scores_it() {
        let space = sample_space();
        let model = ConstraintModel::build(&space, &[3, 2, 1]);
        let assignment = Assignment::from_choices(vec![
            Some(var_at(&space, key(0, 0, 0, 0))),
            Some(var_at(&space, key(1, 1, 1, 1))),
        ]);
        assert_eq!(model.check(&space, &assignment), Ok(3 + 2));
    }

    #[test]
    fn test_check_reports_level_and_teacher_clash() {
        let space = sample_space();
        let model = ConstraintModel::build(&space, &[3, 2, 1]);
        // different rooms, same day and period: level and teacher collide
        let assignment = Assignment::from_choices(vec![
            Some(var_at(&space, key(0, 0, 0, 0))),
            Some(var_at(&space, key(1, 1, 0, 0))),
        ]);
        let violation = model.check(&space, &assignment).unwrap_err();
        assert_eq!(violation.constraint.kind, ConstraintKind::LevelExclusivity);
        assert_eq!(violation.count, 2);
    }

    #[test]
    fn test_check_reports_missing_course() {
        let space = sample_space();
        let model = ConstraintModel::build(&space, &[3, 2, 1]);
        let assignment =
            Assignment::from_choices(vec![Some(var_at(&space, key(0, 0, 0, 0))), None]);
        let violation = model.check(&space, &assignment).unwrap_err();
        assert_eq!(violation.constraint.kind, ConstraintKind::Coverage);
        assert_eq!(violation.count, 0);
    }

    #[test]
    fn test_earlier_periods_strictly_dominate() {
        let space = sample_space();
        let model = ConstraintModel::build(&space, &[3, 2, 1]);
        let early = [var_at(&space, key(0, 0, 0, 0)), var_at(&space, key(1, 0, 1, 2))];
        let late = [var_at(&space, key(0, 0, 0, 1)), var_at(&space, key(1, 0, 1, 2))];
        assert!(model.objective().value(&space, &early) > model.objective().value(&space, &late));
    }
}
