//! Decision-variable index space.
//!
//! One boolean variable exists per (course, room, day, period, level, teacher)
//! tuple. Variables are numbered densely and bucketed once into the four
//! groupings the constraints and the search both need.

use crate::catalog::Catalog;
use itertools::iproduct;
use log::trace;

pub type VarId = usize;

/// Sizes of the six entity sets a variable space is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub courses: usize,
    pub rooms: usize,
    pub days: usize,
    pub periods: usize,
    pub levels: usize,
    pub teachers: usize,
}

impl Dimensions {
    pub fn of(catalog: &Catalog) -> Self {
        Self {
            courses: catalog.courses().len(),
            rooms: catalog.rooms().len(),
            days: catalog.days().len(),
            periods: catalog.periods().len(),
            levels: catalog.levels().len(),
            teachers: catalog.teachers().len(),
        }
    }

    pub fn variable_count(&self) -> usize {
        self.courses * self.rooms * self.days * self.periods * self.levels * self.teachers
    }

    pub fn room_slots(&self) -> usize {
        self.rooms * self.days * self.periods
    }

    pub fn level_slots(&self) -> usize {
        self.levels * self.days * self.periods
    }

    pub fn teacher_slots(&self) -> usize {
        self.teachers * self.days * self.periods
    }
}

/// Positions of one variable in the catalog's entity lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableKey {
    pub course: usize,
    pub room: usize,
    pub day: usize,
    pub period: usize,
    pub level: usize,
    pub teacher: usize,
}

#[derive(Debug, Clone)]
pub struct VariableSpace {
    dims: Dimensions,
    keys: Vec<VariableKey>,
    by_room_slot: Vec<Vec<VarId>>,
    by_level_slot: Vec<Vec<VarId>>,
    by_teacher_slot: Vec<Vec<VarId>>,
    by_course: Vec<Vec<VarId>>,
}

impl VariableSpace {
    pub fn build(catalog: &Catalog) -> Self {
        Self::from_dimensions(Dimensions::of(catalog))
    }

    pub fn from_dimensions(dims: Dimensions) -> Self {
        let keys: Vec<VariableKey> = iproduct!(
            0..dims.courses,
            0..dims.rooms,
            0..dims.days,
            0..dims.periods,
            0..dims.levels,
            0..dims.teachers
        )
        .map(|(course, room, day, period, level, teacher)| VariableKey {
            course,
            room,
            day,
            period,
            level,
            teacher,
        })
        .collect();

        let mut space = Self {
            dims,
            by_room_slot: vec![Vec::new(); dims.room_slots()],
            by_level_slot: vec![Vec::new(); dims.level_slots()],
            by_teacher_slot: vec![Vec::new(); dims.teacher_slots()],
            by_course: vec![Vec::new(); dims.courses],
            keys,
        };
        for var in 0..space.keys.len() {
            let key = space.keys[var];
            let (room_slot, level_slot, teacher_slot) = (
                space.room_slot(var),
                space.level_slot(var),
                space.teacher_slot(var),
            );
            space.by_room_slot[room_slot].push(var);
            space.by_level_slot[level_slot].push(var);
            space.by_teacher_slot[teacher_slot].push(var);
            space.by_course[key.course].push(var);
        }

        trace!(
            "Built {} variables ({} room slots, {} level slots, {} teacher slots)",
            space.keys.len(),
            dims.room_slots(),
            dims.level_slots(),
            dims.teacher_slots()
        );
        space
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, var: VarId) -> VariableKey {
        self.keys[var]
    }

    pub fn keys(&self) -> &[VariableKey] {
        &self.keys
    }

    /// Index of the (room, day, period) group the variable belongs to.
    pub fn room_slot(&self, var: VarId) -> usize {
        let k = self.keys[var];
        (k.room * self.dims.days + k.day) * self.dims.periods + k.period
    }

    /// Index of the (level, day, period) group the variable belongs to.
    pub fn level_slot(&self, var: VarId) -> usize {
        let k = self.keys[var];
        (k.level * self.dims.days + k.day) * self.dims.periods + k.period
    }

    /// Index of the (teacher, day, period) group the variable belongs to.
    pub fn teacher_slot(&self, var: VarId) -> usize {
        let k = self.keys[var];
        (k.teacher * self.dims.days + k.day) * self.dims.periods + k.period
    }

    pub fn room_slot_groups(&self) -> &[Vec<VarId>] {
        &self.by_room_slot
    }

    pub fn level_slot_groups(&self) -> &[Vec<VarId>] {
        &self.by_level_slot
    }

    pub fn teacher_slot_groups(&self) -> &[Vec<VarId>] {
        &self.by_teacher_slot
    }

    pub fn course_groups(&self) -> &[Vec<VarId>] {
        &self.by_course
    }
}
