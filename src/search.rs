//! Branch-and-bound search, one decision per course.
//!
//! Courses are decided in catalog order. Each course tries its candidate
//! variables best period first; a candidate whose room, level or teacher slot
//! is already taken is skipped outright, so violated states are never built.
//! A branch is cut once its upper bound cannot beat the incumbent.

use crate::data::{SearchStats, SolveStatus, Weight};
use crate::error::{InfeasibleReason, SchedulingError};
use crate::model::{Assignment, ConstraintModel};
use crate::variables::{VarId, VariableSpace};
use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Limits on how much of the tree is explored. Unbounded by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum number of tentative placements.
    pub max_nodes: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_nodes.is_none() && self.time_limit.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchConfig {
    pub budget: SearchBudget,
    /// Explore the first course's candidates on the rayon pool.
    pub parallel: bool,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub assignment: Assignment,
    pub objective: u64,
    pub status: SolveStatus,
    pub stats: SearchStats,
}

/// Occupancy of one resource dimension, with free-slot counts per period for bounding.
#[derive(Debug, Clone)]
struct SlotPool {
    used: Vec<bool>,
    free_by_period: Vec<usize>,
}

impl SlotPool {
    fn new(slots: usize, periods: usize) -> Self {
        let per_period = if periods == 0 { 0 } else { slots / periods };
        Self {
            used: vec![false; slots],
            free_by_period: vec![per_period; periods],
        }
    }

    fn is_used(&self, slot: usize) -> bool {
        self.used[slot]
    }

    fn take(&mut self, slot: usize, period: usize) {
        self.used[slot] = true;
        self.free_by_period[period] -= 1;
    }

    fn release(&mut self, slot: usize, period: usize) {
        self.used[slot] = false;
        self.free_by_period[period] += 1;
    }

    /// Sum of the `k` best weights among free slots, or `None` if fewer than `k` are free.
    fn best_weights(&self, k: usize, period_order: &[usize], weights: &[Weight]) -> Option<u64> {
        let mut remaining = k;
        let mut total = 0u64;
        for &period in period_order {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(self.free_by_period[period]);
            total += take as u64 * u64::from(weights[period]);
            remaining -= take;
        }
        (remaining == 0).then_some(total)
    }
}

/// Best solution seen by any worker, packed as `(objective + 1) << 32 | !branch`.
///
/// A larger key is a better objective or, on equal objective, an earlier branch,
/// which keeps "first found under the branching order" as the tie-break.
/// Zero means no solution yet.
#[derive(Debug, Default)]
struct Incumbent(AtomicU64);

impl Incumbent {
    fn key(objective: u64, branch: u32) -> u64 {
        let objective = objective.min(u64::from(u32::MAX - 1));
        ((objective + 1) << 32) | u64::from(u32::MAX - branch)
    }

    fn beats(&self, objective: u64, branch: u32) -> bool {
        Self::key(objective, branch) > self.0.load(Ordering::Relaxed)
    }

    /// Publishes a solution; true if it became the incumbent.
    fn offer(&self, objective: u64, branch: u32) -> bool {
        let key = Self::key(objective, branch);
        self.0.fetch_max(key, Ordering::Relaxed) < key
    }
}

#[derive(Debug)]
struct Shared {
    incumbent: Incumbent,
    nodes: AtomicU64,
    exhausted: AtomicBool,
    max_nodes: Option<u64>,
    deadline: Option<Instant>,
}

impl Shared {
    fn new(budget: &SearchBudget, started: Instant) -> Self {
        Self {
            incumbent: Incumbent::default(),
            nodes: AtomicU64::new(0),
            exhausted: AtomicBool::new(false),
            max_nodes: budget.max_nodes,
            deadline: budget.time_limit.map(|limit| started + limit),
        }
    }

    /// Counts one node; false once the budget is spent.
    fn tick(&self, local: &mut u64) -> bool {
        if self.exhausted.load(Ordering::Relaxed) {
            return false;
        }
        let total = self.nodes.fetch_add(1, Ordering::Relaxed) + 1;
        *local += 1;
        let over_nodes = self.max_nodes.is_some_and(|max| total > max);
        // the clock is only sampled every 256 nodes
        let over_time =
            *local % 256 == 1 && self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        if over_nodes || over_time {
            self.exhausted.store(true, Ordering::Relaxed);
            return false;
        }
        true
    }
}

/// Read-only search input shared by every worker.
#[derive(Debug, Clone, Copy)]
struct Problem<'a> {
    space: &'a VariableSpace,
    weights: &'a [Weight],
    period_order: &'a [usize],
    candidates: &'a [Vec<VarId>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Searcher<'a> {
    problem: Problem<'a>,
    shared: &'a Shared,
    branch: u32,
    rooms: SlotPool,
    levels: SlotPool,
    teachers: SlotPool,
    assignment: Assignment,
    current: u64,
    /// Upper bound at this worker's root; reaching it ends the worker.
    ceiling: u64,
    best: Option<(u64, Assignment)>,
    local_nodes: u64,
}

impl<'a> Searcher<'a> {
    fn new(problem: Problem<'a>, shared: &'a Shared, branch: u32) -> Self {
        let dims = problem.space.dimensions();
        Self {
            problem,
            shared,
            branch,
            rooms: SlotPool::new(dims.room_slots(), dims.periods),
            levels: SlotPool::new(dims.level_slots(), dims.periods),
            teachers: SlotPool::new(dims.teacher_slots(), dims.periods),
            assignment: Assignment::empty(problem.candidates.len()),
            current: 0,
            ceiling: u64::MAX,
            best: None,
            local_nodes: 0,
        }
    }

    fn is_free(&self, var: VarId) -> bool {
        let space = self.problem.space;
        !self.rooms.is_used(space.room_slot(var))
            && !self.levels.is_used(space.level_slot(var))
            && !self.teachers.is_used(space.teacher_slot(var))
    }

    fn place(&mut self, course: usize, var: VarId) {
        let space = self.problem.space;
        let period = space.key(var).period;
        self.rooms.take(space.room_slot(var), period);
        self.levels.take(space.level_slot(var), period);
        self.teachers.take(space.teacher_slot(var), period);
        self.assignment.set(course, Some(var));
        self.current += u64::from(self.problem.weights[period]);
    }

    fn unplace(&mut self, course: usize, var: VarId) {
        let space = self.problem.space;
        let period = space.key(var).period;
        self.rooms.release(space.room_slot(var), period);
        self.levels.release(space.level_slot(var), period);
        self.teachers.release(space.teacher_slot(var), period);
        self.assignment.set(course, None);
        self.current -= u64::from(self.problem.weights[period]);
    }

    /// Current objective plus the best the `remaining` courses could still add.
    ///
    /// Every course takes one slot in each dimension, so the tightest
    /// dimension limits the gain. `None` means some dimension has run out.
    fn upper_bound(&self, remaining: usize) -> Option<u64> {
        let Problem {
            weights,
            period_order,
            ..
        } = self.problem;
        let rooms = self.rooms.best_weights(remaining, period_order, weights)?;
        let levels = self.levels.best_weights(remaining, period_order, weights)?;
        let teachers = self.teachers.best_weights(remaining, period_order, weights)?;
        Some(self.current + rooms.min(levels).min(teachers))
    }

    fn promising(&self, bound: u64) -> bool {
        self.shared.incumbent.beats(bound, self.branch)
    }

    fn descend(&mut self, depth: usize) -> Flow {
        let candidates = self.problem.candidates;
        if depth == candidates.len() {
            return self.record();
        }
        let remaining = candidates.len() - depth - 1;
        for &var in &candidates[depth] {
            if !self.is_free(var) {
                continue;
            }
            if !self.shared.tick(&mut self.local_nodes) {
                return Flow::Stop;
            }
            self.place(depth, var);
            let flow = match self.upper_bound(remaining) {
                Some(bound) if self.promising(bound) => self.descend(depth + 1),
                _ => Flow::Continue,
            };
            self.unplace(depth, var);
            if flow == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn record(&mut self) -> Flow {
        if self.shared.incumbent.offer(self.current, self.branch) {
            debug!(
                "New incumbent: objective {} (branch {}, {} nodes)",
                self.current,
                self.branch,
                self.shared.nodes.load(Ordering::Relaxed)
            );
            self.best = Some((self.current, self.assignment.clone()));
        }
        if self.current >= self.ceiling {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// Period indices, heaviest weight first.
fn period_order(weights: &[Weight]) -> Vec<usize> {
    (0..weights.len())
        .sorted_by_key(|&period| Reverse(weights[period]))
        .collect()
}

/// Each course's variables, heaviest period first, canonical order otherwise.
fn ordered_candidates(space: &VariableSpace, model: &ConstraintModel) -> Vec<Vec<VarId>> {
    let objective = model.objective();
    space
        .course_groups()
        .iter()
        .map(|group| {
            group
                .iter()
                .copied()
                .sorted_by_key(|&var| Reverse(objective.coefficient(space, var)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Finds a schedule satisfying every constraint of `model` with the largest objective.
pub fn search(
    space: &VariableSpace,
    model: &ConstraintModel,
    config: &SearchConfig,
) -> Result<Solution, SchedulingError> {
    let started = Instant::now();
    let weights = model.objective().period_weights();
    let order = period_order(weights);
    let candidates = ordered_candidates(space, model);
    let problem = Problem {
        space,
        weights,
        period_order: &order,
        candidates: &candidates,
    };
    let shared = Shared::new(&config.budget, started);

    let mut root = Searcher::new(problem, &shared, 0);
    let Some(root_bound) = root.upper_bound(candidates.len()) else {
        info!(
            "Fewer free slots than courses ({} courses); infeasible without search",
            candidates.len()
        );
        return Err(SchedulingError::Infeasible(InfeasibleReason::Proven));
    };
    info!(
        "Starting branch-and-bound over {} courses, {} variables (upper bound {})",
        candidates.len(),
        space.len(),
        root_bound
    );

    let best = if config.parallel && !candidates.is_empty() {
        search_parallel(problem, &shared)
    } else {
        root.ceiling = root_bound;
        let _ = root.descend(0);
        root.best
    };

    let exhausted = shared.exhausted.load(Ordering::Relaxed);
    let stats = SearchStats {
        nodes: shared.nodes.load(Ordering::Relaxed),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    match best {
        Some((objective, assignment)) => {
            let status = solve_status(exhausted, objective, root_bound);
            info!(
                "Search finished: {:?}, objective {} of bound {}, {} nodes in {} ms",
                status, objective, root_bound, stats.nodes, stats.elapsed_ms
            );
            Ok(Solution {
                assignment,
                objective,
                status,
                stats,
            })
        }
        None => {
            let reason = if exhausted {
                InfeasibleReason::BudgetExhausted
            } else {
                InfeasibleReason::Proven
            };
            info!("Search finished without a schedule after {} nodes: {}", stats.nodes, reason);
            Err(SchedulingError::Infeasible(reason))
        }
    }
}

/// An incumbent is proven optimal when the tree was fully explored or it meets the root bound.
fn solve_status(exhausted: bool, objective: u64, root_bound: u64) -> SolveStatus {
    if !exhausted || objective >= root_bound {
        SolveStatus::Optimal
    } else {
        SolveStatus::BestEffort
    }
}

/// Runs every top-level branch of the first course as its own worker.
///
/// Workers share the node budget and the incumbent key; the reducer keeps the
/// best objective, ties going to the lowest branch index.
fn search_parallel(problem: Problem<'_>, shared: &Shared) -> Option<(u64, Assignment)> {
    let remaining = problem.candidates.len() - 1;
    problem.candidates[0]
        .par_iter()
        .enumerate()
        .filter_map(|(branch, &var)| {
            let branch = u32::try_from(branch).unwrap_or(u32::MAX);
            let mut worker = Searcher::new(problem, shared, branch);
            if !shared.tick(&mut worker.local_nodes) {
                return None;
            }
            worker.place(0, var);
            let bound = worker.upper_bound(remaining)?;
            if !worker.promising(bound) {
                return None;
            }
            worker.ceiling = bound;
            let _ = worker.descend(1);
            worker
                .best
                .map(|(objective, assignment)| (branch, objective, assignment))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(_, objective, assignment)| (objective, assignment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::Dimensions;

    fn dims(
        courses: usize,
        rooms: usize,
        days: usize,
        periods: usize,
        teachers: usize,
    ) -> Dimensions {
        Dimensions {
            courses,
            rooms,
            days,
            periods,
            levels: 1,
            teachers,
        }
    }

    fn reference_weights(periods: usize) -> Vec<Weight> {
        (1..=periods as Weight).rev().collect()
    }

    type Run = (VariableSpace, ConstraintModel, Result<Solution, SchedulingError>);

    fn run(dims: Dimensions, config: SearchConfig) -> Run {
        let space = VariableSpace::from_dimensions(dims);
        let model = ConstraintModel::build(&space, &reference_weights(dims.periods));
        let result = search(&space, &model, &config);
        (space, model, result)
    }

    #[test]
    fn test_single_course_takes_first_day_earliest_period() {
        let (space, _, result) = run(dims(1, 1, 6, 5, 1), SearchConfig::default());
        let solution = result.unwrap();
        assert_eq!(solution.objective, 5);
        assert_eq!(solution.status, SolveStatus::Optimal);
        let key = space.key(solution.assignment.get(0).unwrap());
        assert_eq!((key.day, key.period), (0, 0));
    }

    #[test]
    fn test_shared_teacher_forces_different_slots() {
        let (space, model, result) = run(dims(2, 2, 1, 2, 1), SearchConfig::default());
        let solution = result.unwrap();
        let a = space.key(solution.assignment.get(0).unwrap());
        let b = space.key(solution.assignment.get(1).unwrap());
        assert_ne!((a.day, a.period), (b.day, b.period));
        assert_eq!(solution.objective, 2 + 1);
        assert_eq!(model.check(&space, &solution.assignment), Ok(3));
    }

    #[test]
    fn test_more_courses_than_slots_is_infeasible() {
        let (_, _, result) = run(dims(3, 1, 1, 2, 1), SearchConfig::default());
        assert!(matches!(
            result,
            Err(SchedulingError::Infeasible(InfeasibleReason::Proven))
        ));
    }

    #[test]
    fn test_zero_node_budget_reports_exhaustion() {
        let config = SearchConfig {
            budget: SearchBudget::unbounded().with_max_nodes(0),
            parallel: false,
        };
        let (_, _, result) = run(dims(2, 2, 2, 2, 2), config);
        assert!(matches!(
            result,
            Err(SchedulingError::Infeasible(InfeasibleReason::BudgetExhausted))
        ));
    }

    #[test]
    fn test_elapsed_deadline_reports_exhaustion() {
        for parallel in [false, true] {
            let config = SearchConfig {
                budget: SearchBudget::unbounded().with_time_limit(Duration::ZERO),
                parallel,
            };
            let (_, _, result) = run(dims(3, 2, 2, 2, 1), config);
            assert!(matches!(
                result,
                Err(SchedulingError::Infeasible(InfeasibleReason::BudgetExhausted))
            ));
        }
    }

    #[test]
    fn test_unproven_incumbent_is_best_effort() {
        assert_eq!(solve_status(true, 7, 9), SolveStatus::BestEffort);
        assert_eq!(solve_status(true, 9, 9), SolveStatus::Optimal);
        assert_eq!(solve_status(false, 7, 9), SolveStatus::Optimal);
    }

    #[test]
    fn test_greedy_descent_fits_in_one_node_per_course() {
        let config = SearchConfig {
            budget: SearchBudget::unbounded().with_max_nodes(4),
            parallel: false,
        };
        let (_, _, result) = run(dims(4, 2, 3, 3, 2), config);
        let solution = result.unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.objective, 3 * 3 + 2);
        assert_eq!(solution.stats.nodes, 4);
    }

    #[test]
    fn test_objective_fills_best_periods_across_days() {
        // 8 courses over 3 days: 3 in P1, 3 in P2, 2 in P3
        let (space, model, result) = run(dims(8, 2, 3, 4, 3), SearchConfig::default());
        let solution = result.unwrap();
        assert_eq!(solution.objective, 3 * 4 + 3 * 3 + 2 * 2);
        assert!(model.check(&space, &solution.assignment).is_ok());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = run(dims(7, 2, 3, 3, 2), SearchConfig::default()).2.unwrap();
        let parallel = run(
            dims(7, 2, 3, 3, 2),
            SearchConfig {
                parallel: true,
                ..SearchConfig::default()
            },
        )
        .2
        .unwrap();
        assert_eq!(parallel.objective, sequential.objective);
        assert_eq!(parallel.assignment, sequential.assignment);
        assert_eq!(parallel.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let first = run(dims(5, 3, 2, 3, 2), SearchConfig::default()).2.unwrap();
        let second = run(dims(5, 3, 2, 3, 2), SearchConfig::default()).2.unwrap();
        assert_eq!(first.objective, second.objective);
        assert_eq!(first.assignment, second.assignment);
    }

    #[test]
    fn test_best_weights_takes_heaviest_free_slots() {
        let mut pool = SlotPool::new(6, 3); // two slots per period
        let weights = [5, 3, 1];
        let order = period_order(&weights);
        assert_eq!(pool.best_weights(3, &order, &weights), Some(5 + 5 + 3));
        pool.take(0, 0);
        assert_eq!(pool.best_weights(3, &order, &weights), Some(5 + 3 + 3));
        assert_eq!(pool.best_weights(6, &order, &weights), None);
        pool.release(0, 0);
        assert_eq!(pool.best_weights(0, &order, &weights), Some(0));
    }

    #[test]
    fn test_incumbent_prefers_objective_then_earlier_branch() {
        let incumbent = Incumbent::default();
        assert!(incumbent.beats(0, 7));
        assert!(incumbent.offer(10, 3));
        assert!(!incumbent.beats(10, 4));
        assert!(incumbent.beats(10, 2));
        assert!(incumbent.beats(11, 9));
        assert!(!incumbent.offer(9, 0));
    }

    #[test]
    fn test_period_order_is_by_descending_weight() {
        assert_eq!(period_order(&[1, 5, 3]), vec![1, 2, 0]);
    }
}
