//! Alternative backend: hand the constraint model to the HiGHS ILP solver.

use crate::data::{SearchStats, SolveStatus};
use crate::error::{InfeasibleReason, SchedulingError};
use crate::model::{Assignment, ConstraintModel, Relation};
use crate::search::Solution;
use crate::variables::VariableSpace;
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution as _, SolverModel,
};
use log::info;
use std::time::Instant;

/// Solves `model` to optimality with HiGHS.
pub fn solve(space: &VariableSpace, model: &ConstraintModel) -> Result<Solution, SchedulingError> {
    let start_time = Instant::now();
    info!(
        "Setting up ILP model with {} variables and {} constraints...",
        space.len(),
        model.constraints().len()
    );

    // x_v = 1 if variable v's (course, room, day, period, level, teacher) is chosen
    let mut problem = ProblemVariables::new();
    let vars = problem.add_vector(variable().binary(), space.len());

    let objective: Expression = vars
        .iter()
        .enumerate()
        .map(|(v, &x)| f64::from(model.objective().coefficient(space, v)) * x)
        .sum();

    let mut ilp = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", 1) // limit to 1 thread for reproducibility
        .set_option("random_seed", 1234)
        .set_option("log_to_console", "false");

    for c in model.constraints() {
        let lhs: Expression = model.members(space, c).iter().map(|&v| vars[v]).sum();
        let _ = match c.relation {
            Relation::Exactly(n) => {
                let rhs = f64::from(n);
                ilp.add_constraint(constraint!(lhs == rhs))
            }
            Relation::AtMost(n) => {
                let rhs = f64::from(n);
                ilp.add_constraint(constraint!(lhs <= rhs))
            }
        };
    }

    info!("Starting ILP solver...");
    let solution = ilp.solve().map_err(|e| match e {
        ResolutionError::Infeasible => SchedulingError::Infeasible(InfeasibleReason::Proven),
        other => SchedulingError::Ilp(other.to_string()),
    })?;
    let duration = start_time.elapsed();
    info!("Solution found in {:.2?}", duration);

    let mut assignment = Assignment::empty(space.dimensions().courses);
    for (v, &x) in vars.iter().enumerate() {
        if solution.value(x) > 0.9 {
            assignment.set(space.key(v).course, Some(v));
        }
    }
    let objective = model.objective().value(space, assignment.support());

    Ok(Solution {
        assignment,
        objective,
        status: SolveStatus::Optimal,
        stats: SearchStats {
            nodes: 0,
            elapsed_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        },
    })
}
