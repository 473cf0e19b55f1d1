use crate::catalog::{Catalog, Dataset};
use crate::config::{AppConfig, Backend, SearchSettings};
use crate::data::{ScheduleEntry, SchedulingOutput, Selector, UnmetPreference};
use crate::error::SchedulingError;
use crate::model::{ConstraintKind, ConstraintModel};
use crate::projector;
use crate::search::{self, Solution};
use crate::variables::VariableSpace;
use log::{error, info, trace, warn};
use std::time::Instant;

/// Generates the timetable for one level and semester of the shared dataset.
pub fn generate(
    dataset: &Dataset,
    selector: Selector,
    config: &AppConfig,
    settings: &SearchSettings,
) -> Result<SchedulingOutput, SchedulingError> {
    info!("Generating timetable for {selector}");
    let catalog = Catalog::build(dataset, selector, &config.data.subject_area, &config.calendar)?;
    solve(&catalog, settings)
}

/// Runs one generation over an already-built catalog.
pub fn solve(catalog: &Catalog, settings: &SearchSettings) -> Result<SchedulingOutput, SchedulingError> {
    let start_time = Instant::now();

    let space = VariableSpace::build(catalog);
    trace!(
        "Generated {} assignment variables for {} courses",
        space.len(),
        catalog.courses().len()
    );
    let model = ConstraintModel::build(&space, &catalog.calendar().weights());

    let solution = run_backend(&space, &model, settings)?;
    let output = accept(catalog, &space, &model, solution)?;
    info!(
        "Scheduled {} courses with score {} in {:.2?}",
        output.entries.len(),
        output.score,
        start_time.elapsed()
    );
    Ok(output)
}

/// Checks a backend answer against the model and projects it.
fn accept(
    catalog: &Catalog,
    space: &VariableSpace,
    model: &ConstraintModel,
    solution: Solution,
) -> Result<SchedulingOutput, SchedulingError> {
    let score = model.check(space, &solution.assignment).map_err(|violation| {
        error!("Solver returned an inconsistent assignment: {violation}");
        match violation.constraint.kind {
            ConstraintKind::Coverage if violation.count == 0 => {
                SchedulingError::IncompleteAssignment {
                    course: violation.constraint.group,
                }
            }
            _ => SchedulingError::InvalidAssignment(violation),
        }
    })?;
    if score != solution.objective {
        warn!(
            "Backend reported objective {} but the assignment scores {score}",
            solution.objective
        );
    }

    let entries = projector::project(catalog, space, &solution.assignment)?;
    let unmet_preferences = unmet_preferences(&entries, catalog);
    Ok(SchedulingOutput {
        entries,
        score,
        status: solution.status,
        stats: solution.stats,
        unmet_preferences,
    })
}

fn run_backend(
    space: &VariableSpace,
    model: &ConstraintModel,
    settings: &SearchSettings,
) -> Result<Solution, SchedulingError> {
    match settings.backend {
        Backend::BranchAndBound => search::search(space, model, &settings.search_config()),
        #[cfg(feature = "ilp")]
        Backend::Ilp => crate::ilp::solve(space, model),
        #[cfg(not(feature = "ilp"))]
        Backend::Ilp => Err(SchedulingError::Config(
            "the ilp backend needs the `ilp` cargo feature".to_string(),
        )),
    }
}

/// Lists every entry that missed the most preferred period.
fn unmet_preferences(entries: &[ScheduleEntry], catalog: &Catalog) -> Vec<UnmetPreference> {
    let Some(best) = catalog.periods().first() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter(|entry| entry.period_index != 0)
        .map(|entry| UnmetPreference {
            constraint_type: "Prefer Early Periods".to_string(),
            description: format!(
                "Course {} ({}) is scheduled on {} at {}, not in {}",
                entry.course_code, entry.course_name, entry.day, entry.period, best.label
            ),
        })
        .collect()
}
