use clap::{Parser, Subcommand};
use log::info;
use schedule_solver::catalog::Dataset;
use schedule_solver::config::AppConfig;
use schedule_solver::data::{Selector, Semester};
use schedule_solver::error::SchedulingError;
use schedule_solver::server::{self, AppState};
use schedule_solver::{solver, timetable};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "University course timetable generator")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the solver over HTTP (default)
    Serve,
    /// Generate one timetable and print it
    Print {
        #[arg(long, required_unless_present = "choice")]
        level: Option<u32>,
        #[arg(long, required_unless_present = "choice")]
        semester: Option<Semester>,
        /// Menu entry 1-10: Licence 1 S1 .. Master 2 S2
        #[arg(long, conflicts_with_all = ["level", "semester"])]
        choice: Option<u32>,
    },
}

fn print_timetable(
    state: &AppState,
    level: Option<u32>,
    semester: Option<Semester>,
    choice: Option<u32>,
) -> Result<(), SchedulingError> {
    let selector = match (choice, level, semester) {
        (Some(choice), _, _) => Selector::from_menu_choice(choice).ok_or_else(|| {
            SchedulingError::Config(format!("menu choice {choice} is not between 1 and 10"))
        })?,
        (None, Some(level), Some(semester)) => Selector::new(level, semester),
        _ => {
            return Err(SchedulingError::Config(
                "give --choice or both --level and --semester".to_string(),
            ))
        }
    };

    match solver::generate(&state.dataset, selector, &state.config, &state.config.search) {
        Ok(output) => {
            print!("{}", timetable::render(&output.entries));
            println!("Score: {} ({:?})", output.score, output.status);
            Ok(())
        }
        Err(e) if e.is_nothing_to_schedule() => {
            info!("{e}");
            print!("{}", timetable::render(&[]));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), SchedulingError> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_filter))
        .init();

    let dataset = Dataset::load(&config.data.subjects_path, &config.data.rooms_path)?;
    let state = AppState::new(dataset, config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::run_server(state).await,
        Command::Print {
            level,
            semester,
            choice,
        } => print_timetable(&state, level, semester, choice),
    }
}
