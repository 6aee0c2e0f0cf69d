use std::fmt;
use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use log::debug;
use serde_json::Value;

use setlist::logging::set_log_level;
use setlist::{ActionResult, Store, StoreConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Setlist - ordered workouts, sets and exercises", long_about = None)]
struct Args {
    /// SQLite database url or path
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    #[arg(short, long, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Pool size for file-backed databases
    #[arg(long, env = "SETLIST_MAX_CONNECTIONS")]
    max_connections: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Off => write!(f, "off"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Workouts and their sets
    Workout {
        #[command(subcommand)]
        action: WorkoutAction,
    },
    /// Sets within a workout
    Set {
        #[command(subcommand)]
        action: SetAction,
    },
    /// Exercises and their placement in sets
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },
    /// Delete every workout, set and exercise
    Reset,
}

#[derive(Subcommand, Debug)]
enum WorkoutAction {
    List {
        #[arg(short, long)]
        limit: Option<i64>,
    },
    Show {
        id: i64,
    },
    /// JSON input, e.g. '{"name": "Push", "restTime": 90}'. Use - for stdin.
    Create {
        #[arg(short, long)]
        input: String,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        input: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
enum SetAction {
    List {
        #[arg(short, long)]
        workout: Option<i64>,
        #[arg(short, long)]
        limit: Option<i64>,
    },
    Show {
        id: i64,
    },
    /// JSON input, e.g. '{"workoutId": 1, "setOrder": 2, "restTime": 30}'
    Create {
        #[arg(short, long)]
        input: String,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        input: String,
    },
    Delete {
        id: i64,
    },
    /// JSON list of {id, setOrder, workoutId}
    Reorder {
        #[arg(short, long)]
        input: String,
    },
}

#[derive(Subcommand, Debug)]
enum ExerciseAction {
    List {
        /// Only exercises used in this set
        #[arg(short, long)]
        set: Option<i64>,
        /// List every exercise, with its order in --set where it has one
        #[arg(long)]
        with_order: bool,
    },
    Show {
        id: i64,
    },
    /// JSON input, e.g. '{"name": "Squat", "reps": 8, "setId": 1, "exerciseOrder": 1}'
    Create {
        #[arg(short, long)]
        input: String,
    },
    Update {
        id: i64,
        #[arg(short, long)]
        input: String,
    },
    Delete {
        id: String,
    },
    /// Move an exercise to another slot in a set
    Order {
        #[arg(short, long)]
        set: i64,
        #[arg(short, long)]
        exercise: i64,
        #[arg(short, long)]
        to: i64,
    },
    /// Take an exercise out of a set
    Remove {
        #[arg(short, long)]
        set: i64,
        #[arg(short, long)]
        exercise: i64,
    },
    /// JSON list of {exerciseId, exerciseOrder, setId}
    Reorder {
        #[arg(short, long)]
        input: String,
    },
}

fn read_input(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read input from stdin")?;
        buf
    } else {
        input.to_string()
    };
    serde_json::from_str(&text).with_context(|| format!("Input is not valid JSON: {}", text))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome<T: serde::Serialize>(outcome: &ActionResult<T>) -> Result<ExitCode> {
    print_json(outcome)?;
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_found<T: serde::Serialize>(found: Option<T>, what: &str, id: i64) -> Result<ExitCode> {
    match found {
        Some(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("{} {} not found", what, id);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_workout(store: &Store, action: WorkoutAction) -> Result<ExitCode> {
    match action {
        WorkoutAction::List { limit } => {
            print_json(&store.workouts(limit).await?)?;
            Ok(ExitCode::SUCCESS)
        }
        WorkoutAction::Show { id } => print_found(store.workout(id).await?, "Workout", id),
        WorkoutAction::Create { input } => {
            print_outcome(&store.create_workout(read_input(&input)?).await)
        }
        WorkoutAction::Update { id, input } => {
            print_outcome(&store.update_workout(id, read_input(&input)?).await)
        }
        WorkoutAction::Delete { id } => print_outcome(&store.delete_workout(id).await),
    }
}

async fn run_set(store: &Store, action: SetAction) -> Result<ExitCode> {
    match action {
        SetAction::List { workout, limit } => {
            print_json(&store.sets(workout, limit).await?)?;
            Ok(ExitCode::SUCCESS)
        }
        SetAction::Show { id } => print_found(store.set(id).await?, "Set", id),
        SetAction::Create { input } => print_outcome(&store.create_set(read_input(&input)?).await),
        SetAction::Update { id, input } => {
            print_outcome(&store.update_set(id, read_input(&input)?).await)
        }
        SetAction::Delete { id } => print_outcome(&store.delete_set(id).await),
        SetAction::Reorder { input } => {
            print_outcome(&store.reorder_sets(read_input(&input)?).await)
        }
    }
}

async fn run_exercise(store: &Store, action: ExerciseAction) -> Result<ExitCode> {
    match action {
        ExerciseAction::List { set, with_order } => {
            if with_order {
                print_json(&store.exercises_with_optional_order(set).await?)?;
            } else {
                print_json(&store.exercises_with_set_info(set).await?)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        ExerciseAction::Show { id } => print_found(store.exercise(id).await?, "Exercise", id),
        ExerciseAction::Create { input } => {
            print_outcome(&store.create_exercise(read_input(&input)?).await)
        }
        ExerciseAction::Update { id, input } => {
            print_outcome(&store.update_exercise(id, read_input(&input)?).await)
        }
        ExerciseAction::Delete { id } => {
            print_outcome(&store.delete_exercise(&Value::String(id)).await)
        }
        ExerciseAction::Order { set, exercise, to } => {
            print_outcome(&store.update_exercise_order_in_set(set, exercise, to).await)
        }
        ExerciseAction::Remove { set, exercise } => {
            print_outcome(&store.remove_exercise_from_set(set, exercise).await)
        }
        ExerciseAction::Reorder { input } => {
            print_outcome(&store.reorder_set_exercises(read_input(&input)?).await)
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let args = Args::parse();
    set_log_level(&args.log_level.to_string());

    let mut config = StoreConfig::from_env()?;
    if let Some(database) = args.database {
        config.database_url = database;
    }
    if let Some(max_connections) = args.max_connections {
        config = config.with_max_connections(max_connections);
    }
    debug!("Using database {}", config.database_url);

    let store = Store::open(&config)
        .await
        .with_context(|| format!("Failed to open store at {}", config.database_url))?;

    let code = match args.command {
        Commands::Workout { action } => run_workout(&store, action).await,
        Commands::Set { action } => run_set(&store, action).await,
        Commands::Exercise { action } => run_exercise(&store, action).await,
        Commands::Reset => store.clear().await.map(|()| {
            println!("All workouts, sets and exercises removed");
            ExitCode::SUCCESS
        }),
    };
    store.close().await;
    code
}
