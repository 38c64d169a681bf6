use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cup_schedule_lib::{AppData, Config, Stage, Tournament, TournamentSetup, db, logic::competition::fixture::{HomeAway, Score}};

/// Group stage and knockout bracket scheduling with integrity checks and repairs.
#[derive(Parser, Debug)]
#[command(name = "cup-schedule", version, about, long_about = None)]
struct Cli {
    /// Repeat for more output (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON configuration file. Built-in defaults are used without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration.
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save the stage formats, groups and teams from a tournament file.
    Setup { file: PathBuf },

    /// Add a team to the next draw position of a group.
    AddTeam { group: char, name: String },

    /// Rename a team.
    Rename { team_id: i64, name: String },

    /// Remove a team that plays no match.
    RemoveTeam { team_id: i64 },

    /// Create the schedule of a stage for the first time.
    Generate { stage: Stage },

    /// Record the result of a match.
    #[command(name = "result")]
    Score {
        match_id: i64,
        home_goals: u8,
        away_goals: u8,
        /// Winner of the shootout of a level knockout match.
        #[arg(long)]
        shootout: Option<ShootoutWinner>,
    },

    /// Mark the results of a stage final and resolve every later stage.
    Final { stage: Stage },

    /// Resolve the placeholders of a stage.
    Resolve { stage: Stage },

    /// Report consistency violations of a stage.
    Check { stage: Stage },

    /// Repair the violations of a stage.
    Repair { stage: Stage },

    /// Delete and regenerate the schedule of a stage.
    Rebuild { stage: Stage },

    /// Print the schedule of a stage.
    Schedule { stage: Stage },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShootoutWinner {
    Home,
    Away,
}

impl From<ShootoutWinner> for HomeAway {
    fn from(value: ShootoutWinner) -> Self {
        match value {
            ShootoutWinner::Home => HomeAway::Home,
            ShootoutWinner::Away => HomeAway::Away,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(url) = cli.database {
        config.database_url = url;
    }

    let pool = db::setup(&config.database_url).await
        .with_context(|| format!("opening {}", config.database_url))?;
    let tournament = Tournament::new(AppData::build(pool, &config));

    match cli.command {
        Commands::Setup { file } => {
            let setup = TournamentSetup::load(&file).with_context(|| format!("reading {}", file.display()))?;
            let groups = tournament.setup(&setup, &config.stages).await?;
            print_json(&groups)?;
        },
        Commands::AddTeam { group, name } => {
            print_json(&tournament.add_team(group, &name).await?)?;
        },
        Commands::Rename { team_id, name } => {
            print_json(&tournament.rename_team(team_id, &name).await?)?;
        },
        Commands::RemoveTeam { team_id } => {
            tournament.remove_team(team_id).await?;
            println!("team {team_id} removed");
        },
        Commands::Generate { stage } => {
            let matches = tournament.generate(stage).await?;
            println!("{stage}: {} matches scheduled", matches.len());
        },
        Commands::Score { match_id, home_goals, away_goals, shootout } => {
            let score = Score::build(home_goals, away_goals, shootout.map(HomeAway::from));
            let game = tournament.record_result(match_id, score).await?;
            print_json(&game)?;
        },
        Commands::Final { stage } => {
            for (later, result) in tournament.results_final(stage).await? {
                println!(
                    "{later}: {} resolved, {} cleared, {} pending",
                    result.resolved.len(), result.cleared.len(), result.unresolved.len()
                );
            }
        },
        Commands::Resolve { stage } => {
            let result = tournament.resolve(stage).await?;
            print_json(&result.resolved)?;
            if !result.cleared.is_empty() {
                print_json(&result.cleared)?;
            }
            for pending in result.unresolved.iter() {
                println!("{pending}");
            }
        },
        Commands::Check { stage } => {
            let violations = tournament.check(stage).await?;
            print_json(&violations)?;
            if !violations.is_empty() {
                return Ok(2);
            }
        },
        Commands::Repair { stage } => {
            let report = tournament.repair(stage).await?;
            print_json(&report)?;
        },
        Commands::Rebuild { stage } => {
            let violations = tournament.rebuild(stage).await?;
            print_json(&violations)?;
        },
        Commands::Schedule { stage } => {
            print_json(&tournament.schedule(stage).await?)?;
        },
    }

    Ok(0)
}
