use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use liars_common::Mode;

use crate::{
    config::SimulationConfig,
    error::NodeError,
    orchestrator::{RunReport, Simulation},
    roster::{ClaimPlan, Roster},
};

#[derive(Parser, Debug)]
#[command(name = "liarslie")]
#[command(about = "Find the true network value among liars")]
pub struct Cli {
    /// JSON config file; defaults apply when it does not exist
    #[arg(long, global = true, value_name = "FILE", default_value = "liarslie.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct EnlistArgs {
    /// True value of the network
    #[arg(long)]
    pub value: i64,

    /// Max value that a liar can claim
    #[arg(long)]
    pub max_value: i64,

    /// Number of agents to add
    #[arg(long)]
    pub num_agents: usize,

    /// Fraction of liars among the new agents, in [0, 1)
    #[arg(long)]
    pub liar_ratio: f64,
}

impl EnlistArgs {
    pub fn plan(&self) -> ClaimPlan {
        ClaimPlan {
            value: self.value,
            max_value: self.max_value,
            liar_ratio: self.liar_ratio,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Expert,
    Standard,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Expert => Mode::Expert,
            ModeArg::Standard => Mode::Standard,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wipe previous artifacts and register a fresh set of agents
    Start(EnlistArgs),
    /// Add agents to the existing roster, then play one expert round
    Extend(EnlistArgs),
    /// Play one round over the saved roster
    Play {
        #[arg(long, value_enum, default_value_t = ModeArg::Standard)]
        mode: ModeArg,
    },
    /// Remove an agent and its claim
    Kill {
        #[arg(long)]
        id: String,
    },
    /// Remove the roster file and the vault
    Stop,
}

impl Cli {
    pub async fn execute(self, config: SimulationConfig) -> Result<(), NodeError> {
        match self.command {
            Commands::Start(args) => {
                let mut sim = Simulation::new(config, Roster::default());
                sim.reset()?;
                let added = sim.enlist(args.num_agents, &args.plan(), &mut rand::thread_rng())?;
                sim.save_roster()?;
                sim.close()?;
                println!("Ready... {} agents registered", added.len());
            }

            Commands::Extend(args) => {
                let roster = Roster::load(&config.roster_path)?;
                let mut sim = Simulation::new(config, roster);
                let added = sim.enlist(args.num_agents, &args.plan(), &mut rand::thread_rng())?;
                sim.save_roster()?;
                println!("Updated roster with {} new agents.", added.len());

                let report = sim.run(Mode::Expert).await?;
                print_report(&report);
                sim.close()?;
            }

            Commands::Play { mode } => {
                let roster = Roster::load(&config.roster_path)?;
                let sim = Simulation::new(config, roster);
                let report = sim.run(mode.into()).await?;
                print_report(&report);
                sim.close()?;
            }

            Commands::Kill { id } => {
                let roster = Roster::load(&config.roster_path)?;
                let mut sim = Simulation::new(config, roster);
                let removed = sim.kill(&id)?;
                sim.save_roster()?;
                sim.close()?;
                println!("Removed {} ({}).", removed.name, removed.address);
            }

            Commands::Stop => {
                remove_artifacts(&config)?;
                println!("All liarslie artifacts removed.");
            }
        }
        Ok(())
    }
}

fn print_report(report: &RunReport) {
    match report.value.value() {
        Some(_) => println!("The computed network value is {}", report.value),
        None => println!("No data: the roster is empty or no agent reached a value."),
    }
    for (address, claim) in &report.claims {
        println!("  {address} -> {claim}");
    }
    if report.failures() > 0 {
        println!("{} of {} agents did not finish.", report.failures(), report.outcomes.len());
    }
}

/// Deletes the roster file and the vault directory. Missing ones are fine.
pub fn remove_artifacts(config: &SimulationConfig) -> Result<(), NodeError> {
    ignore_missing(std::fs::remove_file(&config.roster_path))?;
    ignore_missing(std::fs::remove_dir_all(&config.storage_dir))?;
    info!(
        "removed {} and {}",
        config.roster_path.display(),
        config.storage_dir.display()
    );
    Ok(())
}

fn ignore_missing(res: io::Result<()>) -> io::Result<()> {
    match res {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
