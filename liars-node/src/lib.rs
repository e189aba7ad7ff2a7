pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod roster;

pub use config::SimulationConfig;
pub use error::{AgentError, NodeError};
pub use orchestrator::{AgentOutcome, RunReport, Simulation};
pub use roster::{register_claims, ClaimPlan, Roster};
