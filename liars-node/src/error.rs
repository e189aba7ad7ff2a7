use thiserror::Error;

use liars_consensus::ConsensusError;
use liars_p2p::P2pError;
use liars_vault::VaultError;

/// Why a single agent's task ended without a value.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent index {index} is outside a roster of {len}")]
    UnknownAgent { index: usize, len: usize },

    #[error("network error: {0}")]
    P2p(#[from] P2pError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("cancelled by the round deadline")]
    Cancelled,

    #[error("agent task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("roster file error: {0}")]
    Roster(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no agent named {0}")]
    UnknownAgent(String),

    #[error("logging setup failed: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
