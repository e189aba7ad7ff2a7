use thiserror::Error;

use liars_vault::VaultError;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("aggregation cancelled before quorum")]
    Cancelled,

    #[error("gossip stream closed before quorum")]
    StreamClosed,

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
}
