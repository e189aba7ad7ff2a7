use std::fmt;

use serde::{Deserialize, Serialize};

/// Which aggregation path an agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Gossip over libp2p and vote on what peers claim.
    Expert,
    /// Scan the vault snapshot directly.
    Standard,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Expert => f.write_str("expert"),
            Mode::Standard => f.write_str("standard"),
        }
    }
}
