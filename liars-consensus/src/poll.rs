use std::sync::Arc;

use tracing::{info, warn};

use liars_common::{Claim, Participant};
use liars_vault::Vault;

use crate::tally::VoteTally;

/// Standard-mode consensus: reads every other participant's claim straight
/// from the vault. Nothing is written back.
#[derive(Debug, Clone)]
pub struct PollAggregator {
    vault: Arc<Vault>,
}

impl PollAggregator {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }

    /// Tallies the claims of all roster entries except `own_index`.
    /// Returns `None` when no other participant has a value.
    pub fn resolve(&self, own_index: usize, roster: &[Participant]) -> Option<i64> {
        let tally = self.collect(own_index, roster);
        let winner = tally.leader().map(|(v, _)| v);

        let agent = roster.get(own_index).map(|p| p.name.as_str()).unwrap_or("?");
        info!(
            target: "consensus",
            "EVENT:POLL agent={} votes={} winner={:?}",
            agent,
            tally.total(),
            winner
        );
        winner
    }

    pub fn collect(&self, own_index: usize, roster: &[Participant]) -> VoteTally {
        let mut tally = VoteTally::new();
        for (i, p) in roster.iter().enumerate() {
            if i == own_index {
                continue;
            }
            match self.vault.get(&p.address) {
                Ok(Some(Claim::Value(v))) => tally.record(v),
                Ok(Some(Claim::Absent)) | Ok(None) => {}
                Err(e) => warn!("poll lookup of {} failed: {e}", p.address),
            }
        }
        tally
    }
}
