use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rand::Rng;
use tokio::task::JoinSet;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{info, warn};

use liars_common::{Claim, Mode, Participant};
use liars_consensus::NetworkValue;
use liars_vault::{Vault, VaultHandle};

use crate::{
    agent::{self, AgentContext},
    config::SimulationConfig,
    error::{AgentError, NodeError},
    roster::{register_claims, ClaimPlan, Roster},
};

#[derive(Debug)]
pub struct AgentOutcome {
    pub name: String,
    pub result: Result<Option<i64>, AgentError>,
}

/// Result of one round over the whole roster.
#[derive(Debug)]
pub struct RunReport {
    pub mode: Mode,
    pub outcomes: Vec<AgentOutcome>,
    pub value: NetworkValue,
    /// Vault contents once every agent has finished, keyed by address.
    pub claims: BTreeMap<String, Claim>,
}

impl RunReport {
    pub fn resolved(&self) -> impl Iterator<Item = i64> + '_ {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().copied().flatten())
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Owns the roster and the vault for a sequence of rounds.
pub struct Simulation {
    config: Arc<SimulationConfig>,
    roster: Roster,
    vault: VaultHandle,
}

impl Simulation {
    pub fn new(config: SimulationConfig, roster: Roster) -> Self {
        let vault = VaultHandle::new(config.storage_dir.clone());
        Self {
            config: Arc::new(config),
            roster,
            vault,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The shared vault, opened on first use.
    pub fn vault(&self) -> Result<Arc<Vault>, NodeError> {
        Ok(self.vault.get()?)
    }

    /// Adds `count` agents and stores their claims.
    pub fn enlist<R: Rng + ?Sized>(
        &mut self,
        count: usize,
        plan: &ClaimPlan,
        rng: &mut R,
    ) -> Result<Vec<(Participant, Claim)>, NodeError> {
        plan.validate()?;
        let vault = self.vault()?;
        let added = self
            .roster
            .enlist(count, self.config.base_port, &self.config.listen_host)?;
        let claims = register_claims(&vault, &added, plan, rng)?;
        Ok(added.into_iter().zip(claims).collect())
    }

    /// Removes an agent from the roster and deletes its claim.
    pub fn kill(&mut self, name: &str) -> Result<Participant, NodeError> {
        let participant = self
            .roster
            .find(name)
            .cloned()
            .ok_or_else(|| NodeError::UnknownAgent(name.to_string()))?;

        let existed = self.vault()?.delete(&participant.address)?;
        if !existed {
            warn!("{name} had no stored claim");
        }
        self.roster.remove(name);
        info!("killed {name} at {}", participant.address);
        Ok(participant)
    }

    /// Empties the roster and drops every stored claim.
    pub fn reset(&mut self) -> Result<(), NodeError> {
        let vault = self.vault()?;
        vault.clear()?;
        self.roster = Roster::default();
        info!("vault at {} cleared", vault.path().display());
        Ok(())
    }

    pub fn save_roster(&self) -> Result<(), NodeError> {
        self.roster.save(&self.config.roster_path)
    }

    /// Runs one round: a task per agent, then waits for all of them.
    pub async fn run(&self, mode: Mode) -> Result<RunReport, NodeError> {
        let roster: Arc<[Participant]> = self.roster.participants().into();
        if roster.is_empty() {
            return Ok(self.report(mode, Vec::new(), BTreeMap::new()));
        }

        let vault = self.vault()?;
        let run = CancellationToken::new();
        let round = run.child_token();
        let background = TaskTracker::new();

        info!("starting {mode} round with {} agents", roster.len());

        let mut tasks = JoinSet::new();
        for index in 0..roster.len() {
            let ctx = AgentContext {
                vault: vault.clone(),
                roster: roster.clone(),
                config: self.config.clone(),
                round: round.clone(),
                run: run.clone(),
                background: background.clone(),
            };
            tasks.spawn(async move {
                let result = catch_panic(agent::run_agent(mode, index, ctx)).await;
                (index, result)
            });
        }

        let deadline = {
            let round = round.clone();
            let timeout = self.config.round_timeout();
            tokio::spawn(async move {
                tokio::select! {
                    _ = round.cancelled() => {}
                    _ = tokio::time::sleep(timeout) => {
                        warn!("round deadline of {timeout:?} reached, cancelling agents");
                        round.cancel();
                    }
                }
            })
        };

        let mut results: Vec<Option<Result<Option<i64>, AgentError>>> =
            (0..roster.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("agent task lost: {e}"),
            }
        }

        deadline.abort();
        run.cancel();
        background.close();
        background.wait().await;

        let outcomes = roster
            .iter()
            .zip(results)
            .map(|(p, result)| AgentOutcome {
                name: p.name.clone(),
                result: result.unwrap_or_else(|| Err(AgentError::Panicked("task aborted".into()))),
            })
            .collect();
        let claims = vault.snapshot()?;
        Ok(self.report(mode, outcomes, claims))
    }

    /// Closes the vault. Fails if a round is still holding it.
    pub fn close(self) -> Result<(), NodeError> {
        Ok(self.vault.close()?)
    }

    fn report(
        &self,
        mode: Mode,
        outcomes: Vec<AgentOutcome>,
        claims: BTreeMap<String, Claim>,
    ) -> RunReport {
        for o in &outcomes {
            match &o.result {
                Ok(Some(v)) => info!("{} resolved {v}", o.name),
                Ok(None) => info!("{} resolved without a value", o.name),
                Err(e) => warn!("{} failed: {e}", o.name),
            }
        }

        let value = NetworkValue::from_resolved(
            outcomes.iter().map(|o| o.result.as_ref().ok().copied().flatten()),
        );
        info!(
            target: "consensus",
            "EVENT:NETWORK_VALUE mode={} agents={} value={:?}",
            mode,
            outcomes.len(),
            value
        );
        RunReport { mode, outcomes, value, claims }
    }
}

/// Runs one agent future, turning a panic into [`AgentError::Panicked`].
async fn catch_panic<F>(agent: F) -> Result<Option<i64>, AgentError>
where
    F: Future<Output = Result<Option<i64>, AgentError>>,
{
    AssertUnwindSafe(agent)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(AgentError::Panicked(panic_message(&*panic))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<Any>".to_string()
    }
}
