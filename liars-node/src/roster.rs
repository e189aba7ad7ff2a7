//! roster.rs
//!
//! The ordered list of agents (`agents.json`) and the claims registered for
//! them in the vault.

use std::fs;
use std::io;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use liars_common::{Claim, Participant};
use liars_vault::Vault;

use crate::error::NodeError;

const NAME_PREFIX: &str = "agent-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    /// Reads the roster file. A missing file is an empty roster.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NodeError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    /// Appends `count` agents named `agent-<n>` listening on
    /// `/ip4/<host>/tcp/<base_port + n>`, numbered after the highest existing
    /// agent. Returns the new entries.
    pub fn enlist(
        &mut self,
        count: usize,
        base_port: u16,
        host: &str,
    ) -> Result<Vec<Participant>, NodeError> {
        let first = self.next_number();
        let mut added = Vec::with_capacity(count);

        for n in first..first + count {
            let port = u16::try_from(n)
                .ok()
                .and_then(|n| base_port.checked_add(n))
                .ok_or_else(|| {
                    NodeError::Config(format!("agent {n} does not fit above base port {base_port}"))
                })?;
            added.push(Participant::new(
                format!("{NAME_PREFIX}{n}"),
                format!("/ip4/{host}/tcp/{port}"),
            ));
        }

        self.participants.extend(added.iter().cloned());
        Ok(added)
    }

    pub fn remove(&mut self, name: &str) -> Option<Participant> {
        let pos = self.participants.iter().position(|p| p.name == name)?;
        Some(self.participants.remove(pos))
    }

    fn next_number(&self) -> usize {
        self.participants
            .iter()
            .filter_map(|p| p.name.strip_prefix(NAME_PREFIX)?.parse::<usize>().ok())
            .max()
            .map_or(1, |n| n + 1)
    }
}

/// How claims are handed out to newly enlisted agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimPlan {
    /// The true network value.
    pub value: i64,
    /// Upper bound (inclusive) of the values a liar may claim.
    pub max_value: i64,
    /// Fraction of liars, in `[0, 1)`.
    pub liar_ratio: f64,
}

impl ClaimPlan {
    pub fn validate(&self) -> Result<(), NodeError> {
        if !(0.0..1.0).contains(&self.liar_ratio) {
            return Err(NodeError::Config(format!(
                "liar ratio must be in [0, 1), got {}",
                self.liar_ratio
            )));
        }
        if !(0..i64::MAX).contains(&self.max_value) {
            return Err(NodeError::Config(format!(
                "max value must be in [0, {}), got {}",
                i64::MAX,
                self.max_value
            )));
        }
        Ok(())
    }

    pub fn liars_in(&self, count: usize) -> usize {
        ((count as f64) * self.liar_ratio).floor() as usize
    }

    /// A value in `0..=max_value` other than the true one.
    fn liar_value<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let in_range = (0..=self.max_value).contains(&self.value);
        let choices = self.max_value + 1 - i64::from(in_range);
        if choices <= 0 {
            return self.max_value + 1;
        }
        let pick = rng.gen_range(0..choices);
        if in_range && pick >= self.value {
            pick + 1
        } else {
            pick
        }
    }
}

/// Stores a claim for every agent in `agents`: the leading ones tell the
/// truth, the trailing `liars_in(len)` lie. Returns the claims in order.
pub fn register_claims<R: Rng + ?Sized>(
    vault: &Vault,
    agents: &[Participant],
    plan: &ClaimPlan,
    rng: &mut R,
) -> Result<Vec<Claim>, NodeError> {
    plan.validate()?;
    let honest = agents.len() - plan.liars_in(agents.len());

    let mut claims = Vec::with_capacity(agents.len());
    for (i, agent) in agents.iter().enumerate() {
        let claim = if i < honest {
            Claim::Value(plan.value)
        } else {
            Claim::Value(plan.liar_value(rng))
        };
        vault.put(&agent.address, claim)?;
        debug!("registered {} at {} claiming {claim}", agent.name, agent.address);
        claims.push(claim);
    }

    info!(
        "registered {} agents ({} liars) for value {}",
        agents.len(),
        agents.len() - honest,
        plan.value
    );
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_enlist_numbers_and_ports() {
        let mut roster = Roster::default();
        let added = roster.enlist(3, 41000, "127.0.0.1").unwrap();

        assert_eq!(added[0], Participant::new("agent-1", "/ip4/127.0.0.1/tcp/41001"));
        assert_eq!(added[2].address, "/ip4/127.0.0.1/tcp/41003");
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_enlist_continues_after_removal() {
        let mut roster = Roster::default();
        roster.enlist(3, 41000, "127.0.0.1").unwrap();
        roster.remove("agent-2").unwrap();

        let added = roster.enlist(1, 41000, "127.0.0.1").unwrap();
        assert_eq!(added[0].name, "agent-4");
        assert_eq!(roster.participants().len(), 3);
    }

    #[test]
    fn test_enlist_rejects_port_overflow() {
        let mut roster = Roster::default();
        assert!(matches!(roster.enlist(2, u16::MAX - 1, "127.0.0.1"), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_remove_unknown_is_none() {
        let mut roster = Roster::default();
        assert!(roster.remove("agent-9").is_none());
    }

    #[test]
    fn test_load_missing_is_empty_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agents.json");
        assert!(Roster::load(&path).unwrap().is_empty());

        let mut roster = Roster::default();
        roster.enlist(2, 41000, "127.0.0.1").unwrap();
        roster.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('['));
        assert_eq!(Roster::load(&path).unwrap(), roster);
    }

    #[test]
    fn test_liar_count_floors() {
        let plan = ClaimPlan { value: 10, max_value: 100, liar_ratio: 0.3 };
        assert_eq!(plan.liars_in(5), 1);
        assert_eq!(plan.liars_in(10), 3);
        assert_eq!(plan.liars_in(0), 0);
    }

    #[test]
    fn test_liar_values_never_match_truth() {
        let plan = ClaimPlan { value: 3, max_value: 5, liar_ratio: 0.5 };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let v = plan.liar_value(&mut rng);
            assert!((0..=5).contains(&v));
            assert_ne!(v, 3);
        }

        let degenerate = ClaimPlan { value: 0, max_value: 0, liar_ratio: 0.5 };
        assert_eq!(degenerate.liar_value(&mut rng), 1);
    }

    #[test]
    fn test_register_claims_splits_truth_and_lies() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Vault::open(dir.path()).unwrap();
        let mut roster = Roster::default();
        let agents = roster.enlist(5, 41000, "127.0.0.1").unwrap();
        let plan = ClaimPlan { value: 10, max_value: 50, liar_ratio: 0.4 };

        let claims =
            register_claims(&vault, &agents, &plan, &mut StdRng::seed_from_u64(1)).unwrap();

        assert_eq!(&claims[..3], &[Claim::Value(10); 3]);
        for (agent, claim) in agents.iter().zip(&claims) {
            assert_eq!(vault.get(&agent.address).unwrap(), Some(*claim));
        }
        for liar in &claims[3..] {
            assert_ne!(*liar, Claim::Value(10));
        }
    }

    #[test]
    fn test_register_claims_rejects_unbounded_max_value() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Vault::open(dir.path()).unwrap();
        let mut roster = Roster::default();
        let agents = roster.enlist(2, 41000, "127.0.0.1").unwrap();
        let plan = ClaimPlan { value: 10, max_value: i64::MAX, liar_ratio: 0.5 };

        let res = register_claims(&vault, &agents, &plan, &mut StdRng::seed_from_u64(1));
        assert!(matches!(res, Err(NodeError::Config(_))));
        // nothing written before the plan was refused
        assert!(vault.is_empty().unwrap());

        let widest = ClaimPlan { max_value: i64::MAX - 1, ..plan };
        let claims =
            register_claims(&vault, &agents, &widest, &mut StdRng::seed_from_u64(1)).unwrap();
        let Claim::Value(lie) = claims[1] else {
            panic!("liar must claim a value");
        };
        assert!((0..i64::MAX).contains(&lie));
        assert_ne!(lie, 10);
    }

    #[test]
    fn test_register_claims_rejects_bad_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Vault::open(dir.path()).unwrap();
        let plan = ClaimPlan { value: 10, max_value: 50, liar_ratio: 1.0 };

        let res = register_claims(&vault, &[], &plan, &mut rand::thread_rng());
        assert!(matches!(res, Err(NodeError::Config(_))));
    }
}
