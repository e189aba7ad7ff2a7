//! Vote aggregation for the liar/truth-teller simulation.
//!
//! Two ways to reach a value: [`VoteAggregator`] counts gossip as it arrives
//! (expert mode) and [`PollAggregator`] reads the vault directly (standard
//! mode). Both break ties the same way through [`VoteTally`].

pub mod error;
pub mod expert;
pub mod poll;
pub mod tally;
pub mod verdict;

pub use error::ConsensusError;
pub use expert::{AggregatorState, Observation, VoteAggregator};
pub use poll::PollAggregator;
pub use tally::VoteTally;
pub use verdict::NetworkValue;
