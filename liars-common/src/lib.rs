//! Shared types for the liarslie workspace.
//!
//! Agents, their claimed values and the run mode live here so the vault,
//! the p2p layer and the consensus crate agree on one vocabulary.

pub mod claim;
pub mod mode;
pub mod participant;

pub use claim::{Claim, ClaimParseError, ABSENT_MARKER};
pub use mode::Mode;
pub use participant::Participant;
