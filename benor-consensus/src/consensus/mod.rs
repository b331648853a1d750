//! consensus.rs
//!
//! Ben-Or randomized binary consensus for one process.
//!
//! `registry` stores the votes received per phase and round, `evaluator`
//! applies the `N - F` quorum, the strict-majority rule and the `F + 1`
//! decision threshold, and `engine` ties both into the per-process state
//! machine that decides when to report, decide or advance.

mod engine;
pub mod evaluator;
pub mod registry;

pub use engine::{ConsensusEngine, ProcessState};
pub use evaluator::{count_values, ConsensusEvaluator, PostVoteOutcome, QuorumPolicy, ValueCounts};
pub use registry::{RoundLedger, VoteRegistry};
