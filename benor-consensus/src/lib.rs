pub mod cluster;
pub mod consensus;

pub use cluster::core::Process;
pub use consensus::{ConsensusEngine, QuorumPolicy};
