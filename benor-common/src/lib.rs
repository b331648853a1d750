pub mod config;
pub mod env;
pub mod error;
pub mod utils;

pub use config::{NetworkConfig, NodeSpec};
pub use env::consensus::types::{Phase, Round, RunId, Value, VoteMessage};
pub use env::node::NodeStateView;
pub use error::{BenOrError, Result};
pub use utils::{Addressing, ProcessId, BASE_NODE_PORT};
