//! utils.rs
//!
//! Process identity and the static address book shared by every process and
//! by the driver.

pub mod node_id;
pub use node_id::ProcessId;

pub mod addressing;
pub use addressing::{Addressing, BASE_NODE_PORT};
