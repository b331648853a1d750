pub mod api;
pub mod cli;
pub mod rpc;
pub mod runtime;
pub mod setup;

pub use runtime::{launch_in_memory, launch_network, run_simulation};
