pub mod builder;
pub mod driver;

pub use builder::{launch_in_memory, launch_network, ClusterControl, HttpCluster, InMemoryCluster};
pub use driver::{await_decisions, run_simulation, DriverOptions, SimulationReport};
