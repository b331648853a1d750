pub mod http;
pub mod in_memory;
pub mod ports;

pub use http::HttpBroadcaster;
pub use in_memory::{InMemoryBroadcaster, InMemoryNetwork};
pub use ports::VoteBroadcaster;
