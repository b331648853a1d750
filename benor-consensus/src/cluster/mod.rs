pub mod core;
mod shutdown;
mod voting;
