pub mod consensus;
pub mod node;
