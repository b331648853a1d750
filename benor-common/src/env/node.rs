//! node.rs
//!
//! The externally visible snapshot of one process's consensus state.
//!
//! Field names follow the wire format served by `GET /getState`:
//! `x` is the current value, `k` the current round, `killed` the negated
//! liveness flag and `decided` the decision flag.

use serde::{Deserialize, Serialize};

use super::consensus::types::{Round, Value};

/// Snapshot returned by `inspect`.
///
/// A faulty process reports `x`, `k` and `decided` as absent so that its
/// internal state stays opaque to the rest of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStateView {
    /// Current working estimate.
    pub x: Option<Value>,

    /// Current round (starts at 1).
    pub k: Option<Round>,

    /// True once the process has been stopped.
    pub killed: bool,

    /// True once the process has fixed its output.
    pub decided: Option<bool>,
}

impl NodeStateView {
    /// The view exposed by a simulated Byzantine process.
    pub fn opaque(killed: bool) -> Self {
        Self {
            x: None,
            k: None,
            killed,
            decided: None,
        }
    }

    /// Returns the decided value, if any.
    pub fn decision(&self) -> Option<Value> {
        match self.decided {
            Some(true) => self.x,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_view_serializes_nulls() {
        let json = serde_json::to_string(&NodeStateView::opaque(false)).unwrap();
        assert_eq!(json, r#"{"x":null,"k":null,"killed":false,"decided":null}"#);
    }

    #[test]
    fn test_decision_only_when_decided() {
        let mut view = NodeStateView {
            x: Some(Value::One),
            k: Some(2),
            killed: false,
            decided: Some(false),
        };
        assert_eq!(view.decision(), None);

        view.decided = Some(true);
        assert_eq!(view.decision(), Some(Value::One));
    }
}
