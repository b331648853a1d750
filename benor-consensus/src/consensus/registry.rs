use std::collections::HashMap;

use benor_common::{Phase, Round, Value, VoteMessage};

/// Votes received for one phase, grouped by round in arrival order.
///
/// Entries only grow: a vote is appended, never removed or overwritten.
#[derive(Debug, Default, Clone)]
pub struct RoundLedger {
    votes: HashMap<Round, Vec<Value>>,
}

impl RoundLedger {
    pub fn new() -> Self {
        Self {
            votes: HashMap::new(),
        }
    }

    /// Appends a vote to the round's entry and returns the whole entry.
    pub fn record(&mut self, round: Round, value: Value) -> &[Value] {
        let entry = self.votes.entry(round).or_default();
        entry.push(value);
        entry
    }

    /// Votes received so far for a round (empty if none).
    pub fn votes(&self, round: Round) -> &[Value] {
        self.votes.get(&round).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn rounds(&self) -> impl Iterator<Item = Round> + '_ {
        self.votes.keys().copied()
    }

    pub fn clear(&mut self) {
        self.votes.clear();
    }
}

/// The two independent ledgers of a process, one per phase.
#[derive(Debug, Default, Clone)]
pub struct VoteRegistry {
    round_votes: RoundLedger,
    post_votes: RoundLedger,
}

impl VoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self, phase: Phase) -> &RoundLedger {
        match phase {
            Phase::Report => &self.round_votes,
            Phase::Propose => &self.post_votes,
        }
    }

    fn ledger_mut(&mut self, phase: Phase) -> &mut RoundLedger {
        match phase {
            Phase::Report => &mut self.round_votes,
            Phase::Propose => &mut self.post_votes,
        }
    }

    /// Stores a vote in its phase ledger and returns the round's entry.
    pub fn register_vote(&mut self, vote: &VoteMessage) -> &[Value] {
        self.ledger_mut(vote.phase).record(vote.round, vote.value)
    }

    pub fn votes(&self, phase: Phase, round: Round) -> &[Value] {
        self.ledger(phase).votes(round)
    }

    pub fn clear(&mut self) {
        self.round_votes.clear();
        self.post_votes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::{One, Undecided, Zero};

    #[test]
    fn test_record_appends_in_order() {
        let mut ledger = RoundLedger::new();
        assert!(ledger.votes(1).is_empty());

        ledger.record(1, One);
        ledger.record(1, Zero);
        let entry = ledger.record(1, Undecided);
        assert_eq!(entry, &[One, Zero, Undecided]);

        // earlier votes are never reordered or dropped
        ledger.record(1, One);
        assert_eq!(&ledger.votes(1)[..3], &[One, Zero, Undecided]);
        assert_eq!(ledger.votes(1).len(), 4);
    }

    #[test]
    fn test_rounds_are_independent() {
        let mut ledger = RoundLedger::new();
        ledger.record(1, One);
        ledger.record(2, Zero);
        ledger.record(2, Zero);

        assert_eq!(ledger.votes(1), &[One]);
        assert_eq!(ledger.votes(2), &[Zero, Zero]);

        let mut rounds: Vec<_> = ledger.rounds().collect();
        rounds.sort();
        assert_eq!(rounds, vec![1, 2]);
    }

    #[test]
    fn test_phases_are_independent() {
        let mut registry = VoteRegistry::new();
        registry.register_vote(&VoteMessage::new(Phase::Report, 1, One));
        registry.register_vote(&VoteMessage::new(Phase::Propose, 1, Undecided));
        registry.register_vote(&VoteMessage::new(Phase::Report, 1, Zero));

        assert_eq!(registry.votes(Phase::Report, 1), &[One, Zero]);
        assert_eq!(registry.votes(Phase::Propose, 1), &[Undecided]);

        registry.clear();
        assert!(registry.votes(Phase::Report, 1).is_empty());
        assert!(registry.votes(Phase::Propose, 1).is_empty());
    }
}
