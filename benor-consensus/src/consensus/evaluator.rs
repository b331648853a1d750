use benor_common::Value;
use serde::{Deserialize, Serialize};

/// Numeric parameters of the protocol: `n` processes, at most `f` faulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    pub n: usize,
    pub f: usize,
}

impl QuorumPolicy {
    pub fn new(n: usize, f: usize) -> Self {
        Self { n, f }
    }

    /// Votes required before a round's ledger is acted on: `N - F`.
    pub fn quorum(&self) -> usize {
        self.n.saturating_sub(self.f)
    }

    /// Occurrences of a single value required to decide: `F + 1`.
    pub fn decide_threshold(&self) -> usize {
        self.f + 1
    }

    /// `count > N / 2`, evaluated without rounding.
    pub fn is_majority(&self, count: usize) -> bool {
        2 * count > self.n
    }

    /// Whether the deployment respects `N > 3F`.
    pub fn tolerates_faults(&self) -> bool {
        self.n > 3 * self.f
    }
}

/// Occurrences of 0 and 1 in a round's votes. Undecided votes count toward neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueCounts {
    pub zeros: usize,
    pub ones: usize,
}

impl ValueCounts {
    pub fn total(&self) -> usize {
        self.zeros + self.ones
    }
}

pub fn count_values(votes: &[Value]) -> ValueCounts {
    votes.iter().fold(ValueCounts::default(), |mut counts, vote| {
        match vote {
            Value::Zero => counts.zeros += 1,
            Value::One => counts.ones += 1,
            Value::Undecided => {}
        }
        counts
    })
}

/// What a phase-P quorum tells the process to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVoteOutcome {
    /// At least `F + 1` votes carried this value.
    Decide(Value),
    /// No decision; carry the more frequent value into the next round.
    Adopt(Value),
    /// Every vote was undecided; the next value is a fair coin flip.
    Coin,
}

/// Applies the protocol thresholds to a round's votes. Stateless.
#[derive(Debug, Clone)]
pub struct ConsensusEvaluator {
    pub policy: QuorumPolicy,
}

impl ConsensusEvaluator {
    pub fn new(policy: QuorumPolicy) -> Self {
        Self { policy }
    }

    pub fn has_quorum(&self, votes: &[Value]) -> bool {
        votes.len() >= self.policy.quorum()
    }

    /// Value carried by this process's phase-P vote: the strict majority of
    /// phase-R votes, or undecided.
    pub fn round_vote_outcome(&self, votes: &[Value]) -> Value {
        let counts = count_values(votes);
        if self.policy.is_majority(counts.zeros) {
            Value::Zero
        } else if self.policy.is_majority(counts.ones) {
            Value::One
        } else {
            Value::Undecided
        }
    }

    pub fn post_vote_outcome(&self, votes: &[Value]) -> PostVoteOutcome {
        let counts = count_values(votes);
        let threshold = self.policy.decide_threshold();

        if counts.zeros >= threshold {
            PostVoteOutcome::Decide(Value::Zero)
        } else if counts.ones >= threshold {
            PostVoteOutcome::Decide(Value::One)
        } else if counts.total() == 0 {
            PostVoteOutcome::Coin
        } else if counts.ones >= counts.zeros {
            // ties go to 1
            PostVoteOutcome::Adopt(Value::One)
        } else {
            PostVoteOutcome::Adopt(Value::Zero)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::{One, Undecided, Zero};

    #[test]
    fn test_count_values() {
        assert_eq!(count_values(&[]), ValueCounts::default());

        let counts = count_values(&[Zero, One, Undecided, One, Undecided]);
        assert_eq!(counts, ValueCounts { zeros: 1, ones: 2 });
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_counts_never_exceed_input_length() {
        let votes = [Undecided, Zero, Zero, One, Undecided, One, One];
        for len in 0..=votes.len() {
            let counts = count_values(&votes[..len]);
            assert!(counts.total() <= len);
        }
    }

    #[test]
    fn test_majorities_are_exclusive() {
        for n in 1..12 {
            let policy = QuorumPolicy::new(n, 0);
            for zeros in 0..=n {
                let ones = n - zeros;
                assert!(!(policy.is_majority(zeros) && policy.is_majority(ones)));
            }
        }
    }

    #[test]
    fn test_quorum_and_thresholds() {
        let policy = QuorumPolicy::new(10, 4);
        assert_eq!(policy.quorum(), 6);
        assert_eq!(policy.decide_threshold(), 5);
        assert!(!policy.is_majority(5));
        assert!(policy.is_majority(6));
        assert!(!policy.tolerates_faults());
        assert!(QuorumPolicy::new(4, 1).tolerates_faults());
    }

    #[test]
    fn test_round_vote_outcome() {
        let evaluator = ConsensusEvaluator::new(QuorumPolicy::new(4, 0));
        assert_eq!(evaluator.round_vote_outcome(&[One, One, One, One]), One);
        assert_eq!(evaluator.round_vote_outcome(&[Zero, Zero, Zero, One]), Zero);
        // 2 of 4 is not a strict majority
        assert_eq!(evaluator.round_vote_outcome(&[Zero, Zero, One, One]), Undecided);
    }

    #[test]
    fn test_post_vote_decides() {
        let evaluator = ConsensusEvaluator::new(QuorumPolicy::new(10, 4));
        let votes = [One; 6];
        assert_eq!(evaluator.post_vote_outcome(&votes), PostVoteOutcome::Decide(One));

        let votes = [Zero, Zero, Zero, Zero, Zero, Undecided];
        assert_eq!(evaluator.post_vote_outcome(&votes), PostVoteOutcome::Decide(Zero));
    }

    #[test]
    fn test_post_vote_adopts_with_tie_to_one() {
        let evaluator = ConsensusEvaluator::new(QuorumPolicy::new(7, 2));
        let votes = [Zero, One, Undecided, Undecided, Undecided];
        assert_eq!(evaluator.post_vote_outcome(&votes), PostVoteOutcome::Adopt(One));

        let votes = [Zero, Zero, One, Undecided, Undecided];
        assert_eq!(evaluator.post_vote_outcome(&votes), PostVoteOutcome::Adopt(Zero));
    }

    #[test]
    fn test_post_vote_all_undecided_flips_coin() {
        let evaluator = ConsensusEvaluator::new(QuorumPolicy::new(4, 1));
        let votes = [Undecided, Undecided, Undecided];
        assert_eq!(evaluator.post_vote_outcome(&votes), PostVoteOutcome::Coin);
    }
}
