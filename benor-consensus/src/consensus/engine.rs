use std::collections::HashSet;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use benor_common::{NodeStateView, Phase, ProcessId, Round, RunId, Value, VoteMessage};

use super::{
    evaluator::{ConsensusEvaluator, PostVoteOutcome, QuorumPolicy},
    registry::VoteRegistry,
};

/// Mutable state of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessState {
    pub current_value: Value,
    pub current_round: Round,
    pub decided: bool,
    pub alive: bool,
}

impl ProcessState {
    fn initial(initial_value: Value) -> Self {
        Self {
            current_value: initial_value,
            current_round: 1,
            decided: false,
            alive: true,
        }
    }

    pub fn view(&self) -> NodeStateView {
        NodeStateView {
            x: Some(self.current_value),
            k: Some(self.current_round),
            killed: !self.alive,
            decided: Some(self.decided),
        }
    }
}

/// Ben-Or state machine of a single process.
///
/// The engine performs no I/O: every transition returns the vote, if any,
/// that must be broadcast to all `N` processes.
#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    id: ProcessId,
    initial_value: Value,
    state: ProcessState,
    registry: VoteRegistry,
    evaluator: ConsensusEvaluator,
    /// (phase, round) quorums already acted on.
    acted: HashSet<(Phase, Round)>,
    decided_round: Option<Round>,
    started: bool,
    run: RunId,
    /// Votes of a later run, held until this process restarts too.
    pending: Vec<VoteMessage>,
    rng: StdRng,
}

impl ConsensusEngine {
    pub fn new(id: ProcessId, policy: QuorumPolicy, initial_value: Value) -> Self {
        Self::with_rng(id, policy, initial_value, StdRng::from_entropy())
    }

    /// Engine whose coin flips are reproducible.
    pub fn with_seed(id: ProcessId, policy: QuorumPolicy, initial_value: Value, seed: u64) -> Self {
        Self::with_rng(id, policy, initial_value, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: ProcessId, policy: QuorumPolicy, initial_value: Value, rng: StdRng) -> Self {
        Self {
            id,
            initial_value,
            state: ProcessState::initial(initial_value),
            registry: VoteRegistry::new(),
            evaluator: ConsensusEvaluator::new(policy),
            acted: HashSet::new(),
            decided_round: None,
            started: false,
            run: 0,
            pending: Vec::new(),
            rng,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn policy(&self) -> QuorumPolicy {
        self.evaluator.policy
    }

    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    pub fn registry(&self) -> &VoteRegistry {
        &self.registry
    }

    /// Marks the process as stopped. Permanent for this instance.
    pub fn kill(&mut self) {
        self.state.alive = false;
    }

    /// Current run, bumped by every restart.
    pub fn run(&self) -> RunId {
        self.run
    }

    /// Resets value, round and decision and returns the votes to broadcast,
    /// starting with the round-1 vote carrying the initial value.
    ///
    /// Votes that arrive before the first start belong to the same run and
    /// are kept. A restart opens a new run: every vote of the previous run is
    /// forgotten and votes peers already sent for the new run are replayed.
    pub fn start(&mut self) -> Vec<VoteMessage> {
        if self.started {
            self.run += 1;
            self.registry.clear();
            self.acted.clear();
        }
        self.started = true;

        self.state.current_value = self.initial_value;
        self.state.current_round = 1;
        self.state.decided = false;
        self.decided_round = None;

        info!("▶️ [{}] starting run {} with x={}", self.id, self.run, self.initial_value);
        let mut outgoing = vec![self.stamp(Phase::Report, 1, self.initial_value)];

        let run = self.run;
        let (ready, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|vote| vote.run >= run)
            .partition(|vote| vote.run == run);
        self.pending = later;
        for vote in ready {
            outgoing.extend(self.apply(vote));
        }
        outgoing
    }

    /// Applies an inbound vote and returns the vote to broadcast, if any.
    ///
    /// Votes of an earlier run are dropped; votes of a later run are held
    /// until the next restart.
    pub fn receive_vote(&mut self, vote: VoteMessage) -> Option<VoteMessage> {
        if vote.run < self.run {
            debug!("[{}] dropping {} from a previous run", self.id, vote);
            return None;
        }
        if vote.run > self.run {
            debug!("[{}] holding {} until restart", self.id, vote);
            self.pending.push(vote);
            return None;
        }
        self.apply(vote)
    }

    fn apply(&mut self, vote: VoteMessage) -> Option<VoteMessage> {
        tracing::debug!(target: "consensus", "EVENT:VOTE node={} run={} phase={} k={} x={}", self.id, vote.run, vote.phase, vote.round, vote.value);

        match vote.phase {
            Phase::Report => self.on_round_vote(vote),
            Phase::Propose => self.on_post_vote(vote),
        }
    }

    fn stamp(&self, phase: Phase, round: Round, value: Value) -> VoteMessage {
        VoteMessage::new(phase, round, value).with_run(self.run)
    }

    /// Phase R: once `N - F` votes are in, report the strict majority (or
    /// undecided) as a phase-P vote for the same round.
    fn on_round_vote(&mut self, vote: VoteMessage) -> Option<VoteMessage> {
        let votes = self.registry.register_vote(&vote);
        if !self.evaluator.has_quorum(votes) {
            return None;
        }
        let outgoing = self.evaluator.round_vote_outcome(votes);
        let received = votes.len();

        if !self.acted.insert((Phase::Report, vote.round)) {
            debug!("[{}] late R vote for k={} ({} received), already reported", self.id, vote.round, received);
            return None;
        }

        tracing::info!(target: "consensus", "EVENT:QUORUM node={} phase=R k={} votes={} out={}", self.id, vote.round, received, outgoing);
        Some(self.stamp(Phase::Propose, vote.round, outgoing))
    }

    /// Phase P: once `N - F` votes are in, decide if some value reached
    /// `F + 1`, otherwise move to the next round.
    fn on_post_vote(&mut self, vote: VoteMessage) -> Option<VoteMessage> {
        let round = vote.round;
        let Some(next_round) = round.checked_add(1) else {
            warn!("[{}] ignoring {}, round has no successor", self.id, vote);
            return None;
        };
        let votes = self.registry.register_vote(&vote);
        if !self.evaluator.has_quorum(votes) {
            return None;
        }
        let outcome = self.evaluator.post_vote_outcome(votes);

        if !self.acted.insert((Phase::Propose, round)) {
            return None;
        }
        if self.state.decided {
            debug!("[{}] already decided, ignoring P quorum for k={}", self.id, round);
            return None;
        }

        let next_value = match outcome {
            PostVoteOutcome::Decide(value) => {
                self.state.current_value = value;
                self.state.decided = true;
                self.decided_round = Some(round);

                info!("✅ [{}] decided x={} in round {}", self.id, value, round);
                tracing::info!(target: "consensus", "EVENT:DECIDE node={} k={} x={}", self.id, round, value);

                // Peers that advanced from this round still need our vote to
                // reach quorum in the next one.
                return Some(self.stamp(Phase::Report, next_round, value));
            }
            PostVoteOutcome::Adopt(value) => value,
            PostVoteOutcome::Coin => Value::from_bit(self.rng.gen_bool(0.5)),
        };

        self.state.current_value = next_value;
        self.state.current_round = self.state.current_round.max(next_round);

        info!("🔁 [{}] no decision in round {}, advancing with x={}", self.id, round, next_value);
        tracing::info!(target: "consensus", "EVENT:ADVANCE node={} k={} x={} coin={}", self.id, next_round, next_value, outcome == PostVoteOutcome::Coin);

        Some(self.stamp(Phase::Report, next_round, next_value))
    }

    /// Round in which this process decided, if it has.
    pub fn decided_round(&self) -> Option<Round> {
        self.decided_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Value::{One, Undecided, Zero};

    fn engine(n: usize, f: usize, initial: Value) -> ConsensusEngine {
        ConsensusEngine::with_seed(ProcessId(0), QuorumPolicy::new(n, f), initial, 7)
    }

    fn feed(engine: &mut ConsensusEngine, phase: Phase, round: Round, values: &[Value]) -> Vec<VoteMessage> {
        feed_run(engine, 0, phase, round, values)
    }

    fn feed_run(engine: &mut ConsensusEngine, run: RunId, phase: Phase, round: Round, values: &[Value]) -> Vec<VoteMessage> {
        values
            .iter()
            .filter_map(|&v| engine.receive_vote(VoteMessage::new(phase, round, v).with_run(run)))
            .collect()
    }

    #[test]
    fn test_start_emits_first_round_vote() {
        let mut e = engine(4, 0, Zero);
        assert_eq!(e.start(), vec![VoteMessage::new(Phase::Report, 1, Zero)]);
        assert_eq!(e.state().current_round, 1);
        assert!(!e.state().decided);
    }

    #[test]
    fn test_round_vote_waits_for_quorum() {
        let mut e = engine(4, 1, One);
        assert!(feed(&mut e, Phase::Report, 1, &[One, One]).is_empty());

        let out = feed(&mut e, Phase::Report, 1, &[One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 1, One)]);
    }

    #[test]
    fn test_round_vote_broadcasts_once_per_round() {
        let mut e = engine(4, 1, One);
        let out = feed(&mut e, Phase::Report, 1, &[Zero, Zero, Zero, One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 1, Zero)]);
        // the late vote is still recorded
        assert_eq!(e.registry().votes(Phase::Report, 1).len(), 4);
    }

    #[test]
    fn test_round_vote_without_majority_is_undecided() {
        let mut e = engine(4, 0, One);
        let out = feed(&mut e, Phase::Report, 1, &[Zero, Zero, One, One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 1, Undecided)]);
    }

    #[test]
    fn test_post_vote_decides() {
        let mut e = engine(4, 0, One);
        e.start();
        let out = feed(&mut e, Phase::Propose, 1, &[One, One, One, One]);

        assert!(e.state().decided);
        assert_eq!(e.state().current_value, One);
        assert_eq!(e.state().current_round, 1);
        assert_eq!(e.decided_round(), Some(1));
        assert_eq!(out, vec![VoteMessage::new(Phase::Report, 2, One)]);
    }

    #[test]
    fn test_decided_value_is_final() {
        let mut e = engine(4, 1, Zero);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[Zero, Zero, Undecided]);
        assert!(e.state().decided);

        // a later round pointing the other way changes nothing
        let out = feed(&mut e, Phase::Propose, 2, &[One, One, One]);
        assert!(out.is_empty());
        assert_eq!(e.state().current_value, Zero);
        assert!(e.state().decided);
    }

    #[test]
    fn test_decided_process_still_answers_helper_round() {
        let mut e = engine(4, 1, One);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[One, One, One]);
        let out = feed(&mut e, Phase::Report, 2, &[One, One, One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 2, One)]);
    }

    #[test]
    fn test_post_vote_advances_with_majority_value() {
        // n=7, f=2: quorum 5, decide threshold 3
        let mut e = engine(7, 2, One);
        e.start();
        let out = feed(&mut e, Phase::Propose, 1, &[Zero, Zero, Undecided, Undecided, Undecided]);

        assert!(!e.state().decided);
        assert_eq!(e.state().current_round, 2);
        assert_eq!(e.state().current_value, Zero);
        assert_eq!(out, vec![VoteMessage::new(Phase::Report, 2, Zero)]);
    }

    #[test]
    fn test_post_vote_tie_prefers_one() {
        let mut e = engine(7, 2, Zero);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[Zero, One, Undecided, Undecided, Undecided]);
        assert_eq!(e.state().current_value, One);
    }

    #[test]
    fn test_all_undecided_flips_a_coin() {
        let mut e = engine(4, 1, Zero);
        e.start();
        let out = feed(&mut e, Phase::Propose, 1, &[Undecided, Undecided, Undecided]);

        assert_eq!(out.len(), 1);
        assert!(out[0].value.is_binary());
        assert_eq!(out[0].value, e.state().current_value);
        assert_eq!(e.state().current_round, 2);
    }

    #[test]
    fn test_coin_is_reproducible_with_seed() {
        let flips = |seed| {
            let mut e = ConsensusEngine::with_seed(ProcessId(1), QuorumPolicy::new(4, 1), Zero, seed);
            (1..=8)
                .map(|round| {
                    feed(&mut e, Phase::Propose, round, &[Undecided, Undecided, Undecided]);
                    e.state().current_value
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(flips(42), flips(42));
    }

    #[test]
    fn test_round_never_decreases() {
        let mut e = engine(4, 1, One);
        e.start();
        feed(&mut e, Phase::Propose, 3, &[Undecided, Zero, One]);
        assert_eq!(e.state().current_round, 4);

        feed(&mut e, Phase::Propose, 1, &[Undecided, Zero, One]);
        assert_eq!(e.state().current_round, 4);
    }

    #[test]
    fn test_restart_resets_state_and_ledgers() {
        let mut e = engine(4, 0, Zero);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[One, One, One, One]);
        assert!(e.state().decided);

        let first = e.start();
        assert_eq!(first, vec![VoteMessage::new(Phase::Report, 1, Zero).with_run(1)]);
        assert_eq!(e.run(), 1);
        assert_eq!(e.state().current_value, Zero);
        assert!(!e.state().decided);
        assert!(e.registry().votes(Phase::Propose, 1).is_empty());

        // round 1 can be acted on again after a restart
        let out = feed_run(&mut e, 1, Phase::Propose, 1, &[Zero, Zero, Zero, Zero]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Report, 2, Zero).with_run(1)]);
        assert_eq!(e.state().current_value, Zero);
    }

    #[test]
    fn test_votes_of_previous_run_are_dropped() {
        let mut e = engine(4, 1, One);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[One, One, One]);
        e.start();

        // leftover helper-round traffic from run 0
        let out = feed(&mut e, Phase::Report, 2, &[One, One, One]);
        assert!(out.is_empty());
        assert!(e.registry().votes(Phase::Report, 2).is_empty());

        let out = feed(&mut e, Phase::Report, 1, &[Zero, Zero, Zero]);
        assert!(out.is_empty());
        assert!(e.registry().votes(Phase::Report, 1).is_empty());
    }

    #[test]
    fn test_votes_of_next_run_wait_for_restart() {
        let mut e = engine(4, 1, One);
        e.start();
        feed(&mut e, Phase::Propose, 1, &[One, One, One]);
        assert!(e.state().decided);

        // peers restarted before this process did
        let early = feed_run(&mut e, 1, Phase::Report, 1, &[Zero, Zero]);
        assert!(early.is_empty());
        assert!(e.state().decided);
        assert!(e.registry().votes(Phase::Report, 1).is_empty());

        let out = e.start();
        assert_eq!(out, vec![VoteMessage::new(Phase::Report, 1, One).with_run(1)]);
        assert_eq!(e.registry().votes(Phase::Report, 1), &[Zero, Zero]);

        // the held votes count toward the new run's quorum
        let out = feed_run(&mut e, 1, Phase::Report, 1, &[One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 1, Undecided).with_run(1)]);
    }

    #[test]
    fn test_replayed_votes_can_complete_a_quorum() {
        let mut e = engine(4, 1, One);
        e.start();
        feed_run(&mut e, 1, Phase::Report, 1, &[Zero, Zero, Zero]);

        let out = e.start();
        assert_eq!(
            out,
            vec![
                VoteMessage::new(Phase::Report, 1, One).with_run(1),
                VoteMessage::new(Phase::Propose, 1, Zero).with_run(1),
            ]
        );
    }

    #[test]
    fn test_last_round_is_ignored_without_state_change() {
        let mut e = engine(1, 0, Zero);
        e.start();
        let before = *e.state();

        let out = feed(&mut e, Phase::Propose, Round::MAX, &[Undecided]);
        assert!(out.is_empty());
        let out = feed(&mut e, Phase::Propose, Round::MAX, &[One]);
        assert!(out.is_empty());

        assert_eq!(*e.state(), before);
        assert_eq!(e.decided_round(), None);
        assert!(e.registry().votes(Phase::Propose, Round::MAX).is_empty());
    }

    #[test]
    fn test_first_start_keeps_early_votes() {
        let mut e = engine(4, 1, One);
        // peers started first
        assert!(feed(&mut e, Phase::Report, 1, &[One, One]).is_empty());
        e.start();
        assert_eq!(e.registry().votes(Phase::Report, 1).len(), 2);

        let out = feed(&mut e, Phase::Report, 1, &[One]);
        assert_eq!(out, vec![VoteMessage::new(Phase::Propose, 1, One)]);
    }

    #[test]
    fn test_view_reflects_state() {
        let mut e = engine(4, 0, One);
        e.kill();
        let view = e.state().view();
        assert_eq!(view.x, Some(One));
        assert_eq!(view.k, Some(1));
        assert!(view.killed);
        assert_eq!(view.decided, Some(false));
    }
}
