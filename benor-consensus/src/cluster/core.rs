use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use benor_common::{BenOrError, NodeStateView, ProcessId, Result, Value, VoteMessage};
use benor_p2p::VoteBroadcaster;

use crate::consensus::{ConsensusEngine, QuorumPolicy};

/// One simulated process: its consensus engine plus the faulty/alive gating
/// that sits between the engine and the network.
///
/// Every inbound vote is applied under a single lock, so the ledger append,
/// the threshold check and the state transition form one atomic step.
/// Broadcasting happens after the lock is released.
pub struct Process {
    pub id: ProcessId,
    pub(crate) faulty: bool,
    pub(crate) engine: Mutex<ConsensusEngine>,
    pub(crate) broadcaster: Arc<dyn VoteBroadcaster>,
}

impl Process {
    pub fn new(
        id: ProcessId,
        policy: QuorumPolicy,
        initial_value: Value,
        faulty: bool,
        broadcaster: Arc<dyn VoteBroadcaster>,
    ) -> Self {
        Self::with_engine(ConsensusEngine::new(id, policy, initial_value), faulty, broadcaster)
    }

    pub fn with_engine(engine: ConsensusEngine, faulty: bool, broadcaster: Arc<dyn VoteBroadcaster>) -> Self {
        Self {
            id: engine.id(),
            faulty,
            engine: Mutex::new(engine),
            broadcaster,
        }
    }

    pub fn is_faulty(&self) -> bool {
        self.faulty
    }

    /// Liveness probe. Faulty processes report failure.
    pub fn status(&self) -> Result<()> {
        if self.faulty {
            return Err(BenOrError::FaultyRejection);
        }
        Ok(())
    }

    /// Resets the engine and broadcasts the round-1 vote, followed by any
    /// vote triggered by peers that restarted first.
    ///
    /// Faulty and stopped processes accept the call but do nothing. Returns
    /// whether the protocol was actually (re)started.
    pub async fn start(&self) -> bool {
        if self.faulty {
            return false;
        }

        let outgoing = {
            let mut engine = self.engine.lock().await;
            if !engine.state().alive {
                warn!("[{}] start ignored, process is stopped", self.id);
                return false;
            }
            engine.start()
        };

        for vote in outgoing {
            self.send(vote).await;
        }
        true
    }

    /// State snapshot. A faulty process hides value, round and decision.
    pub async fn inspect(&self) -> NodeStateView {
        let engine = self.engine.lock().await;
        if self.faulty {
            return NodeStateView::opaque(!engine.state().alive);
        }
        engine.state().view()
    }

    pub(crate) async fn send(&self, vote: VoteMessage) {
        info!("📤 [{}] broadcasting {}", self.id, vote);
        if let Err(e) = self.broadcaster.broadcast(vote).await {
            warn!("[{}] failed to broadcast {}: {}", self.id, vote, e);
        }
    }
}
