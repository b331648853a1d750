use tracing::debug;

use benor_common::{BenOrError, Result, VoteMessage};

use crate::cluster::core::Process;

impl Process {
    /// Delivers an inbound vote to the state machine.
    ///
    /// Faulty and stopped processes reject the vote without touching state,
    /// so the sender can tell "ignored" apart from "processed".
    pub async fn handle_vote(&self, vote: VoteMessage) -> Result<()> {
        if self.faulty {
            return Err(BenOrError::FaultyRejection);
        }

        let outgoing = {
            let mut engine = self.engine.lock().await;
            if !engine.state().alive {
                debug!("[{}] stopped, rejecting {}", self.id, vote);
                return Err(BenOrError::StoppedRejection);
            }
            engine.receive_vote(vote)
        };

        if let Some(next) = outgoing {
            self.send(next).await;
        }
        Ok(())
    }
}
