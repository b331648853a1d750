use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use benor_common::{ProcessId, Result, VoteMessage};

use crate::ports::VoteBroadcaster;

/// Channel-backed network connecting `n` processes inside one runtime.
///
/// Each process gets an inbox; whoever owns the inbox drains it and feeds
/// the votes to the process. Channels are unbounded so a broadcast issued
/// while handling a vote can never wait on a full inbox.
#[derive(Clone)]
pub struct InMemoryNetwork {
    inboxes: Arc<Vec<UnboundedSender<VoteMessage>>>,
}

impl InMemoryNetwork {
    pub fn new(n: usize) -> (Self, Vec<UnboundedReceiver<VoteMessage>>) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..n).map(|_| mpsc::unbounded_channel()).unzip();
        (
            Self {
                inboxes: Arc::new(senders),
            },
            receivers,
        )
    }

    pub fn size(&self) -> usize {
        self.inboxes.len()
    }

    /// Broadcast handle for one member of the network.
    pub fn broadcaster(&self, from: ProcessId) -> InMemoryBroadcaster {
        InMemoryBroadcaster {
            from,
            network: self.clone(),
        }
    }

    pub fn send_to(&self, target: ProcessId, vote: VoteMessage) -> bool {
        match self.inboxes.get(target.0) {
            Some(inbox) => inbox.send(vote).is_ok(),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct InMemoryBroadcaster {
    from: ProcessId,
    network: InMemoryNetwork,
}

#[async_trait]
impl VoteBroadcaster for InMemoryBroadcaster {
    async fn broadcast(&self, vote: VoteMessage) -> Result<()> {
        for target in ProcessId::all(self.network.size()) {
            if !self.network.send_to(target, vote) {
                debug!("[{}] inbox of {} is closed, dropping {}", self.from, target, vote);
            }
        }
        Ok(())
    }
}
