use async_trait::async_trait;

use benor_common::{Result, VoteMessage};

/// Delivers a vote to every process of the network, the sender included.
///
/// Delivery is fire-and-forget: implementations hand the vote off and return
/// without waiting for acknowledgements, and failed deliveries are not
/// retried. An `Err` only reports that the hand-off itself failed.
#[async_trait]
pub trait VoteBroadcaster: Send + Sync {
    async fn broadcast(&self, vote: VoteMessage) -> Result<()>;
}
