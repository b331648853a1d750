use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use benor_common::{Addressing, BenOrError, ProcessId, Result, VoteMessage};

use crate::ports::VoteBroadcaster;

const MESSAGE_PATH: &str = "/message";
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcasts votes as `POST /message` to every process of the network.
#[derive(Clone)]
pub struct HttpBroadcaster {
    from: ProcessId,
    client: Client,
    addressing: Addressing,
    n: usize,
}

impl HttpBroadcaster {
    pub fn new(from: ProcessId, addressing: Addressing, n: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| BenOrError::Network(format!("http client: {e}")))?;
        Ok(Self::with_client(from, client, addressing, n))
    }

    /// Shares one connection pool between several broadcasters.
    pub fn with_client(from: ProcessId, client: Client, addressing: Addressing, n: usize) -> Self {
        Self { from, client, addressing, n }
    }
}

#[async_trait]
impl VoteBroadcaster for HttpBroadcaster {
    async fn broadcast(&self, vote: VoteMessage) -> Result<()> {
        for target in ProcessId::all(self.n) {
            let client = self.client.clone();
            let url = self.addressing.endpoint(target, MESSAGE_PATH)?;
            let from = self.from;

            tokio::spawn(async move {
                match client.post(&url).json(&vote).send().await {
                    Ok(res) if !res.status().is_success() => {
                        debug!("[{}] {} rejected {}: {}", from, target, vote, res.status());
                    }
                    Ok(_) => {}
                    Err(e) => debug!("[{}] delivery of {} to {} failed: {}", from, vote, target, e),
                }
            });
        }
        Ok(())
    }
}
