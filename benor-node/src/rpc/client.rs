use std::time::{Duration, Instant};

use futures::future::join_all;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use benor_common::{Addressing, BenOrError, NodeStateView, ProcessId, Result, VoteMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(20);

/// HTTP client used by the driver to control every process of a network.
#[derive(Clone)]
pub struct NodeClient {
    client: Client,
    addressing: Addressing,
    n: usize,
}

impl NodeClient {
    pub fn new(addressing: Addressing, n: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BenOrError::Network(format!("http client: {e}")))?;
        Ok(Self { client, addressing, n })
    }

    async fn get(&self, id: ProcessId, path: &str) -> Result<reqwest::Response> {
        self.client
            .get(self.addressing.endpoint(id, path)?)
            .send()
            .await
            .map_err(|e| BenOrError::Network(format!("GET {path} on {id}: {e}")))
    }

    /// A process is up once it answers `/status` at all; faulty processes
    /// answer with an error status, which still counts.
    pub async fn is_reachable(&self, id: ProcessId) -> bool {
        self.get(id, "/status").await.is_ok()
    }

    pub async fn is_live(&self, id: ProcessId) -> Result<bool> {
        Ok(self.get(id, "/status").await?.status().is_success())
    }

    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let reachable = join_all(ProcessId::all(self.n).map(|id| self.is_reachable(id))).await;
            let pending = reachable.iter().filter(|ok| !**ok).count();
            if pending == 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BenOrError::Network(format!("{} of {} nodes not ready", pending, self.n)));
            }
            debug!("waiting for {} nodes to come up", pending);
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Triggers `/start` on every process concurrently.
    pub async fn start_all(&self) -> Result<()> {
        self.call_all("/start").await
    }

    pub async fn stop_all(&self) -> Result<()> {
        self.call_all("/stop").await
    }

    async fn call_all(&self, path: &str) -> Result<()> {
        let results = join_all(ProcessId::all(self.n).map(|id| self.get(id, path))).await;
        let failures: Vec<_> = results.into_iter().filter_map(|res| res.err()).collect();
        for e in &failures {
            warn!("{}", e);
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BenOrError::Network(format!("{} of {} calls to {} failed", failures.len(), self.n, path)))
        }
    }

    pub async fn get_state(&self, id: ProcessId) -> Result<NodeStateView> {
        self.get(id, "/getState")
            .await?
            .json::<NodeStateView>()
            .await
            .map_err(|e| BenOrError::Network(format!("state of {id}: {e}")))
    }

    pub async fn get_states(&self) -> Result<Vec<NodeStateView>> {
        join_all(ProcessId::all(self.n).map(|id| self.get_state(id)))
            .await
            .into_iter()
            .collect()
    }

    /// Posts a single vote to one process and returns the HTTP status.
    pub async fn deliver(&self, id: ProcessId, vote: &VoteMessage) -> Result<StatusCode> {
        let res = self
            .client
            .post(self.addressing.endpoint(id, "/message")?)
            .json(vote)
            .send()
            .await
            .map_err(|e| BenOrError::Network(format!("POST /message on {id}: {e}")))?;
        Ok(res.status())
    }
}
