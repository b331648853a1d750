use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, error, info, warn};

use benor_common::{BenOrError, NetworkConfig, NodeStateView, ProcessId, Result};
use benor_consensus::{ConsensusEngine, Process, QuorumPolicy};
use benor_p2p::{HttpBroadcaster, InMemoryNetwork, VoteBroadcaster};

use crate::{
    api::rest::{serve, AppState},
    rpc::NodeClient,
};

const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle operations the driver needs from a running network.
#[async_trait]
pub trait ClusterControl: Send + Sync {
    fn config(&self) -> &NetworkConfig;

    async fn start_consensus(&self) -> Result<()>;

    async fn stop_consensus(&self) -> Result<()>;

    async fn states(&self) -> Result<Vec<NodeStateView>>;

    /// Tears every process down. The cluster is unusable afterwards.
    async fn shutdown(&mut self);
}

fn check_policy(config: &NetworkConfig) {
    let policy = QuorumPolicy::new(config.n(), config.f());
    if !policy.tolerates_faults() {
        warn!("⚠️ N={} F={} does not satisfy N > 3F, agreement is not guaranteed", policy.n, policy.f);
    }
}

fn build_process(
    config: &NetworkConfig,
    id: ProcessId,
    seed: Option<u64>,
    broadcaster: Arc<dyn VoteBroadcaster>,
) -> Result<Arc<Process>> {
    let spec = config
        .spec(id)
        .ok_or_else(|| BenOrError::Config(format!("no spec for {id}")))?;
    let policy = QuorumPolicy::new(config.n(), config.f());
    let engine = match seed {
        Some(seed) => ConsensusEngine::with_seed(id, policy, spec.initial_value, seed.wrapping_add(id.0 as u64)),
        None => ConsensusEngine::new(id, policy, spec.initial_value),
    };
    Ok(Arc::new(Process::with_engine(engine, spec.faulty, broadcaster)))
}

/// N processes, each behind its own HTTP server on `base_port + i`.
pub struct HttpCluster {
    config: NetworkConfig,
    client: NodeClient,
    pub processes: Vec<Arc<Process>>,
    shutdown_senders: Vec<oneshot::Sender<()>>,
    servers: Vec<JoinHandle<()>>,
}

impl HttpCluster {
    pub fn client(&self) -> &NodeClient {
        &self.client
    }
}

/// Binds every listener, spawns one server per process and waits until all
/// of them answer.
pub async fn launch_network(config: &NetworkConfig, seed: Option<u64>) -> Result<HttpCluster> {
    config.validate()?;
    check_policy(config);
    let n = config.n();
    let addressing = config.addressing();
    info!("🚀 launching {} nodes ({} faulty) from port {}", n, config.f(), config.base_port);

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| BenOrError::Network(format!("http client: {e}")))?;

    let mut processes = Vec::with_capacity(n);
    let mut shutdown_senders = Vec::with_capacity(n);
    let mut servers = Vec::with_capacity(n);

    for id in ProcessId::all(n) {
        let broadcaster = Arc::new(HttpBroadcaster::with_client(id, http.clone(), addressing.clone(), n));
        let process = build_process(config, id, seed, broadcaster)?;

        let listener = TcpListener::bind(addressing.socket_addr(id)?).await?;
        let (tx, rx) = oneshot::channel();
        let state = AppState { process: process.clone() };
        servers.push(tokio::spawn(async move {
            if let Err(e) = serve(listener, state, rx).await {
                error!("Node {} server error: {}", id, e);
            }
        }));

        processes.push(process);
        shutdown_senders.push(tx);
    }

    let client = NodeClient::new(addressing, n)?;
    client.wait_until_ready(READY_TIMEOUT).await?;
    info!("✅ all {} nodes are ready", n);

    Ok(HttpCluster {
        config: config.clone(),
        client,
        processes,
        shutdown_senders,
        servers,
    })
}

#[async_trait]
impl ClusterControl for HttpCluster {
    fn config(&self) -> &NetworkConfig {
        &self.config
    }

    async fn start_consensus(&self) -> Result<()> {
        self.client.start_all().await
    }

    async fn stop_consensus(&self) -> Result<()> {
        self.client.stop_all().await
    }

    async fn states(&self) -> Result<Vec<NodeStateView>> {
        self.client.get_states().await
    }

    async fn shutdown(&mut self) {
        for tx in self.shutdown_senders.drain(..) {
            let _ = tx.send(());
        }
        for server in self.servers.drain(..) {
            let _ = server.await;
        }
        debug!("all servers stopped");
    }
}

/// N processes connected by channels inside the current runtime.
///
/// Each process drains its own inbox in a dedicated task, one vote at a time.
pub struct InMemoryCluster {
    config: NetworkConfig,
    pub processes: Vec<Arc<Process>>,
    inbox_tasks: Vec<JoinHandle<()>>,
}

pub fn launch_in_memory(config: &NetworkConfig, seed: Option<u64>) -> Result<InMemoryCluster> {
    config.validate()?;
    check_policy(config);
    let (network, inboxes) = InMemoryNetwork::new(config.n());
    info!("🚀 launching {} in-memory nodes ({} faulty)", config.n(), config.f());

    let mut processes = Vec::with_capacity(config.n());
    let mut inbox_tasks = Vec::with_capacity(config.n());

    for (id, mut inbox) in ProcessId::all(config.n()).zip(inboxes) {
        let process = build_process(config, id, seed, Arc::new(network.broadcaster(id)))?;
        let receiver = process.clone();
        inbox_tasks.push(tokio::spawn(async move {
            while let Some(vote) = inbox.recv().await {
                match receiver.handle_vote(vote).await {
                    Err(e) if e.is_rejection() => debug!("[{}] dropped {}: {}", receiver.id, vote, e),
                    Err(e) => warn!("[{}] failed to handle {}: {}", receiver.id, vote, e),
                    Ok(()) => {}
                }
            }
        }));
        processes.push(process);
    }

    Ok(InMemoryCluster {
        config: config.clone(),
        processes,
        inbox_tasks,
    })
}

#[async_trait]
impl ClusterControl for InMemoryCluster {
    fn config(&self) -> &NetworkConfig {
        &self.config
    }

    async fn start_consensus(&self) -> Result<()> {
        for process in &self.processes {
            process.start().await;
        }
        Ok(())
    }

    async fn stop_consensus(&self) -> Result<()> {
        for process in &self.processes {
            process.stop().await;
        }
        Ok(())
    }

    async fn states(&self) -> Result<Vec<NodeStateView>> {
        let mut states = Vec::with_capacity(self.processes.len());
        for process in &self.processes {
            states.push(process.inspect().await);
        }
        Ok(states)
    }

    async fn shutdown(&mut self) {
        for task in self.inbox_tasks.drain(..) {
            task.abort();
        }
    }
}
