use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use benor_common::{NodeStateView, Result, Value};

use super::builder::ClusterControl;

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    /// Wall-clock budget for every non-faulty process to decide. It bounds
    /// how long the driver waits, never the protocol itself.
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Stop every process once the run is over.
    pub stop_when_done: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(25),
            stop_when_done: true,
        }
    }
}

/// Outcome of one simulated run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub states: Vec<NodeStateView>,
    pub faulty: Vec<bool>,
    pub elapsed: Duration,
}

impl SimulationReport {
    fn honest(&self) -> impl Iterator<Item = &NodeStateView> {
        self.states
            .iter()
            .zip(&self.faulty)
            .filter(|(_, faulty)| !**faulty)
            .map(|(state, _)| state)
    }

    pub fn all_decided(&self) -> bool {
        self.honest().all(|state| state.decided == Some(true))
    }

    /// Values decided by non-faulty processes.
    pub fn decisions(&self) -> Vec<Value> {
        self.honest().filter_map(NodeStateView::decision).collect()
    }

    /// The common decision, when every non-faulty process decided the same value.
    pub fn agreed_value(&self) -> Option<Value> {
        if !self.all_decided() {
            return None;
        }
        let decisions = self.decisions();
        let first = *decisions.first()?;
        decisions.iter().all(|v| *v == first).then_some(first)
    }

    /// Highest round reached by a non-faulty process.
    pub fn max_round(&self) -> Option<u64> {
        self.honest().filter_map(|state| state.k).max()
    }
}

fn honest_decided(states: &[NodeStateView], faulty: &[bool]) -> bool {
    states
        .iter()
        .zip(faulty)
        .all(|(state, faulty)| *faulty || state.decided == Some(true))
}

/// Polls the network until every non-faulty process has decided or the
/// timeout elapses, and returns the last observed states.
pub async fn await_decisions(cluster: &dyn ClusterControl, options: &DriverOptions) -> Result<Vec<NodeStateView>> {
    let faulty: Vec<bool> = cluster.config().nodes.iter().map(|node| node.faulty).collect();
    let deadline = Instant::now() + options.timeout;

    loop {
        let states = cluster.states().await?;
        if honest_decided(&states, &faulty) {
            return Ok(states);
        }
        if Instant::now() >= deadline {
            warn!("⏱️ not every non-faulty node decided within {:?}", options.timeout);
            return Ok(states);
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

/// Starts consensus on every process, waits for the outcome and optionally
/// stops the network.
pub async fn run_simulation(cluster: &dyn ClusterControl, options: DriverOptions) -> Result<SimulationReport> {
    let started = Instant::now();
    cluster.start_consensus().await?;
    info!("🏁 consensus started on {} nodes", cluster.config().n());

    let states = await_decisions(cluster, &options).await?;
    let elapsed = started.elapsed();

    if options.stop_when_done {
        cluster.stop_consensus().await?;
    }

    let report = SimulationReport {
        states,
        faulty: cluster.config().nodes.iter().map(|node| node.faulty).collect(),
        elapsed,
    };

    match report.agreed_value() {
        Some(value) => info!("🎉 all non-faulty nodes decided {} in {:?}", value, elapsed),
        None => warn!("no agreement reached: {:?}", report.decisions()),
    }
    Ok(report)
}
