use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use super::ProcessId;
use crate::error::{BenOrError, Result};

/// Port of process 0; process `i` listens on `BASE_NODE_PORT + i`.
pub const BASE_NODE_PORT: u16 = 3000;

/// Deterministic mapping from process index to network location.
///
/// Every process and the driver compute the same mapping, so there is no
/// discovery step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addressing {
    pub host: String,
    pub base_port: u16,
}

impl Default for Addressing {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: BASE_NODE_PORT,
        }
    }
}

impl Addressing {
    pub fn new(host: impl Into<String>, base_port: u16) -> Self {
        Self {
            host: host.into(),
            base_port,
        }
    }

    pub fn port_for(&self, id: ProcessId) -> Result<u16> {
        u16::try_from(id.0)
            .ok()
            .and_then(|offset| self.base_port.checked_add(offset))
            .ok_or_else(|| BenOrError::Config(format!("no port available for {}", id)))
    }

    pub fn socket_addr(&self, id: ProcessId) -> Result<SocketAddr> {
        let port = self.port_for(id)?;
        format!("{}:{}", self.host, port)
            .parse()
            .map_err(|e| BenOrError::Config(format!("invalid address for {}: {}", id, e)))
    }

    /// Base URL of a process, without trailing slash.
    pub fn url_for(&self, id: ProcessId) -> Result<String> {
        Ok(format!("http://{}:{}", self.host, self.port_for(id)?))
    }

    pub fn endpoint(&self, id: ProcessId, path: &str) -> Result<String> {
        Ok(format!("{}/{}", self.url_for(id)?, path.trim_start_matches('/')))
    }
}
