use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    env::consensus::types::Value,
    error::{BenOrError, Result},
    utils::{Addressing, ProcessId, BASE_NODE_PORT},
};

/// Initial conditions of one simulated process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub initial_value: Value,
    #[serde(default)]
    pub faulty: bool,
}

/// Description of a whole simulated network: where the processes listen and
/// how each one starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    pub nodes: Vec<NodeSpec>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_base_port() -> u16 {
    BASE_NODE_PORT
}

impl Default for NetworkConfig {
    /// Ten processes, the first four faulty, every initial value 1.
    fn default() -> Self {
        Self::uniform(10, 4, Value::One)
    }
}

impl NetworkConfig {
    /// `n` processes sharing `initial_value`; the first `faulty` are faulty.
    pub fn uniform(n: usize, faulty: usize, initial_value: Value) -> Self {
        let nodes = (0..n)
            .map(|i| NodeSpec {
                initial_value,
                faulty: i < faulty,
            })
            .collect();
        Self {
            host: default_host(),
            base_port: default_base_port(),
            nodes,
        }
    }

    pub fn from_parts(initial_values: &[Value], faulty: &[bool]) -> Result<Self> {
        if initial_values.len() != faulty.len() {
            return Err(BenOrError::Config(format!(
                "{} initial values but {} faulty flags",
                initial_values.len(),
                faulty.len()
            )));
        }
        let nodes = initial_values
            .iter()
            .zip(faulty)
            .map(|(&initial_value, &faulty)| NodeSpec { initial_value, faulty })
            .collect();
        Ok(Self {
            host: default_host(),
            base_port: default_base_port(),
            nodes,
        })
    }

    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    /// Total number of processes, N.
    pub fn n(&self) -> usize {
        self.nodes.len()
    }

    /// Number of faulty processes, F.
    pub fn f(&self) -> usize {
        self.nodes.iter().filter(|node| node.faulty).count()
    }

    pub fn addressing(&self) -> Addressing {
        Addressing::new(self.host.clone(), self.base_port)
    }

    pub fn spec(&self, id: ProcessId) -> Option<&NodeSpec> {
        self.nodes.get(id.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(BenOrError::Config("network has no processes".to_string()));
        }
        if self.nodes.iter().any(|node| !node.initial_value.is_binary()) {
            return Err(BenOrError::Config("initial values must be 0 or 1".to_string()));
        }
        if self.f() > self.n() / 2 {
            return Err(BenOrError::Config(format!(
                "too many faulty nodes: {} of {}",
                self.f(),
                self.n()
            )));
        }
        let last = ProcessId(self.n() - 1);
        self.addressing().port_for(last)?;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: NetworkConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_network() {
        let config = NetworkConfig::default();
        assert_eq!(config.n(), 10);
        assert_eq!(config.f(), 4);
        assert!(config.nodes[..4].iter().all(|n| n.faulty));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_too_many_faulty_nodes() {
        let config = NetworkConfig::uniform(4, 3, Value::One);
        assert!(matches!(config.validate(), Err(BenOrError::Config(_))));
    }

    #[test]
    fn test_mismatched_lengths() {
        let res = NetworkConfig::from_parts(&[Value::One, Value::Zero], &[false]);
        assert!(res.is_err());
    }

    #[test]
    fn test_undecided_initial_value_is_invalid() {
        let config = NetworkConfig::uniform(3, 0, Value::Undecided);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");

        let config = NetworkConfig::from_parts(
            &[Value::One, Value::Zero, Value::One, Value::One],
            &[false, false, true, false],
        )
        .unwrap()
        .with_base_port(4200);
        config.save_to_file(&path).unwrap();

        let loaded = NetworkConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.f(), 1);
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let json = r#"{"nodes":[{"initial_value":0},{"initial_value":1,"faulty":true},{"initial_value":1}]}"#;
        let config: NetworkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_port, BASE_NODE_PORT);
        assert_eq!(config.f(), 1);
    }
}
