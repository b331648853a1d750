use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rand::Rng;

use benor_common::{NetworkConfig, Result, Value, BASE_NODE_PORT};

#[derive(Debug, Parser)]
#[command(name = "benor-node", about = "Simulates a network running Ben-Or binary consensus")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch a network, run consensus to completion and print every node's state.
    Run(RunArgs),
    /// Write a network description to a JSON file.
    GenerateConfig(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct NetworkArgs {
    /// Number of processes (N).
    #[arg(long, default_value_t = 10)]
    pub nodes: usize,

    /// Number of faulty processes (F); the first F indices are faulty.
    #[arg(long, default_value_t = 4)]
    pub faulty: usize,

    /// Initial value shared by every process (0 or 1).
    #[arg(long, default_value = "1")]
    pub value: Value,

    /// Draw every initial value at random instead.
    #[arg(long)]
    pub random_values: bool,

    #[arg(long, default_value_t = BASE_NODE_PORT)]
    pub base_port: u16,
}

impl NetworkArgs {
    pub fn to_config(&self) -> Result<NetworkConfig> {
        let mut config = NetworkConfig::uniform(self.nodes, self.faulty, self.value).with_base_port(self.base_port);
        if self.random_values {
            let mut rng = rand::thread_rng();
            for node in config.nodes.iter_mut() {
                node.initial_value = Value::from_bit(rng.gen_bool(0.5));
            }
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Network description; overrides the network flags.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Connect processes with in-process channels instead of HTTP.
    #[arg(long)]
    pub in_memory: bool,

    /// Seed for the processes' coin flips.
    #[arg(long)]
    pub seed: Option<u64>,

    /// How long the driver waits for every non-faulty process to decide.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Also write the final report as JSON.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    pub fn network_config(&self) -> Result<NetworkConfig> {
        match &self.config {
            Some(path) => NetworkConfig::load_from_file(path),
            None => self.network.to_config(),
        }
    }
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(long, default_value = "network.json")]
    pub out: PathBuf,

    #[command(flatten)]
    pub network: NetworkArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["benor-node", "run"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.network_config().unwrap();
        assert_eq!(config.n(), 10);
        assert_eq!(config.f(), 4);
        assert!(!args.in_memory);
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from([
            "benor-node", "run", "--nodes", "4", "--faulty", "1", "--value", "0", "--in-memory", "--seed", "9",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.network_config().unwrap();
        assert_eq!(config.n(), 4);
        assert!(config.nodes.iter().all(|node| node.initial_value == Value::Zero));
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_run_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        NetworkConfig::uniform(5, 2, Value::Zero).save_to_file(&path).unwrap();

        let cli = Cli::parse_from(["benor-node", "run", "--nodes", "3", "--config", path.to_str().unwrap()]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let config = args.network_config().unwrap();
        assert_eq!(config.n(), 5);
        assert_eq!(config.f(), 2);
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        assert!(Cli::try_parse_from(["benor-node", "run", "--value", "7"]).is_err());
    }
}
