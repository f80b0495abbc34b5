use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::engine::Mode;
use crate::MAX_NODES;

/// Runtime-shell CLI surface: the three positional launcher shapes
/// (forwarder, sender, receiver) that `original_source/src/node.py`'s
/// `Node.__init__` argument-count dispatch accepts. The core never parses
/// this; `NodeConfig::from_cli` is the only place a `Cli` value is consumed.
#[derive(Debug, Parser)]
#[command(name = "dvmesh-node", about = "Run one node of the reverse-path multicast overlay")]
pub struct Cli {
    /// This node's id, in [0, MAX_NODES).
    pub id: u8,

    /// Number of ticks to run before exiting.
    pub duration: u32,

    /// Directory holding the `log/` and `out/` subdirectories for all nodes.
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    #[command(subcommand)]
    pub role: Option<Role>,
}

#[derive(Debug, Subcommand)]
pub enum Role {
    /// Originate multicast data under this node's own root.
    Sender { send_string: String },
    /// Watch a sender's root and record delivered payloads.
    Receiver { observed_sender_id: u8 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("node id {0} is outside [0, {MAX_NODES})")]
    InvalidNodeId(u8),
    #[error("receiver's observed sender id {0} is outside [0, {MAX_NODES})")]
    InvalidSenderId(u8),
}

/// Validated, I/O-free node configuration, built once at process start and
/// threaded through the runtime shell.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub id: u8,
    pub mode: Mode,
    pub duration: u32,
    pub base_dir: PathBuf,
}

impl NodeConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.id as usize >= MAX_NODES {
            return Err(ConfigError::InvalidNodeId(cli.id));
        }
        let mode = match cli.role {
            None => Mode::None,
            Some(Role::Sender { send_string }) => Mode::Sender { send_string },
            Some(Role::Receiver { observed_sender_id }) => {
                if observed_sender_id as usize >= MAX_NODES {
                    return Err(ConfigError::InvalidSenderId(observed_sender_id));
                }
                Mode::Receiver { observed_sender_id }
            }
        };
        Ok(Self { id: cli.id, mode, duration: cli.duration, base_dir: cli.base_dir })
    }

    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join("log").join(format!("node_{}.log", self.id))
    }

    pub fn inbound_path(&self) -> PathBuf {
        self.base_dir.join("out").join(format!("input_{}", self.id))
    }

    pub fn outbound_path(&self) -> PathBuf {
        self.base_dir.join("out").join(format!("output_{}", self.id))
    }

    pub fn received_path(&self, root: u8) -> PathBuf {
        self.base_dir.join("out").join(format!("{}_received_from_{}", self.id, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(id: u8, duration: u32, role: Option<Role>) -> Cli {
        Cli { id, duration, base_dir: PathBuf::from("."), role }
    }

    #[test]
    fn forwarder_config_has_none_mode() {
        let config = NodeConfig::from_cli(cli(3, 60, None)).unwrap();
        assert_eq!(config.mode, Mode::None);
    }

    #[test]
    fn sender_config_carries_string() {
        let config = NodeConfig::from_cli(cli(0, 60, Some(Role::Sender { send_string: "hi".into() }))).unwrap();
        assert_eq!(config.mode, Mode::Sender { send_string: "hi".into() });
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        assert_eq!(NodeConfig::from_cli(cli(200, 60, None)), Err(ConfigError::InvalidNodeId(200)));
    }

    #[test]
    fn zero_duration_is_a_valid_degenerate_run() {
        let config = NodeConfig::from_cli(cli(0, 0, None)).unwrap();
        assert_eq!(config.duration, 0);
    }

    #[test]
    fn out_of_range_observed_sender_is_rejected() {
        let result = NodeConfig::from_cli(cli(0, 60, Some(Role::Receiver { observed_sender_id: 200 })));
        assert_eq!(result.err(), Some(ConfigError::InvalidSenderId(200)));
    }
}
