use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};

use liars_p2p::{DiscoveryConfig, P2pConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub storage_dir: PathBuf,
    pub roster_path: PathBuf,
    pub log_dir: PathBuf,
    /// DHT provider key and gossip topic shared by every agent.
    pub rendezvous: String,
    pub listen_host: String,
    pub base_port: u16,
    pub gossip_interval_ms: u64,
    pub recheck_interval_ms: u64,
    pub round_timeout_secs: u64,
    pub gossip_buffer: usize,
    pub discovery: DiscoveryConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("storage"),
            roster_path: PathBuf::from("agents.json"),
            log_dir: PathBuf::from("logs"),
            rendezvous: "liarslie".to_string(),
            listen_host: "127.0.0.1".to_string(),
            base_port: 41000,
            gossip_interval_ms: 1000,
            recheck_interval_ms: 200,
            round_timeout_secs: 120,
            gossip_buffer: 1024,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)
    }

    /// Reads the config at `path`. A missing file yields the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn gossip_interval(&self) -> Duration {
        Duration::from_millis(self.gossip_interval_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }

    /// Endpoint settings for an agent listening on `listen` that bootstraps
    /// from `bootstrap`.
    pub fn p2p_config(&self, listen: &str, bootstrap: Vec<String>) -> P2pConfig {
        let mut cfg = P2pConfig::new(listen, self.rendezvous.clone()).with_bootstrap(bootstrap);
        cfg.gossip_buffer = self.gossip_buffer;
        cfg
    }
}
