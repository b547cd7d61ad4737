use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::memo::MemoFormat;
use crate::network::Cluster;
use crate::retrieve::RetrieveOptions;
use crate::store::StoreOptions;

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: Cluster,
    /// Overrides the cluster's default endpoint.
    pub rpc_url: Option<String>,
    pub keypair_path: PathBuf,
    /// Base58 secret key; takes precedence over `keypair_path`.
    pub secret_key: Option<String>,
    pub page_size: usize,
    pub max_depth: usize,
    pub confirm_timeout: Duration,
    pub confirm_poll_interval: Duration,
    pub memo_format: MemoFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: Cluster::Devnet,
            rpc_url: None,
            keypair_path: default_keypair_path(),
            secret_key: None,
            page_size: 20,
            max_depth: 20,
            confirm_timeout: Duration::from_secs(60),
            confirm_poll_interval: Duration::from_millis(500),
            memo_format: MemoFormat::Framed,
        }
    }
}

fn default_keypair_path() -> PathBuf {
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config/solana/id.json")
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(network) = lookup("SOLANA_NETWORK") {
            config.cluster = network.parse()?;
        }
        if let Some(url) = lookup("SOLANA_RPC_URL") {
            config.rpc_url = Some(url);
        }
        if let Some(path) = lookup("SOLANA_KEYPAIR") {
            config.keypair_path = PathBuf::from(path);
        }
        if let Some(secret) = lookup("SOLANA_SECRET_KEY") {
            config.secret_key = Some(secret);
        }
        if let Some(size) = lookup("RETRIEVE_PAGE_SIZE") {
            config.page_size = parse_positive("RETRIEVE_PAGE_SIZE", &size)?;
        }
        if let Some(depth) = lookup("RETRIEVE_MAX_DEPTH") {
            config.max_depth = parse_positive("RETRIEVE_MAX_DEPTH", &depth)?;
        }
        if let Some(secs) = lookup("CONFIRM_TIMEOUT_SECS") {
            config.confirm_timeout = Duration::from_secs(secs.parse()?);
        }
        if let Some(ms) = lookup("CONFIRM_POLL_MS") {
            config.confirm_poll_interval = Duration::from_millis(ms.parse()?);
        }
        if let Some(format) = lookup("MEMO_FORMAT") {
            config.memo_format = format.parse().map_err(|e| anyhow!("{}", e))?;
        }

        debug!(
            "Config loaded: network={}, rpc={}, page_size={}, max_depth={}",
            config.cluster,
            config.rpc_url(),
            config.page_size,
            config.max_depth
        );
        Ok(config)
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.cluster.rpc_url().to_string())
    }

    pub fn retrieve_options(&self) -> RetrieveOptions {
        RetrieveOptions {
            page_size: self.page_size,
            max_depth: self.max_depth,
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            memo_format: self.memo_format,
        }
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    let parsed: usize = value
        .parse()
        .map_err(|e| anyhow!("{} must be a positive integer: {}", key, e))?;
    if parsed == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(parsed)
}
