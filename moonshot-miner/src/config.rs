//! Worker configuration.
//!
//! The daemon is configured entirely through environment variables:
//!
//! | variable                | default                              |
//! |-------------------------|--------------------------------------|
//! | `WALLET_ADDRESS`        | required                             |
//! | `MOONSHOT_INTENSITY_MS` | `100`                                |
//! | `MOONSHOT_POOL_URL`     | `stratum+tcp://solo.ckpool.org:3333` |
//! | `MOONSHOT_USER_AGENT`   | `MoonshotMiner/1.0`                  |

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::stratum_v1::{PoolAddress, StratumError};

pub const DEFAULT_POOL_URL: &str = "stratum+tcp://solo.ckpool.org:3333";
pub const DEFAULT_USER_AGENT: &str = "MoonshotMiner/1.0";
pub const DEFAULT_INTENSITY: Duration = Duration::from_millis(100);

/// Pause before reconnecting after the pool connection is lost.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Configuration errors, reported before the worker starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("WALLET_ADDRESS is not set")]
    MissingWallet,

    #[error("Invalid MOONSHOT_INTENSITY_MS {0:?}: expected milliseconds")]
    InvalidIntensity(String),

    #[error("Invalid MOONSHOT_POOL_URL: {0}")]
    InvalidPoolUrl(#[source] StratumError),
}

/// Everything the worker needs to start.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Payout address; also the Stratum username
    pub wallet_address: String,

    /// Pause after every search batch
    pub intensity: Duration,

    pub pool: PoolAddress,

    /// Sent with `mining.subscribe`
    pub user_agent: String,

    pub reconnect_delay: Duration,
}

impl WorkerConfig {
    /// Defaults for everything except the wallet.
    pub fn new(wallet_address: impl Into<String>) -> Result<Self, ConfigError> {
        let wallet_address = wallet_address.into().trim().to_string();
        if wallet_address.is_empty() {
            return Err(ConfigError::MissingWallet);
        }
        Ok(Self {
            wallet_address,
            intensity: DEFAULT_INTENSITY,
            pool: PoolAddress::parse(DEFAULT_POOL_URL).map_err(ConfigError::InvalidPoolUrl)?,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            reconnect_delay: RECONNECT_DELAY,
        })
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its
    /// value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let wallet = get("WALLET_ADDRESS").ok_or(ConfigError::MissingWallet)?;
        let mut config = Self::new(wallet)?;

        if let Some(ms) = get("MOONSHOT_INTENSITY_MS") {
            let ms = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidIntensity(ms.clone()))?;
            config.intensity = Duration::from_millis(ms);
        }

        if let Some(url) = get("MOONSHOT_POOL_URL") {
            config.pool = PoolAddress::parse(url.trim()).map_err(ConfigError::InvalidPoolUrl)?;
        }

        if let Some(agent) = get("MOONSHOT_USER_AGENT") {
            config.user_agent = agent;
        }

        Ok(config)
    }
}
