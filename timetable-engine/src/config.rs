//! Engine configuration assembled from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::repair::RepairConfig;
use crate::scenario::EvaluatorConfig;
use crate::timetable::DwellPolicy;

/// Default path of the network document.
pub const DEFAULT_NETWORK_PATH: &str = "data/network.json";

/// Default listen address.
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid value {value:?} for {key}: expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Everything the engine binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub repair: RepairConfig,
    pub evaluator: EvaluatorConfig,
    pub dwell: DwellPolicy,
    pub network_path: PathBuf,
    pub addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repair: RepairConfig::default(),
            evaluator: EvaluatorConfig::default(),
            dwell: DwellPolicy::default(),
            network_path: PathBuf::from(DEFAULT_NETWORK_PATH),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl EngineConfig {
    /// Read `ENGINE_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse(&lookup, "ENGINE_MAX_ITERATIONS", "a non-negative integer")? {
            config.repair.max_iterations = n;
        }
        if let Some(n) = parse(&lookup, "ENGINE_MAX_PARALLEL", "a positive integer")? {
            if n == 0 {
                return Err(invalid("ENGINE_MAX_PARALLEL", "0", "a positive integer"));
            }
            config.evaluator.max_parallel = n;
        }
        if let Some(value) = lookup("ENGINE_DWELL_POLICY") {
            config.dwell = match value.trim() {
                "require" => DwellPolicy::Require,
                "default" => DwellPolicy::default(),
                _ => {
                    return Err(invalid(
                        "ENGINE_DWELL_POLICY",
                        &value,
                        "\"require\" or \"default\"",
                    ));
                }
            };
        }
        if let Some(path) = lookup("ENGINE_NETWORK") {
            config.network_path = PathBuf::from(path);
        }
        if let Some(addr) = parse(&lookup, "ENGINE_ADDR", "a socket address like 127.0.0.1:3000")? {
            config.addr = addr;
        }

        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, &value, expected)),
    }
}

fn invalid(key: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        expected,
    }
}
