//! Configuration for platforms, region executors and lab hosts.
//!
//! This module provides:
//! - Configuration types with serde defaults
//! - Host profiles for the lab tick source
//! - Validation
//! - Layered loading (TOML file behind `config-file`, then `TICKPLEX_*`
//!   environment overrides)

use crate::error::ConfigError;
use crate::executor::BudgetScope;
use crate::host::HostCapabilities;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TICKPLEX_";

/// Region executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Wall-clock budget per host tick for draining a region's queue.
    pub ms_per_tick: u64,
    /// Cap on concurrently materialized region drivers; `None` is unbounded.
    pub max_active_keys: Option<usize>,
    /// Which drivers share a deadline within one host tick.
    pub budget_scope: BudgetScope,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            ms_per_tick: 5,
            max_active_keys: None,
            budget_scope: BudgetScope::default(),
        }
    }
}

impl ExecutorConfig {
    /// Sets the per-tick budget.
    pub fn ms_per_tick(mut self, ms: u64) -> Self {
        self.ms_per_tick = ms;
        self
    }

    /// Caps concurrently materialized drivers.
    pub fn max_active_keys(mut self, max: Option<usize>) -> Self {
        self.max_active_keys = max;
        self
    }

    /// Sets the deadline sharing scope.
    pub fn budget_scope(mut self, scope: BudgetScope) -> Self {
        self.budget_scope = scope;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ms_per_tick == 0 {
            return Err(ConfigError::InvalidMsPerTick(self.ms_per_tick));
        }
        if self.max_active_keys == Some(0) {
            return Err(ConfigError::InvalidMaxActiveKeys);
        }
        Ok(())
    }
}

/// Settings for the in-process [`LabHost`](crate::lab::LabHost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Length of one host tick, used to convert wall-clock delays.
    pub ms_per_tick: u64,
    /// Whether regions tick independently.
    pub regionized: bool,
    /// Whether the host binds work to regions natively.
    pub native_region_scheduling: bool,
    /// Whether the host binds work to entities natively.
    pub native_entity_scheduling: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::spigot_like()
    }
}

impl LabConfig {
    /// Classic single-threaded host: global and async scheduling only.
    #[must_use]
    pub fn spigot_like() -> Self {
        Self::with_capabilities(HostCapabilities::global_only())
    }

    /// Single-threaded host with native region and entity schedulers.
    #[must_use]
    pub fn paper_like() -> Self {
        Self::with_capabilities(HostCapabilities::single_threaded_native())
    }

    /// Regionized host.
    #[must_use]
    pub fn folia_like() -> Self {
        Self::with_capabilities(HostCapabilities::regionized())
    }

    /// A lab host advertising exactly `capabilities`.
    #[must_use]
    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        Self {
            ms_per_tick: 50,
            regionized: capabilities.regionized,
            native_region_scheduling: capabilities.native_region_scheduling,
            native_entity_scheduling: capabilities.native_entity_scheduling,
        }
    }

    /// Sets the tick length.
    pub fn ms_per_tick(mut self, ms: u64) -> Self {
        self.ms_per_tick = ms;
        self
    }

    /// The capabilities a lab host built from this config advertises.
    #[must_use]
    pub fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            regionized: self.regionized,
            native_region_scheduling: self.native_region_scheduling,
            native_entity_scheduling: self.native_entity_scheduling,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ms_per_tick == 0 {
            return Err(ConfigError::InvalidMsPerHostTick(self.ms_per_tick));
        }
        Ok(())
    }
}

/// Top-level configuration for a platform and its region executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Owner name attached to every submitted task.
    pub owner: String,
    /// Region executor settings.
    pub executor: ExecutorConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            owner: "tickplex".to_string(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl PlatformConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.trim().is_empty() {
            return Err(ConfigError::InvalidOwner);
        }
        self.executor.validate()
    }

    /// Parses a TOML document over the defaults and validates it.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Applies `TICKPLEX_*` environment variables, then validates.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let overrides: BTreeMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.apply_overrides(&overrides)
    }

    /// Applies `TICKPLEX_*` key/value overrides, then validates.
    ///
    /// Unknown keys are ignored.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in overrides {
            self.apply_override(key, value)?;
        }
        self.validate()
    }

    fn apply_override(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "TICKPLEX_OWNER" => self.owner = value.to_string(),
            "TICKPLEX_MS_PER_TICK" => self.executor.ms_per_tick = parse_u64(value, key)?,
            "TICKPLEX_MAX_ACTIVE_KEYS" => {
                self.executor.max_active_keys = match value {
                    "" | "none" | "unbounded" => None,
                    other => Some(parse_usize(other, key)?),
                };
            }
            "TICKPLEX_BUDGET_SCOPE" => {
                self.executor.budget_scope = parse_budget_scope(value, key)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Parse(format!("invalid u64 for {key}: {value}")))
}

fn parse_usize(value: &str, key: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Parse(format!("invalid usize for {key}: {value}")))
}

fn parse_budget_scope(value: &str, key: &str) -> Result<BudgetScope, ConfigError> {
    match value {
        "shared_per_tick" => Ok(BudgetScope::SharedPerTick),
        "per_thread" => Ok(BudgetScope::PerThread),
        "per_firing" => Ok(BudgetScope::PerFiring),
        _ => Err(ConfigError::Parse(format!(
            "invalid budget scope for {key}: {value}"
        ))),
    }
}
