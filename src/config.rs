//! Probe configuration.
//!
//! Centralizes the operator-tunable inputs of hardware discovery: the
//! usable-core override and the filesystem roots the probes read from. The
//! roots default to the live kernel interfaces and are overridable so that
//! containerized deployments and tests can point discovery at a staged tree.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TopologyError};

/// Upper bound accepted for the operator core override; anything larger is
/// assumed to be a typo rather than real hardware.
const MAX_USABLE_CORES: usize = 4096;

// Default value functions for serde defaults
fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}
fn default_sysfs_cpu_root() -> PathBuf {
    PathBuf::from("/sys/devices/system/cpu")
}
fn default_sysfs_node_root() -> PathBuf {
    PathBuf::from("/sys/devices/system/node")
}

/// Tunable inputs for hardware discovery, loaded once at process startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Operator override for the usable logical core count. When positive it
    /// replaces the detected count unconditionally, letting workloads be
    /// pinned to a subset of the hardware; 0 means auto-detect.
    #[serde(default)]
    pub usable_cores: usize,

    /// Per-core hardware inventory source.
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,

    /// Root of the per-cpu sysfs tree (NUMA membership markers, cpufreq
    /// tunables).
    #[serde(default = "default_sysfs_cpu_root")]
    pub sysfs_cpu_root: PathBuf,

    /// Root of the NUMA node metadata tree. Only present when the kernel was
    /// built with NUMA support; discovery falls back to a single synthetic
    /// node when it is missing.
    #[serde(default = "default_sysfs_node_root")]
    pub sysfs_node_root: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            usable_cores: 0,
            cpuinfo_path: default_cpuinfo_path(),
            sysfs_cpu_root: default_sysfs_cpu_root(),
            sysfs_node_root: default_sysfs_node_root(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables prefixed `HWTOPO_` (highest priority)
    /// 2. hwtopo.toml (if it exists)
    /// 3. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        let config: ProbeConfig = Figment::from(Serialized::defaults(ProbeConfig::default()))
            .merge(Toml::file("hwtopo.toml"))
            .merge(Env::prefixed("HWTOPO_"))
            .extract()
            .map_err(|e| TopologyError::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.usable_cores > MAX_USABLE_CORES {
            return Err(TopologyError::Config(format!(
                "usable_cores must be at most {} (got {})",
                MAX_USABLE_CORES, self.usable_cores
            )));
        }

        for (field, path) in [
            ("cpuinfo_path", &self.cpuinfo_path),
            ("sysfs_cpu_root", &self.sysfs_cpu_root),
            ("sysfs_node_root", &self.sysfs_node_root),
        ] {
            if path.as_os_str().is_empty() {
                return Err(TopologyError::Config(format!("{} cannot be empty", field)));
            }
        }

        Ok(())
    }
}
