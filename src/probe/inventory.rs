//! CPU inventory scanning from the kernel's per-core table.
//!
//! A single pass over /proc/cpuinfo yields the model name, the usable core
//! count, the instruction-set feature mask, and a cycles-per-millisecond
//! estimate derived from the highest reported clock. The scan never fails:
//! an unreadable source degrades to documented defaults so discovery can
//! proceed on stripped-down containers and unusual kernels.

use std::fs::File;
use std::io::{BufRead, BufReader};

use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::probe::features::CpuFeatures;

/// Clock estimate used when no `cpu MHz` line is present, e.g. inside some
/// VMs and on non-x86 machines. Equivalent to a 1 GHz clock.
const FALLBACK_CYCLES_PER_MS: u64 = 1_000_000;

/// Per-host CPU inventory as reported by the kernel.
#[derive(Debug, Clone)]
pub struct CpuInventory {
    /// Marketing name of the CPU, `"unknown"` when the kernel does not
    /// report one.
    pub model_name: String,
    /// Number of logical cores the process should use. At least 1.
    pub usable_cores: usize,
    /// Estimated CPU cycles per millisecond, based on the highest clock seen
    /// across cores. Coarse, meant for converting time limits to cycle
    /// counts.
    pub cycles_per_ms: u64,
    /// Instruction-set extensions advertised by the kernel.
    pub features: CpuFeatures,
}

impl CpuInventory {
    /// Scan the configured cpuinfo source.
    ///
    /// An unreadable source is logged and treated as empty, which yields the
    /// single-core, unknown-model, fallback-clock inventory.
    pub fn scan(config: &ProbeConfig) -> Self {
        match File::open(&config.cpuinfo_path) {
            Ok(file) => Self::scan_reader(BufReader::new(file), config.usable_cores),
            Err(e) => {
                warn!(
                    "could not open {}: {}; using default CPU inventory",
                    config.cpuinfo_path.display(),
                    e
                );
                Self::scan_reader(std::io::empty(), config.usable_cores)
            }
        }
    }

    /// Scan any cpuinfo-shaped reader.
    ///
    /// `usable_cores_override`, when positive, replaces the detected core
    /// count unconditionally. Zero means keep the detected count.
    pub fn scan_reader<R: BufRead>(reader: R, usable_cores_override: usize) -> Self {
        let mut model_name: Option<String> = None;
        let mut detected_cores = 0usize;
        let mut max_mhz = 0.0f64;
        let mut features = CpuFeatures::empty();

        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("error reading cpuinfo: {}", e);
                    break;
                }
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "flags" => features |= CpuFeatures::parse(value),
                "cpu MHz" => {
                    if let Ok(mhz) = value.parse::<f64>() {
                        max_mhz = max_mhz.max(mhz);
                    }
                }
                "processor" => detected_cores += 1,
                "model name" => model_name = Some(value.to_string()),
                _ => {}
            }
        }

        let detected_cores = detected_cores.max(1);
        let usable_cores = if usable_cores_override > 0 {
            debug!(
                "overriding detected core count {} with configured {}",
                detected_cores, usable_cores_override
            );
            usable_cores_override
        } else {
            detected_cores
        };

        let cycles_per_ms = if max_mhz > 0.0 {
            (max_mhz * 1000.0) as u64
        } else {
            FALLBACK_CYCLES_PER_MS
        };

        CpuInventory {
            model_name: model_name.unwrap_or_else(|| "unknown".to_string()),
            usable_cores,
            cycles_per_ms,
            features,
        }
    }
}

/// Number of logical cores the kernel was configured with, including offline
/// ones. Upper bound for any core id discovery can hand out.
pub fn max_configurable_cores() -> usize {
    #[cfg(unix)]
    {
        // SAFETY: sysconf with a valid name has no preconditions.
        let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
        if n > 0 {
            return n as usize;
        }
        warn!("sysconf(_SC_NPROCESSORS_CONF) failed; falling back to online core count");
    }
    num_cpus::get()
}
