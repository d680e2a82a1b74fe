//! Diagnostics, advisories, and the hard capability requirement.
//!
//! The debug report is for humans reading logs; nothing machine-parseable is
//! implied by its layout. The governor and turbo checks are advisories for
//! benchmark operators and never fail. The one hard check is
//! [`enforce_minimum_features`], which the host process consults before
//! deciding to start.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::config::ProbeConfig;
use crate::error::Result;
use crate::probe::cache::CacheLevel;
use crate::topology::HardwareTopology;

#[cfg(target_arch = "x86_64")]
use crate::error::TopologyError;
#[cfg(target_arch = "x86_64")]
use crate::probe::features::CpuFeatures;

impl fmt::Display for HardwareTopology {
    /// Multi-line debug report covering the model, core counts, cache
    /// geometry, effective feature set, and the full core-to-node map.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.cache_geometry();

        writeln!(f, "Cpu Info:")?;
        writeln!(f, "  Model: {}", self.model_name())?;
        writeln!(f, "  Cores: {}", self.usable_cores())?;
        writeln!(f, "  Max Possible Cores: {}", self.max_cores())?;
        for level in CacheLevel::ALL {
            writeln!(
                f,
                "  {} Cache: {} (Line: {})",
                level.label(),
                pretty_bytes(cache.size(level)),
                pretty_bytes(cache.line_size(level))
            )?;
        }
        writeln!(f, "  Hardware Supports:")?;
        for name in self.features().names() {
            writeln!(f, "    {}", name)?;
        }
        writeln!(f, "  Numa Nodes: {}", self.numa().node_count())?;
        write!(f, "  Numa Nodes of Cores:")?;
        for (core, node) in self.numa().core_to_node().iter().enumerate() {
            write!(f, " {}->{} |", core, node)?;
        }
        writeln!(f)
    }
}

/// Check the hard minimum capability for this build's primary architecture.
///
/// On x86_64 the SIMD kernels assume AVX2, so a host without it must refuse
/// to start instead of faulting mid-query. Other architectures impose no
/// requirement.
pub fn enforce_minimum_features(topology: &HardwareTopology) -> Result<()> {
    #[cfg(target_arch = "x86_64")]
    if !topology.is_supported(CpuFeatures::AVX2) {
        return Err(TopologyError::MissingCpuFeature(
            "AVX2 (Advanced Vector Extensions 2)",
        ));
    }
    #[cfg(not(target_arch = "x86_64"))]
    let _ = topology;
    Ok(())
}

/// Warn for each usable core not running the `performance` cpufreq governor.
///
/// Cores whose governor file is absent are skipped silently; not every
/// platform or container exposes cpufreq.
pub fn verify_performance_governor(topology: &HardwareTopology, config: &ProbeConfig) {
    for core in 0..topology.usable_cores() {
        let governor_file = config
            .sysfs_cpu_root
            .join(format!("cpu{}/cpufreq/scaling_governor", core));
        warn_if_file_not_equal(
            &governor_file,
            "performance",
            &format!(
                "CPU {} is not using the 'performance' governor. Note that switching the \
                 governor to 'performance' resets no_turbo to 0.",
                core
            ),
        );
    }
}

/// Warn if CPU turbo is still enabled. Skipped silently when the platform
/// does not expose the intel_pstate knob.
pub fn verify_turbo_disabled(config: &ProbeConfig) {
    let no_turbo_file = config.sysfs_cpu_root.join("intel_pstate/no_turbo");
    warn_if_file_not_equal(
        &no_turbo_file,
        "1",
        "CPU turbo is enabled. Clock frequencies may shift during a run, skewing timing \
         measurements. Disable it by writing 1 to intel_pstate/no_turbo.",
    );
}

/// First line of a tunable file, without the trailing newline. `None` when
/// the file cannot be read.
fn read_first_line(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    Some(line.trim_end().to_string())
}

/// Log the advisory when the file exists and holds something other than the
/// expected value. An unreadable file is not a mismatch.
fn warn_if_file_not_equal(path: &Path, expected: &str, advisory: &str) {
    let Some(contents) = read_first_line(path) else {
        return;
    };
    if contents != expected {
        warn!("{}", advisory);
    }
}

/// Render a byte count the way humans read cache sizes.
fn pretty_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
