//! Aggregate hardware topology.
//!
//! [`HardwareTopology`] bundles the CPU inventory, NUMA layout, and cache
//! probe behind one handle. Discovery runs once, either explicitly through
//! [`HardwareTopology::detect`] or lazily through the process-wide
//! [`shared`] instance, and the result is immutable afterwards except for
//! the effective feature mask, which callers may narrow at runtime to steer
//! dispatch away from an instruction set.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::probe::affinity;
use crate::probe::cache::{CacheGeometry, CacheGeometryProbe};
use crate::probe::features::CpuFeatures;
use crate::probe::inventory::{max_configurable_cores, CpuInventory};
use crate::probe::numa::NumaTopology;

/// Everything discovery learned about the host, plus the runtime-adjustable
/// effective feature mask.
#[derive(Debug)]
pub struct HardwareTopology {
    inventory: CpuInventory,
    numa: NumaTopology,
    cache_probe: CacheGeometryProbe,
    original_features: CpuFeatures,
    effective_features: AtomicU64,
}

impl HardwareTopology {
    /// Run full discovery against the configured sources.
    ///
    /// Never fails: each probe degrades to its documented default when its
    /// source is missing or inconsistent.
    pub fn detect(config: &ProbeConfig) -> Self {
        let inventory = CpuInventory::scan(config);
        affinity::warn_if_unsupported();

        let max_cores = max_configurable_cores();
        let numa = NumaTopology::detect(max_cores, &config.sysfs_node_root, &config.sysfs_cpu_root);

        info!(
            "hardware topology: {} usable core(s), {} configurable, {} NUMA node(s), features [{}]",
            inventory.usable_cores,
            max_cores,
            numa.node_count(),
            inventory.features
        );

        Self::from_parts(inventory, numa)
    }

    /// Assemble a topology from already-built parts.
    ///
    /// This is the composition seam: tests and embedders can pair a scanned
    /// or hand-built inventory with any NUMA layout.
    pub fn from_parts(inventory: CpuInventory, numa: NumaTopology) -> Self {
        let original_features = inventory.features;
        HardwareTopology {
            inventory,
            numa,
            cache_probe: CacheGeometryProbe::new(),
            original_features,
            effective_features: AtomicU64::new(original_features.bits()),
        }
    }

    /// Marketing name of the CPU, `"unknown"` when unreported.
    pub fn model_name(&self) -> &str {
        &self.inventory.model_name
    }

    /// Number of logical cores the process should use. At least 1.
    pub fn usable_cores(&self) -> usize {
        self.inventory.usable_cores
    }

    /// Number of cores the kernel was configured with, including offline
    /// ones. Core ids handed out by this type are always below this.
    pub fn max_cores(&self) -> usize {
        self.numa.max_cores()
    }

    /// Estimated CPU cycles per millisecond.
    pub fn cycles_per_ms(&self) -> u64 {
        self.inventory.cycles_per_ms
    }

    /// The NUMA layout.
    pub fn numa(&self) -> &NumaTopology {
        &self.numa
    }

    /// Current cache geometry, queried from the platform on each call.
    pub fn cache_geometry(&self) -> CacheGeometry {
        self.cache_probe.read()
    }

    /// The core the calling thread is executing on, always below
    /// [`max_cores`](Self::max_cores).
    pub fn current_core(&self) -> usize {
        affinity::current_core(self.max_cores())
    }

    /// The effective feature set: hardware features minus any runtime
    /// disables.
    pub fn features(&self) -> CpuFeatures {
        CpuFeatures::from_bits(self.effective_features.load(Ordering::Relaxed))
    }

    /// The feature set as discovered, unaffected by runtime disables.
    pub fn original_features(&self) -> CpuFeatures {
        self.original_features
    }

    /// Whether every feature in `features` is currently effective.
    pub fn is_supported(&self, features: CpuFeatures) -> bool {
        self.features().contains(features)
    }

    /// Remove features from the effective set, e.g. to steer dispatch off a
    /// code path misbehaving on this host. Safe to call concurrently with
    /// readers.
    pub fn disable_feature(&self, features: CpuFeatures) {
        self.effective_features
            .fetch_and(!features.bits(), Ordering::Relaxed);
    }

    /// Add features back to the effective set. Only features the hardware
    /// actually has can come back; the effective set never exceeds the
    /// discovered one.
    pub fn restore_feature(&self, features: CpuFeatures) {
        self.effective_features
            .fetch_or(features.bits() & self.original_features.bits(), Ordering::Relaxed);
    }

    /// Replace the NUMA layout with an explicit mapping.
    ///
    /// For tests and simulations of other machines. Requires exclusive
    /// access, so the shared instance cannot be rewired.
    ///
    /// # Panics
    ///
    /// Panics when `core_to_node` does not cover exactly
    /// [`max_cores`](Self::max_cores) cores or maps a core to a node at or
    /// beyond `node_count`.
    pub fn rebuild_numa_with(&mut self, node_count: usize, core_to_node: Vec<usize>) {
        assert_eq!(
            core_to_node.len(),
            self.max_cores(),
            "mapping must cover every configurable core"
        );
        self.numa = NumaTopology::from_mapping(node_count, core_to_node);
    }
}

static SHARED: Lazy<HardwareTopology> = Lazy::new(|| {
    let config = ProbeConfig::load().unwrap_or_else(|e| {
        warn!("{}; falling back to default configuration", e);
        ProbeConfig::default()
    });
    HardwareTopology::detect(&config)
});

/// The process-wide topology, discovered on first access.
pub fn shared() -> &'static HardwareTopology {
    &SHARED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::features::CpuFeatures;

    fn test_inventory(features: CpuFeatures) -> CpuInventory {
        CpuInventory {
            model_name: "test cpu".to_string(),
            usable_cores: 4,
            cycles_per_ms: 2_000_000,
            features,
        }
    }

    #[test]
    fn detect_on_this_host_upholds_invariants() {
        let topo = HardwareTopology::detect(&ProbeConfig::default());

        assert!(topo.usable_cores() >= 1);
        assert!(topo.max_cores() >= 1);
        assert!(topo.numa().node_count() >= 1);
        assert_eq!(topo.numa().core_to_node().len(), topo.max_cores());
        for core in 0..topo.max_cores() {
            assert!(topo.numa().node_of_core(core) < topo.numa().node_count());
        }
        assert!(topo.current_core() < topo.max_cores());
    }

    #[test]
    fn disable_then_restore_round_trips() {
        let features = CpuFeatures::AVX | CpuFeatures::AVX2 | CpuFeatures::SSSE3;
        let topo = HardwareTopology::from_parts(
            test_inventory(features),
            NumaTopology::single_node(4),
        );

        topo.disable_feature(CpuFeatures::AVX2);
        assert!(!topo.is_supported(CpuFeatures::AVX2));
        assert!(topo.is_supported(CpuFeatures::AVX));
        assert_eq!(topo.original_features(), features);

        topo.restore_feature(CpuFeatures::AVX2);
        assert!(topo.is_supported(CpuFeatures::AVX2));
        assert_eq!(topo.features(), features);
    }

    #[test]
    fn restore_cannot_invent_features() {
        let topo = HardwareTopology::from_parts(
            test_inventory(CpuFeatures::empty()),
            NumaTopology::single_node(4),
        );

        topo.restore_feature(CpuFeatures::AVX2);
        assert!(!topo.is_supported(CpuFeatures::AVX2));
        assert!(topo.features().is_empty());
    }

    #[test]
    fn rebuild_replaces_numa_layout() {
        let mut topo = HardwareTopology::from_parts(
            test_inventory(CpuFeatures::empty()),
            NumaTopology::single_node(8),
        );

        topo.rebuild_numa_with(2, vec![0, 0, 1, 1, 0, 0, 1, 1]);

        assert_eq!(topo.numa().node_count(), 2);
        assert_eq!(topo.numa().cores_of_node(1), &[2, 3, 6, 7]);
        assert_eq!(topo.max_cores(), 8);
    }

    #[test]
    #[should_panic(expected = "mapping must cover every configurable core")]
    fn rebuild_rejects_short_mapping() {
        let mut topo = HardwareTopology::from_parts(
            test_inventory(CpuFeatures::empty()),
            NumaTopology::single_node(8),
        );
        topo.rebuild_numa_with(1, vec![0, 0]);
    }

    #[test]
    fn shared_instance_is_stable() {
        assert!(std::ptr::eq(shared(), shared()));
    }
}
