//! Hardware probes.
//!
//! Each submodule reads one OS surface: the kernel CPU inventory, the sysfs
//! NUMA trees, the scheduler's current-core query, and the platform cache
//! interface. Probes degrade to documented defaults instead of failing, and
//! each takes its source locations as input so tests can point them at
//! staged fixture trees.

pub mod affinity;
pub mod cache;
pub mod features;
pub mod inventory;
pub mod numa;

pub use affinity::current_core;
pub use cache::{CacheGeometry, CacheGeometryProbe, CacheLevel, NUM_CACHE_LEVELS};
pub use features::CpuFeatures;
pub use inventory::{max_configurable_cores, CpuInventory};
pub use numa::NumaTopology;
