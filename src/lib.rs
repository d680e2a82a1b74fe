//! Process-wide hardware topology discovery.
//!
//! Answers, once per process, the questions performance-sensitive code asks
//! about the machine it landed on: which instruction-set extensions the CPU
//! has, how many cores may be used, how cores map onto NUMA nodes, what the
//! cache hierarchy looks like, and which core the current thread is running
//! on. Discovery reads the kernel's procfs and sysfs interfaces, degrades to
//! documented defaults when a source is missing, and exposes the result as
//! an immutable [`topology::HardwareTopology`] aggregate.
//!
//! ```no_run
//! use hwtopo::config::ProbeConfig;
//! use hwtopo::probe::CpuFeatures;
//! use hwtopo::topology::HardwareTopology;
//!
//! let topology = HardwareTopology::detect(&ProbeConfig::default());
//! if topology.is_supported(CpuFeatures::AVX2) {
//!     // take the wide-vector path
//! }
//! let node = topology.numa().node_of_core(topology.current_core());
//! # let _ = node;
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod probe;
pub mod topology;
