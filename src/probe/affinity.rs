//! Current-core lookup.
//!
//! Wraps the kernel's `sched_getcpu` so callers always receive a core id
//! below the configurable maximum. Hosts and platforms without the syscall
//! report core 0, which keeps per-core data structures usable everywhere at
//! the cost of skewing them toward the first slot.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

/// Cap on out-of-range warnings. Hotplug and container cpusets can make the
/// kernel report ids past the configured maximum on every call, and this
/// function sits on hot paths.
const MAX_OUT_OF_RANGE_WARNINGS: usize = 20;

static OUT_OF_RANGE_WARNINGS: AtomicUsize = AtomicUsize::new(0);

/// The core the calling thread is currently executing on.
///
/// Always below `max_cores`. Returns 0 when the platform cannot report the
/// core, and folds out-of-range kernel ids back into range.
pub fn current_core(max_cores: usize) -> usize {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: sched_getcpu takes no arguments and cannot fault.
        let raw = unsafe { libc::sched_getcpu() };
        fold_core_id(raw, max_cores)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = max_cores;
        0
    }
}

/// Fold a raw kernel core id into `0..max_cores`.
pub(crate) fn fold_core_id(raw: i32, max_cores: usize) -> usize {
    debug_assert!(max_cores > 0);
    if raw < 0 {
        return 0;
    }
    let core = raw as usize;
    if core >= max_cores {
        if OUT_OF_RANGE_WARNINGS.fetch_add(1, Ordering::Relaxed) < MAX_OUT_OF_RANGE_WARNINGS {
            warn!(
                "sched_getcpu returned core {} but only {} cores are configured",
                core, max_cores
            );
        }
        return core % max_cores;
    }
    core
}

/// Log once at startup if current-core lookup will not work on this host.
pub(crate) fn warn_if_unsupported() {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: sched_getcpu takes no arguments and cannot fault.
        if unsafe { libc::sched_getcpu() } == -1 {
            warn!("kernel does not support sched_getcpu; current-core lookups will report 0");
        }
    }
    #[cfg(not(target_os = "linux"))]
    warn!("current-core lookup is unsupported on this platform; lookups will report 0");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_ids_pass_through() {
        assert_eq!(fold_core_id(3, 8), 3);
        assert_eq!(fold_core_id(0, 8), 0);
        assert_eq!(fold_core_id(7, 8), 7);
    }

    #[test]
    fn out_of_range_ids_fold_by_modulo() {
        assert_eq!(fold_core_id(11, 8), 3);
        assert_eq!(fold_core_id(8, 8), 0);
    }

    #[test]
    fn failure_sentinel_maps_to_core_zero() {
        assert_eq!(fold_core_id(-1, 8), 0);
    }

    #[test]
    fn current_core_is_always_in_range() {
        for _ in 0..64 {
            assert!(current_core(4) < 4);
        }
    }
}
