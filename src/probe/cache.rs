//! CPU cache geometry.
//!
//! Sizes and line sizes for the data-cache hierarchy, read through whichever
//! interface the platform offers. Values the platform does not report come
//! back as zero rather than a guess, so callers sizing buffers can tell
//! "unknown" from "small".

/// Number of cache levels reported.
pub const NUM_CACHE_LEVELS: usize = 3;

/// A level of the data-cache hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLevel {
    L1 = 0,
    L2 = 1,
    L3 = 2,
}

impl CacheLevel {
    pub const ALL: [CacheLevel; NUM_CACHE_LEVELS] = [CacheLevel::L1, CacheLevel::L2, CacheLevel::L3];

    pub fn label(self) -> &'static str {
        match self {
            CacheLevel::L1 => "L1",
            CacheLevel::L2 => "L2",
            CacheLevel::L3 => "L3",
        }
    }
}

/// Cache sizes and line sizes per level, in bytes. Zero means the platform
/// did not report the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheGeometry {
    sizes: [u64; NUM_CACHE_LEVELS],
    line_sizes: [u64; NUM_CACHE_LEVELS],
}

impl CacheGeometry {
    pub fn size(&self, level: CacheLevel) -> u64 {
        self.sizes[level as usize]
    }

    pub fn line_size(&self, level: CacheLevel) -> u64 {
        self.line_sizes[level as usize]
    }
}

/// Reads cache geometry through the interface this platform supports.
///
/// The interface is picked once at construction; `read` queries the live
/// values each call.
#[derive(Debug, Clone, Copy)]
pub struct CacheGeometryProbe {
    source: CacheSource,
}

impl CacheGeometryProbe {
    pub fn new() -> Self {
        CacheGeometryProbe {
            source: CacheSource::resolve(),
        }
    }

    pub fn read(&self) -> CacheGeometry {
        match self.source {
            CacheSource::Sysconf => read_sysconf(),
            CacheSource::Sysctl => read_sysctl(),
            CacheSource::Unsupported => CacheGeometry::default(),
        }
    }
}

impl Default for CacheGeometryProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Which platform interface reports cache geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheSource {
    /// Linux `sysconf` with the `_SC_LEVEL*` names.
    Sysconf,
    /// macOS `sysctlbyname` with the `hw.*cachesize` names.
    Sysctl,
    Unsupported,
}

impl CacheSource {
    fn resolve() -> Self {
        #[cfg(target_os = "linux")]
        {
            CacheSource::Sysconf
        }
        #[cfg(target_os = "macos")]
        {
            CacheSource::Sysctl
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            CacheSource::Unsupported
        }
    }
}

/// Clamp a raw platform value: negative means unsupported, zero means
/// unreported. Both become 0.
#[cfg(any(target_os = "linux", test))]
fn clamp_reported(value: libc::c_long) -> u64 {
    if value > 0 {
        value as u64
    } else {
        0
    }
}

#[cfg(target_os = "linux")]
fn read_sysconf() -> CacheGeometry {
    const SIZE_NAMES: [libc::c_int; NUM_CACHE_LEVELS] = [
        libc::_SC_LEVEL1_DCACHE_SIZE,
        libc::_SC_LEVEL2_CACHE_SIZE,
        libc::_SC_LEVEL3_CACHE_SIZE,
    ];
    const LINE_NAMES: [libc::c_int; NUM_CACHE_LEVELS] = [
        libc::_SC_LEVEL1_DCACHE_LINESIZE,
        libc::_SC_LEVEL2_CACHE_LINESIZE,
        libc::_SC_LEVEL3_CACHE_LINESIZE,
    ];

    let mut geometry = CacheGeometry::default();
    for level in 0..NUM_CACHE_LEVELS {
        // SAFETY: sysconf with a valid name has no preconditions.
        geometry.sizes[level] = clamp_reported(unsafe { libc::sysconf(SIZE_NAMES[level]) });
        geometry.line_sizes[level] = clamp_reported(unsafe { libc::sysconf(LINE_NAMES[level]) });
    }
    geometry
}

#[cfg(not(target_os = "linux"))]
fn read_sysconf() -> CacheGeometry {
    CacheGeometry::default()
}

#[cfg(target_os = "macos")]
fn read_sysctl() -> CacheGeometry {
    const SIZE_NAMES: [&str; NUM_CACHE_LEVELS] =
        ["hw.l1dcachesize", "hw.l2cachesize", "hw.l3cachesize"];

    let mut geometry = CacheGeometry::default();
    // One shared line size for the whole hierarchy on this platform.
    let line_size = sysctl_u64("hw.cachelinesize");
    for level in 0..NUM_CACHE_LEVELS {
        geometry.sizes[level] = sysctl_u64(SIZE_NAMES[level]);
        geometry.line_sizes[level] = line_size;
    }
    geometry
}

#[cfg(not(target_os = "macos"))]
fn read_sysctl() -> CacheGeometry {
    CacheGeometry::default()
}

#[cfg(target_os = "macos")]
fn sysctl_u64(name: &str) -> u64 {
    use std::ffi::CString;

    let Ok(name) = CString::new(name) else {
        return 0;
    };
    let mut value: u64 = 0;
    let mut len = std::mem::size_of::<u64>();
    // SAFETY: value and len describe a valid u64 output buffer.
    let rc = unsafe {
        libc::sysctlbyname(
            name.as_ptr(),
            &mut value as *mut u64 as *mut libc::c_void,
            &mut len,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc == 0 {
        value
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_stable() {
        let probe = CacheGeometryProbe::new();
        let first = probe.read();
        let second = probe.read();
        assert_eq!(first, second);
    }

    #[test]
    fn unreported_levels_are_zero_not_garbage() {
        let geometry = CacheGeometryProbe::new().read();
        for level in CacheLevel::ALL {
            // A real cache is at least one line; anything else must be the
            // "unreported" zero.
            let size = geometry.size(level);
            assert!(size == 0 || size >= 64, "implausible {} size {}", level.label(), size);
        }
    }

    #[test]
    fn clamp_maps_failure_codes_to_zero() {
        assert_eq!(clamp_reported(-1), 0);
        assert_eq!(clamp_reported(0), 0);
        assert_eq!(clamp_reported(32768), 32768);
    }

    #[test]
    fn levels_index_their_own_slots() {
        let geometry = CacheGeometry {
            sizes: [1, 2, 3],
            line_sizes: [64, 64, 128],
        };
        assert_eq!(geometry.size(CacheLevel::L1), 1);
        assert_eq!(geometry.size(CacheLevel::L3), 3);
        assert_eq!(geometry.line_size(CacheLevel::L3), 128);
    }
}
