//! CPU instruction-set feature detection.
//!
//! Features are represented as a bitmask newtype so call sites can test,
//! combine, and format capability sets without touching raw integers. The
//! mask is populated from the kernel flag line rather than `cpuid` so the
//! rest of discovery and its tests stay independent of the host CPU.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of CPU instruction-set extensions, stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuFeatures(u64);

impl CpuFeatures {
    pub const SSSE3: CpuFeatures = CpuFeatures(1 << 1);
    pub const SSE4_1: CpuFeatures = CpuFeatures(1 << 2);
    pub const SSE4_2: CpuFeatures = CpuFeatures(1 << 3);
    pub const POPCNT: CpuFeatures = CpuFeatures(1 << 4);
    pub const AVX: CpuFeatures = CpuFeatures(1 << 5);
    pub const AVX2: CpuFeatures = CpuFeatures(1 << 6);
    pub const PCLMULQDQ: CpuFeatures = CpuFeatures(1 << 7);

    /// The empty feature set.
    pub const fn empty() -> Self {
        CpuFeatures(0)
    }

    /// Parse a kernel flag line into a feature set.
    ///
    /// Matching is by substring, not by whole token: a flag line containing
    /// `avx2` also implies `avx`, and `sse4_2` lines on kernels that spell it
    /// `sse4.2` still match. This mirrors how the flag vocabulary has drifted
    /// across kernel versions.
    pub fn parse(flags_line: &str) -> Self {
        let mut features = CpuFeatures::empty();
        for (name, feature) in NAMED {
            if flags_line.contains(name) {
                features |= feature;
            }
        }
        features
    }

    /// Whether every feature in `other` is present in `self`.
    pub const fn contains(self, other: CpuFeatures) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw bitmask. Stable across releases so it can be persisted or
    /// compared across processes.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub(crate) const fn from_bits(bits: u64) -> Self {
        CpuFeatures(bits)
    }

    /// Names of the features present in this set, in canonical order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMED
            .iter()
            .filter(move |(_, feature)| self.contains(*feature))
            .map(|(name, _)| *name)
    }
}

impl BitOr for CpuFeatures {
    type Output = CpuFeatures;

    fn bitor(self, rhs: CpuFeatures) -> CpuFeatures {
        CpuFeatures(self.0 | rhs.0)
    }
}

impl BitOrAssign for CpuFeatures {
    fn bitor_assign(&mut self, rhs: CpuFeatures) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.names() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", name)?;
            first = false;
        }
        Ok(())
    }
}

/// Recognized flag substrings paired with their bits, in canonical order.
static NAMED: [(&str, CpuFeatures); 7] = [
    ("ssse3", CpuFeatures::SSSE3),
    ("sse4_1", CpuFeatures::SSE4_1),
    ("sse4_2", CpuFeatures::SSE4_2),
    ("popcnt", CpuFeatures::POPCNT),
    ("avx", CpuFeatures::AVX),
    ("avx2", CpuFeatures::AVX2),
    ("pclmulqdq", CpuFeatures::PCLMULQDQ),
];
