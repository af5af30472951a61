//! Closed enums shared by the vector-space descriptor, the operator
//! registry, and the kernel implementations: the three axes of the
//! `(metric, element type, simd level)` dispatch table.

use serde::{Deserialize, Serialize};

/// Distance/similarity metric. Closed set: the operator registry is a
/// dense table indexed by this enum, so adding a variant means adding a
/// registry column everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Manhattan / taxicab distance.
    L1,
    /// Euclidean distance.
    L2,
    /// Inner product (dot product).
    Ip,
    /// Hamming distance over bit-packed payloads.
    Hamming,
    /// Jaccard distance over bit-packed payloads.
    Jaccard,
    /// Cosine similarity.
    Cosine,
    /// Angular distance (`acos` of cosine similarity).
    Angle,
    /// Euclidean distance, assuming both inputs are already L2-normalized.
    NormalizedL2,
    /// Cosine similarity, assuming both inputs are already L2-normalized.
    NormalizedCosine,
    /// Angular distance, assuming both inputs are already L2-normalized.
    NormalizedAngle,
}

impl Metric {
    /// The full closed set, in table-column order.
    pub const ALL: [Metric; 10] = [
        Metric::L1,
        Metric::L2,
        Metric::Ip,
        Metric::Hamming,
        Metric::Jaccard,
        Metric::Cosine,
        Metric::Angle,
        Metric::NormalizedL2,
        Metric::NormalizedCosine,
        Metric::NormalizedAngle,
    ];

    /// Index of this metric within [`Metric::ALL`], used to address the
    /// registry's dense table without hashing.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::L1 => 0,
            Self::L2 => 1,
            Self::Ip => 2,
            Self::Hamming => 3,
            Self::Jaccard => 4,
            Self::Cosine => 5,
            Self::Angle => 6,
            Self::NormalizedL2 => 7,
            Self::NormalizedCosine => 8,
            Self::NormalizedAngle => 9,
        }
    }

    /// True for the `Normalized*` family: these kernels assume both inputs
    /// are already unit-length and skip the norm computation a plain
    /// `Cosine`/`Angle`/`L2` kernel would otherwise do.
    #[must_use]
    pub const fn assumes_normalized_input(self) -> bool {
        matches!(
            self,
            Self::NormalizedL2 | Self::NormalizedCosine | Self::NormalizedAngle
        )
    }

    /// True when a vector space using this metric must normalize vectors
    /// before they are stored (`need_normalize_vector` on the space
    /// descriptor).
    #[must_use]
    pub const fn requires_stored_normalization(self) -> bool {
        self.assumes_normalized_input()
    }
}

/// Element type of a stored vector. Closed set: {u8, f16, f32}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Unsigned 8-bit integer components (e.g. binary/quantized payloads).
    Uint8,
    /// IEEE-754 half precision float components.
    Float16,
    /// IEEE-754 single precision float components.
    Float32,
}

impl ElementType {
    /// The full closed set.
    pub const ALL: [ElementType; 3] = [Self::Uint8, Self::Float16, Self::Float32];

    /// Index of this element type within [`ElementType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Uint8 => 0,
            Self::Float16 => 1,
            Self::Float32 => 2,
        }
    }

    /// Size in bytes of a single element of this type.
    #[must_use]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Float16 => 2,
            Self::Float32 => 4,
        }
    }
}

/// Instruction-set capability level. Closed set, ordered from least to
/// most capable; `Scalar` is always available and is used for the
/// reference kernel the vector-space factory additionally resolves for
/// verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimdLevel {
    /// Portable scalar fallback, no architecture-specific instructions.
    Scalar,
    /// ARM NEON (always available on `aarch64`).
    Neon,
    /// x86-64 AVX2, dispatched via the portable `wide` 8-lane types.
    Avx2,
    /// x86-64 AVX-512.
    Avx512,
}

impl SimdLevel {
    /// The full closed set.
    pub const ALL: [SimdLevel; 4] = [Self::Scalar, Self::Neon, Self::Avx2, Self::Avx512];

    /// Index of this level within [`SimdLevel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Scalar => 0,
            Self::Neon => 1,
            Self::Avx2 => 2,
            Self::Avx512 => 3,
        }
    }

    /// Detects the best SIMD level actually available on the running CPU,
    /// independent of what is registered as a kernel (a caller may ask for
    /// a level the registry has no kernel for, which is a separate
    /// `Unavailable` failure at lookup time).
    #[must_use]
    pub fn detect_best_available() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx512f") {
                return Self::Avx512;
            }
            if is_x86_feature_detected!("avx2") {
                return Self::Avx2;
            }
            Self::Scalar
        }
        #[cfg(target_arch = "aarch64")]
        {
            Self::Neon
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self::Scalar
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_indices_are_dense_and_unique() {
        let mut seen = [false; Metric::ALL.len()];
        for m in Metric::ALL {
            assert!(!seen[m.index()]);
            seen[m.index()] = true;
        }
    }

    #[test]
    fn element_type_byte_sizes() {
        assert_eq!(ElementType::Uint8.byte_size(), 1);
        assert_eq!(ElementType::Float16.byte_size(), 2);
        assert_eq!(ElementType::Float32.byte_size(), 4);
    }

    #[test]
    fn normalized_metrics_require_stored_normalization() {
        assert!(Metric::NormalizedCosine.requires_stored_normalization());
        assert!(!Metric::Cosine.requires_stored_normalization());
    }

    #[test]
    fn simd_level_indices_are_dense_and_unique() {
        let mut seen = [false; SimdLevel::ALL.len()];
        for l in SimdLevel::ALL {
            assert!(!seen[l.index()]);
            seen[l.index()] = true;
        }
    }
}
