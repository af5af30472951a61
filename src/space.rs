//! Vector-space descriptor: the immutable record produced once by a
//! factory that resolves kernels from the operator registry.
//!
//! Pairs a metric enum with per-element-type byte-size bookkeeping,
//! generalized to resolve both a scalar reference kernel and a fast kernel
//! up front: construction looks up the registry twice, once for the
//! requested SIMD level and once for the `Scalar` baseline.

use tracing::info;

use crate::batch::ALIGNMENT;
use crate::error::{Error, Result};
use crate::registry::{OperatorEntity, OperatorRegistry};
use crate::types::{ElementType, Metric, SimdLevel};

/// Immutable vector-space descriptor. Created once by [`VectorSpace::create`]
/// and shared freely thereafter.
#[derive(Debug, Clone, Copy)]
pub struct VectorSpace {
    dim: usize,
    element_type: ElementType,
    raw_vector_byte_size: usize,
    aligned_vector_byte_size: usize,
    scalar: OperatorEntity,
    fast: OperatorEntity,
    need_normalize_vector: bool,
}

fn round_up_to_alignment(size: usize) -> usize {
    size.div_ceil(ALIGNMENT) * ALIGNMENT
}

impl VectorSpace {
    /// Resolves the `(metric, element_type, simd_level)` kernel pair from
    /// `registry` and builds the immutable descriptor.
    ///
    /// Looks up the requested fast path first, then the `Scalar` reference
    /// kernel for the same `(metric, element_type)`. Either miss fails the
    /// whole construction with [`Error::Unavailable`] — e.g. requesting a
    /// SIMD level with no registered kernel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `dim` is 0, or
    /// [`Error::Unavailable`] if either kernel lookup fails.
    pub fn create(
        registry: &OperatorRegistry,
        dim: usize,
        metric: Metric,
        element_type: ElementType,
        simd_level: SimdLevel,
    ) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidArgument("dim must be nonzero".into()));
        }
        let fast = registry
            .lookup(metric, element_type, simd_level)
            .map_err(|e| {
                Error::Unavailable(format!(
                    "no fast kernel for ({metric:?}, {element_type:?}, {simd_level:?}): {e}"
                ))
            })?;
        let scalar = registry
            .lookup(metric, element_type, SimdLevel::Scalar)
            .map_err(|e| {
                Error::Unavailable(format!(
                    "no scalar reference kernel for ({metric:?}, {element_type:?}): {e}"
                ))
            })?;
        let raw_vector_byte_size = dim * element_type.byte_size();
        let aligned_vector_byte_size = round_up_to_alignment(raw_vector_byte_size);
        let need_normalize_vector = metric.requires_stored_normalization();
        info!(
            dim,
            ?element_type,
            ?metric,
            ?simd_level,
            raw_vector_byte_size,
            aligned_vector_byte_size,
            "vector space created"
        );
        Ok(Self {
            dim,
            element_type,
            raw_vector_byte_size,
            aligned_vector_byte_size,
            scalar,
            fast,
            need_normalize_vector,
        })
    }

    /// Logical dimensionality.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Element type of stored vectors.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Raw per-vector byte size (`dim * element_size`), before alignment
    /// padding.
    #[must_use]
    pub const fn raw_vector_byte_size(&self) -> usize {
        self.raw_vector_byte_size
    }

    /// Per-vector byte size after rounding up to the 64-byte alignment
    /// boundary. Every batch slot is exactly this wide.
    #[must_use]
    pub const fn aligned_vector_byte_size(&self) -> usize {
        self.aligned_vector_byte_size
    }

    /// Whether a store using this space must normalize vectors before
    /// storage.
    #[must_use]
    pub const fn need_normalize_vector(&self) -> bool {
        self.need_normalize_vector
    }

    /// The resolved fast-path operator entity.
    #[must_use]
    pub const fn fast(&self) -> &OperatorEntity {
        &self.fast
    }

    /// The resolved scalar reference operator entity, used to verify a
    /// fast kernel's agreement against a known-correct baseline.
    #[must_use]
    pub const fn scalar(&self) -> &OperatorEntity {
        &self.scalar
    }

    /// Computes the distance between two aligned byte spans via the fast
    /// kernel.
    #[must_use]
    pub fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        (self.fast.distance_fn)(a, b)
    }

    /// Normalizes a byte span in place via the fast kernel, if this space's
    /// metric requires stored normalization.
    pub fn normalize(&self, buf: &mut [u8]) {
        (self.fast.normalize_fn)(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::global_registry;

    #[test]
    fn aligned_size_is_multiple_of_64_and_at_least_raw() {
        let space = VectorSpace::create(
            global_registry(),
            8,
            Metric::L2,
            ElementType::Float32,
            SimdLevel::Scalar,
        )
        .unwrap();
        assert_eq!(space.raw_vector_byte_size(), 32);
        assert_eq!(space.aligned_vector_byte_size(), 64);
        assert_eq!(space.aligned_vector_byte_size() % 64, 0);
        assert!(space.aligned_vector_byte_size() >= space.raw_vector_byte_size());
    }

    #[test]
    fn zero_dim_is_invalid_argument() {
        let err = VectorSpace::create(
            global_registry(),
            0,
            Metric::L2,
            ElementType::Float32,
            SimdLevel::Scalar,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn unregistered_simd_level_is_unavailable() {
        let err = VectorSpace::create(
            global_registry(),
            8,
            Metric::L2,
            ElementType::Float32,
            SimdLevel::Neon,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[test]
    fn avx2_space_reports_need_normalize_correctly() {
        let space = VectorSpace::create(
            global_registry(),
            8,
            Metric::L2,
            ElementType::Float32,
            SimdLevel::Avx2,
        )
        .unwrap();
        assert!(!space.need_normalize_vector());
    }
}
