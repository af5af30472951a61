//! Operator registry: the three-dimensional `(metric, element type, SIMD
//! level)` dispatch table.
//!
//! Mirrors a one-shot-init dispatch idiom built around `OnceLock`-guarded
//! SIMD function-pointer caching, generalized into an explicit table so a
//! vector space can `lookup` both
//! its requested fast path and a `Scalar` reference kernel once, at
//! construction, rather than branching on every call.

use std::sync::{Once, OnceLock, RwLock};

use tracing::info;

use crate::error::{Error, Result};
use crate::kernels::{scalar, simd, DistanceFn, NormFn, NormalizeFn};
use crate::types::{ElementType, Metric, SimdLevel};

/// A fully resolved operator for one `(metric, dtype, simd_level)` cell:
/// the distance/norm/normalize function pointers plus the metadata a
/// vector space needs to decide how to store and query against it.
#[derive(Debug, Clone, Copy)]
pub struct OperatorEntity {
    /// Metric this entity implements.
    pub metric: Metric,
    /// Element type this entity operates on.
    pub data_type: ElementType,
    /// SIMD level this entity was compiled/selected for.
    pub simd_level: SimdLevel,
    /// Whether this metric requires vectors to be normalized before
    /// storage (the `Normalized*` family).
    pub need_normalize_vector: bool,
    /// Distance/similarity kernel.
    pub distance_fn: DistanceFn,
    /// Norm kernel.
    pub norm_fn: NormFn,
    /// In-place normalization kernel.
    pub normalize_fn: NormalizeFn,
}

impl OperatorEntity {
    /// Whether this entity is a valid fill for the `(metric, dtype,
    /// simd_level)` cell, i.e. its own axis fields agree with the cell
    /// being addressed. `register` calls this to reject an entity
    /// mismatched with the cell a caller asked to install it into.
    #[must_use]
    pub fn supports(&self, metric: Metric, data_type: ElementType, simd_level: SimdLevel) -> bool {
        self.metric == metric && self.data_type == data_type && self.simd_level == simd_level
    }
}

const METRICS: usize = Metric::ALL.len();
const TYPES: usize = ElementType::ALL.len();
const LEVELS: usize = SimdLevel::ALL.len();

fn cell_index(metric: Metric, data_type: ElementType, simd_level: SimdLevel) -> usize {
    (metric.index() * TYPES + data_type.index()) * LEVELS + simd_level.index()
}

/// Dense `(metric, element type, SIMD level)` dispatch table.
///
/// Registration is only permitted before [`OperatorRegistry::finish_build`]
/// is called; afterwards the table is frozen and safely shared across
/// threads without further locking on the read path.
pub struct OperatorRegistry {
    cells: RwLock<Vec<Option<OperatorEntity>>>,
    frozen: std::sync::atomic::AtomicBool,
}

impl OperatorRegistry {
    fn new() -> Self {
        Self {
            cells: RwLock::new(vec![None; METRICS * TYPES * LEVELS]),
            frozen: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers an operator entity in the `(metric, dtype, simd_level)`
    /// cell named by the first three arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FailedPrecondition`] if the registry has already
    /// been frozen by [`OperatorRegistry::finish_build`],
    /// [`Error::InvalidArgument`] if `entity` does not itself describe the
    /// requested `(metric, data_type, simd_level)` axis combination, or
    /// [`Error::AlreadyExists`] if the cell is populated and `replace` is
    /// `false`.
    pub fn register(
        &self,
        metric: Metric,
        data_type: ElementType,
        simd_level: SimdLevel,
        entity: OperatorEntity,
        replace: bool,
    ) -> Result<()> {
        if self.frozen.load(std::sync::atomic::Ordering::Acquire) {
            return Err(Error::FailedPrecondition(
                "registry is frozen, no further registrations are accepted".into(),
            ));
        }
        if !entity.supports(metric, data_type, simd_level) {
            return Err(Error::InvalidArgument(format!(
                "entity ({:?}, {:?}, {:?}) does not match requested cell ({metric:?}, {data_type:?}, {simd_level:?})",
                entity.metric, entity.data_type, entity.simd_level
            )));
        }
        let idx = cell_index(metric, data_type, simd_level);
        let mut cells = self.cells.write().expect("registry lock poisoned");
        if cells[idx].is_some() && !replace {
            return Err(Error::AlreadyExists(format!(
                "operator cell ({:?}, {:?}, {:?}) already registered",
                entity.metric, entity.data_type, entity.simd_level
            )));
        }
        cells[idx] = Some(entity);
        Ok(())
    }

    /// Resolves the operator entity for the given axis combination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cell is unpopulated.
    pub fn lookup(
        &self,
        metric: Metric,
        data_type: ElementType,
        simd_level: SimdLevel,
    ) -> Result<OperatorEntity> {
        let idx = cell_index(metric, data_type, simd_level);
        let cells = self.cells.read().expect("registry lock poisoned");
        cells[idx].ok_or_else(|| {
            Error::NotFound(format!(
                "no operator registered for ({metric:?}, {data_type:?}, {simd_level:?})"
            ))
        })
    }

    /// Freezes the registry. Subsequent `register` calls fail.
    pub fn finish_build(&self) {
        self.frozen.store(true, std::sync::atomic::Ordering::Release);
    }

    fn register_builtin(
        &self,
        metric: Metric,
        data_type: ElementType,
        simd_level: SimdLevel,
        distance_fn: DistanceFn,
        norm_fn: NormFn,
        normalize_fn: NormalizeFn,
    ) {
        let entity = OperatorEntity {
            metric,
            data_type,
            simd_level,
            need_normalize_vector: metric.requires_stored_normalization(),
            distance_fn,
            norm_fn,
            normalize_fn,
        };
        // Built-in population runs once at process init; a duplicate
        // built-in registration is a programmer error in this module, not
        // a caller-reachable failure.
        self.register(metric, data_type, simd_level, entity, false)
            .expect("duplicate built-in operator registration");
    }
}

fn noop_normalize(_buf: &mut [u8]) {}

fn populate_builtins(registry: &OperatorRegistry) {
    use Metric::{
        Angle, Cosine, Hamming, Ip, Jaccard, NormalizedAngle, NormalizedCosine, NormalizedL2, L1,
        L2,
    };
    use SimdLevel::Scalar;

    let numeric_f32: &[(Metric, DistanceFn)] = &[
        (L1, scalar::l1_f32),
        (L2, scalar::l2_f32),
        (Ip, scalar::ip_f32),
        (Cosine, scalar::cosine_f32),
        (Angle, scalar::angle_f32),
        (NormalizedL2, scalar::normalized_l2_f32),
        (NormalizedCosine, scalar::normalized_cosine_f32),
        (NormalizedAngle, scalar::normalized_angle_f32),
    ];
    for &(metric, distance_fn) in numeric_f32 {
        registry.register_builtin(
            metric,
            ElementType::Float32,
            Scalar,
            distance_fn,
            scalar::norm_f32,
            scalar::normalize_f32,
        );
    }

    let numeric_f16: &[(Metric, DistanceFn)] = &[
        (L1, scalar::l1_f16),
        (L2, scalar::l2_f16),
        (Ip, scalar::ip_f16),
        (Cosine, scalar::cosine_f16),
        (Angle, scalar::angle_f16),
        (NormalizedL2, scalar::normalized_l2_f16),
        (NormalizedCosine, scalar::normalized_cosine_f16),
        (NormalizedAngle, scalar::normalized_angle_f16),
    ];
    for &(metric, distance_fn) in numeric_f16 {
        registry.register_builtin(
            metric,
            ElementType::Float16,
            Scalar,
            distance_fn,
            scalar::norm_f16,
            scalar::normalize_f16,
        );
    }

    let numeric_u8: &[(Metric, DistanceFn)] = &[
        (L1, scalar::l1_u8),
        (L2, scalar::l2_u8),
        (Ip, scalar::ip_u8),
        (Hamming, scalar::hamming_u8),
        (Jaccard, scalar::jaccard_u8),
    ];
    for &(metric, distance_fn) in numeric_u8 {
        registry.register_builtin(
            metric,
            ElementType::Uint8,
            Scalar,
            distance_fn,
            scalar::norm_u8,
            noop_normalize,
        );
    }

    // Accelerated f32 lane: registered under Avx2 regardless of whether
    // this particular process actually has AVX2. Every backend gets
    // registered; the *vector-space factory*, not the registry, decides at
    // creation time whether the detected CPU may use a given level.
    let fast_f32: &[(Metric, DistanceFn)] = &[
        (L1, simd::l1_f32),
        (L2, simd::l2_f32),
        (Ip, simd::ip_f32),
        (Cosine, simd::cosine_f32),
        (Angle, simd::angle_f32),
        (NormalizedL2, simd::normalized_l2_f32),
        (NormalizedCosine, simd::normalized_cosine_f32),
        (NormalizedAngle, simd::normalized_angle_f32),
    ];
    for &(metric, distance_fn) in fast_f32 {
        registry.register_builtin(
            metric,
            ElementType::Float32,
            SimdLevel::Avx2,
            distance_fn,
            simd::norm_f32,
            simd::normalize_f32,
        );
    }

    registry.finish_build();

    let populated = registry
        .cells
        .read()
        .expect("registry lock poisoned")
        .iter()
        .filter(|c| c.is_some())
        .count();
    info!(
        populated_cells = populated,
        detected_simd = ?SimdLevel::detect_best_available(),
        "operator registry built-ins populated and frozen"
    );
}

static GLOBAL_REGISTRY: OnceLock<OperatorRegistry> = OnceLock::new();
static BUILTIN_INIT: Once = Once::new();

/// Returns the process-global operator registry, populating its built-in
/// cells exactly once on first access.
pub fn global_registry() -> &'static OperatorRegistry {
    let registry = GLOBAL_REGISTRY.get_or_init(OperatorRegistry::new);
    BUILTIN_INIT.call_once(|| populate_builtins(registry));
    registry
}
