//! # `vectorstore-core`
//!
//! In-memory storage substrate of a vector-search engine: a compact,
//! reusable mapping between externally visible labels and internal
//! densely-packed local ids, batched alignment-correct storage of
//! fixed-width vector payloads, and a pluggable family of
//! distance/normalization kernels selected at runtime by
//! `(metric, element type, instruction-set capability)`.
//!
//! This crate has no CLI, no file format, no wire protocol, and performs
//! no background compaction itself — it exposes the metrics (`hole_ratio`,
//! `zombie_ratio`) an external coordinator needs to decide when to rebuild,
//! and a `snapshot_id` readers use to detect concurrent writes.
//!
//! ## Quick start
//!
//! ```rust
//! use vectorstore_core::{
//!     config::{SpaceConfig, StoreConfig},
//!     registry::global_registry,
//!     store::MemoryStore,
//!     types::{ElementType, Metric, SimdLevel},
//! };
//!
//! let config = StoreConfig {
//!     reserved: 0,
//!     batch_size: 1024,
//!     max_elements: 1_000_000,
//!     space: SpaceConfig {
//!         dim: 128,
//!         metric: Metric::Cosine,
//!         element_type: ElementType::Float32,
//!         simd_level: SimdLevel::Scalar,
//!     },
//! };
//! let store = MemoryStore::new(config, global_registry()).unwrap();
//! let bytes: Vec<u8> = vec![0u8; 128 * 4];
//! let lid = store.add(1, 42, &bytes).unwrap();
//! assert_eq!(store.get_vector_by_id(lid).unwrap(), bytes);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod error;
pub mod id_manager;
pub mod kernels;
pub mod registry;
pub mod space;
pub mod store;
pub mod types;
pub mod vector_store;

pub use config::{SpaceConfig, StoreConfig};
pub use error::{Error, Result};
pub use id_manager::{IdentifierManager, LabelEntity};
pub use registry::{global_registry, OperatorEntity, OperatorRegistry};
pub use space::VectorSpace;
pub use store::{MemoryStore, MemoryStoreHandle};
pub use types::{ElementType, Metric, SimdLevel};
