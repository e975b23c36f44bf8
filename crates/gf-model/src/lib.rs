//! gf-model: grid entity model and segmentation for gridflow.
//!
//! Provides:
//! - Grid entities (buses, lines, transformers, generators, loads, storage units)
//!   shared between the combined model and its segments
//! - Incremental model builder with validation
//! - Segmentation of a combined model into independent connected sub-models
//! - Key-set signatures and diffs used to decide what needs recomputation
//! - Section combination and the YAML grid file schema
//!
//! # Example
//!
//! ```
//! use gf_model::{Bus, Entity, Line, ModelBuilder, segment};
//!
//! let mut builder = ModelBuilder::new();
//! builder.add_bus(Bus::new("a", 20.0));
//! builder.add_bus(Bus::new("b", 20.0));
//! builder.add_bus(Bus::new("c", 20.0));
//! let ab = builder.add_line(Line::new("ab", "a", "b"));
//! let model = builder.build().unwrap();
//!
//! assert_eq!(segment(&model).len(), 2);
//!
//! ab.write().set_active(false);
//! assert_eq!(segment(&model).len(), 3);
//! ```

pub mod builder;
pub mod combine;
pub mod diff;
pub mod entity;
pub mod error;
pub mod indexing;
pub mod model;
pub mod schema;
pub mod segment;
pub mod signature;
pub mod snapshot;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::ModelBuilder;
pub use combine::combine;
pub use diff::ModelDiff;
pub use entity::{
    Branch, Bus, BusControl, Entity, EntityKey, Generator, Injection, Line, Load, Outputs, Shared,
    StorageUnit, Transformer, TransformerModel, shared,
};
pub use error::{ModelError, ModelResult};
pub use indexing::{Adjacency, BusIndex};
pub use model::Model;
pub use schema::{GridDef, load_grid_yaml, parse_grid_yaml, save_grid_yaml};
pub use segment::{SegmentationStats, segment, segment_with_stats, verify_partition};
pub use signature::{ModelSignature, compare_model_structure, compare_model_components};
pub use snapshot::{Snapshot, Snapshots};
