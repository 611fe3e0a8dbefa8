//! Post-processing of jet-stability data: aligns a steady RANS mean flow with
//! a frequency-domain PSE perturbation, converts between the two
//! dimensionless conventions and superposes them into a time-resolved total
//! field.

pub mod ambient;
pub mod case;
pub mod config;
pub mod context;
pub mod conversion;
pub mod error;
pub mod export;
pub mod grid;
pub mod mean_flow;
pub mod perturbation;
pub mod quantity;
pub mod query;
pub mod reference;
pub mod spline;
pub mod stability;
pub mod storage;
pub mod visualisation;

pub use ambient::AmbientConditions;
pub use case::CaseSelector;
pub use context::FieldContext;
pub use conversion::{ConversionTable, PressureScaling};
pub use error::{FieldError, Result};
pub use grid::{AxialGrid, FieldGrid, RadialGrid};
pub use mean_flow::MeanFlowField;
pub use perturbation::StabilityPerturbationField;
pub use quantity::{Component, FieldKey, FieldSet, Quantity};
pub use reference::{ReferenceCatalog, ReferenceState};
pub use stability::StabilityPhase;
pub use storage::{DataDirectory, FieldStore, MemoryStore};
