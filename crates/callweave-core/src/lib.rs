//! Typed callable composition.
//!
//! This crate builds immutable, statically typed function values
//! (`CallableValue`) and composes them with combinators that bind, drop,
//! permute, cast, filter, fold, collect, guard and catch. It uses:
//!
//! - **`TypeDescriptor`**: structural parameter/return types, interned in a
//!   concurrent `TypeTable`
//! - **`ShapeRegistry`**: filter-style adapters share one dispatch routine per
//!   (generic entry type, kind, position)
//! - **`Composer`**: the facade owning both caches
//!
//! Key properties:
//! - Every combinator validates types once, at composition time
//! - Static dispatch routines up to `MAX_STATIC_SHAPE_ARITY` arguments, with an
//!   opt-in synthesizer above that
pub mod callable;
mod compose;
mod compose_filters;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod error;
mod invokers;
pub mod shape;
pub mod types;
pub mod value;

pub use callable::{CallableValue, LeafFn};
pub use compose::Composer;
pub use config::ComposerConfig;
pub use convert::ConversionMode;
pub use descriptor::{TypeDescriptor, TypeTable};
pub use error::{Error, Result};
pub use shape::{
    AdapterInstance, AdapterShape, DispatchFn, FilterKind, RegistryStats, ShapeOrigin,
    ShapeRegistry, ShapeSynthesizer, SpreadingSynthesizer, StaticShapes,
};
pub use types::{ClassFlags, ClassRef, Primitive, ValueType};
pub use value::{ArrayValue, ObjectValue, Value};

pub use callweave_common::{MAX_ARITY, MAX_STATIC_SHAPE_ARITY};
