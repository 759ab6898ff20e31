//! Common constants shared across the callweave crates.
//!
//! This crate provides foundational values used by every other crate:
//! - Arity ceilings for type descriptors and adapter shapes
//! - Inline buffer sizes for argument spreading

// Centralized limits and thresholds
pub mod limits;
pub use limits::{INLINE_ARGS, MAX_ARITY, MAX_STATIC_SHAPE_ARITY};
