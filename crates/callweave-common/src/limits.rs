//! Centralized limits for the composition engine.
//!
//! Every arity ceiling lives here so that descriptor validation, the shape
//! registry and the dispatch buffers agree on the same numbers.
//!
//! # Categories
//!
//! - **Descriptor limits**: how many parameters a type descriptor may carry
//! - **Shape limits**: which arities have a statically generated dispatch row
//! - **Buffer sizes**: inline capacities for argument spreading

// =============================================================================
// Descriptor Limits
// =============================================================================

/// Maximum number of parameters a type descriptor may declare.
///
/// Every descriptor transformation (`insert_parameter_types`,
/// `drop_arguments`, the invoker builders that prepend a callable slot)
/// fails with `ArityLimit` when its result would exceed this count.
///
/// # Example
///
/// ```text
/// generic_method_type(255)                        // ok
/// generic_method_type(255).insert_parameter_types(0, [int])
/// //  ~~~ ArityLimit { requested: 256, max: 255 }
/// ```
pub const MAX_ARITY: usize = 255;

// =============================================================================
// Shape Limits
// =============================================================================

/// Highest entry arity covered by the static dispatch table.
///
/// The shape registry resolves `(arity, kind)` pairs up to and including this
/// arity from a table of monomorphised routines. Above it, resolution is
/// delegated to a configured synthesizer, or fails with `UnsupportedShape`
/// when none is installed.
///
/// # Example
///
/// ```text
/// filter_arguments(target_with_20_params, 0, [f])   // static shape
/// filter_arguments(target_with_21_params, 0, [f])   // synthesizer or UnsupportedShape
/// ```
pub const MAX_STATIC_SHAPE_ARITY: usize = 20;

// =============================================================================
// Buffer Sizes
// =============================================================================

/// Inline capacity of argument buffers built while spreading arguments.
///
/// One more than [`MAX_STATIC_SHAPE_ARITY`]: a FOLD or COLLECT adapter may
/// hand its target one extra argument. Buffers up to this size never touch
/// the heap.
pub const INLINE_ARGS: usize = MAX_STATIC_SHAPE_ARITY + 1;
