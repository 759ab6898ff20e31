//! Adapter shape registry.
//!
//! Filter-style adapters (value filters, folds, collectors, flybys) share
//! their dispatch code by *shape*: the generic view of the adapter's entry
//! type plus the adapter kind and position. The registry builds each shape
//! at most once and hands the same `Arc<AdapterShape>` to every adapter of
//! that shape; each adapter only adds its own filter and target
//! (`AdapterInstance`).
//!
//! ## Layout
//!
//! ```text
//! DashMap<generic entry type, Arc<ShapeTable>>
//!                               └─ (arity + 1) × KIND_COUNT OnceCell slots
//! ```
//!
//! Slots are write-once. A slot is published only after its shape is built;
//! failed resolutions leave the slot empty.
//!
//! ## Resolution
//!
//! | Arity | Source |
//! |-------|--------|
//! | `<= MAX_STATIC_SHAPE_ARITY` | `StaticShapes` table of monomorphised routines |
//! | above | configured `ShapeSynthesizer`, else `UnsupportedShape` |

mod dispatch;
mod synth;

pub use dispatch::StaticShapes;
pub use synth::SpreadingSynthesizer;

use crate::callable::CallableValue;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::value::Value;
use callweave_common::MAX_STATIC_SHAPE_ARITY;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

// =============================================================================
// FilterKind
// =============================================================================

/// What an adapter does with its filter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Replace argument P with `filter(argP)`.
    Value,
    /// Prepend `combiner(args[..P])` unless it returns void.
    Fold,
    /// Replace `args[P..]` with `collector(args[P..])`, or nothing if void.
    Collect,
    /// Pass every argument to the filter as one mutable `Object[]`.
    Flyby,
}

impl FilterKind {
    pub const COUNT: usize = 4;

    pub const ALL: [FilterKind; Self::COUNT] =
        [Self::Value, Self::Fold, Self::Collect, Self::Flyby];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Value => "filter_value",
            Self::Fold => "fold",
            Self::Collect => "collect",
            Self::Flyby => "flyby",
        }
    }

    /// Whether `position` is a legal adapter position over `arity` arguments.
    pub const fn accepts_position(self, arity: usize, position: usize) -> bool {
        match self {
            Self::Value => position < arity,
            Self::Fold | Self::Collect => position <= arity,
            Self::Flyby => position == 0,
        }
    }

    /// Exclusive upper bound on positions, for error reporting.
    const fn position_limit(self, arity: usize) -> usize {
        match self {
            Self::Value => arity,
            Self::Fold | Self::Collect => arity + 1,
            Self::Flyby => 1,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "VALUE",
            Self::Fold => "FOLD",
            Self::Collect => "COLLECT",
            Self::Flyby => "FLYBY",
        })
    }
}

// =============================================================================
// Shapes and instances
// =============================================================================

/// Dispatch routine shared by every adapter of one shape.
pub type DispatchFn = fn(&AdapterInstance, &[Value]) -> Result<Value>;

/// Where a shape's dispatch routine came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ShapeOrigin {
    Static,
    Synthesized(&'static str),
}

impl fmt::Display for ShapeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("static"),
            Self::Synthesized(name) => write!(f, "synthesized({name})"),
        }
    }
}

/// A cached adapter template: one per (generic entry type, kind, position).
pub struct AdapterShape {
    entry: TypeDescriptor,
    kind: FilterKind,
    position: usize,
    origin: ShapeOrigin,
    dispatch: DispatchFn,
}

impl AdapterShape {
    /// Generic entry type keying this shape.
    pub fn entry(&self) -> &TypeDescriptor {
        &self.entry
    }

    pub fn arity(&self) -> usize {
        self.entry.parameter_count()
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn origin(&self) -> ShapeOrigin {
        self.origin
    }

    pub fn dispatch(&self) -> DispatchFn {
        self.dispatch
    }
}

impl fmt::Debug for AdapterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterShape")
            .field("entry", &self.entry)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("origin", &self.origin)
            .finish()
    }
}

/// A shape configured with a concrete filter and target.
#[derive(Clone)]
pub struct AdapterInstance {
    shape: Arc<AdapterShape>,
    filter: CallableValue,
    target: CallableValue,
}

impl AdapterInstance {
    pub fn new(shape: Arc<AdapterShape>, filter: CallableValue, target: CallableValue) -> Self {
        Self {
            shape,
            filter,
            target,
        }
    }

    pub fn shape(&self) -> &AdapterShape {
        &self.shape
    }

    pub(crate) fn shape_arc(&self) -> &Arc<AdapterShape> {
        &self.shape
    }

    /// The filter, combiner or collector.
    pub fn filter(&self) -> &CallableValue {
        &self.filter
    }

    pub fn target(&self) -> &CallableValue {
        &self.target
    }

    pub fn position(&self) -> usize {
        self.shape.position
    }

    pub(crate) fn dispatch(&self, args: &[Value]) -> Result<Value> {
        (self.shape.dispatch)(self, args)
    }
}

/// Source of dispatch routines for shapes without a static entry.
///
/// A returned routine must implement the kind's effect for any argument
/// slice whose length equals `entry.parameter_count()`.
pub trait ShapeSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn synthesize(
        &self,
        entry: &TypeDescriptor,
        kind: FilterKind,
        position: usize,
    ) -> Result<DispatchFn>;
}

// =============================================================================
// ShapeRegistry
// =============================================================================

struct ShapeTable {
    slots: Box<[OnceCell<Arc<AdapterShape>>]>,
}

impl ShapeTable {
    fn new(arity: usize) -> Self {
        Self {
            slots: (0..(arity + 1) * FilterKind::COUNT)
                .map(|_| OnceCell::new())
                .collect(),
        }
    }

    fn slot(&self, kind: FilterKind, position: usize) -> &OnceCell<Arc<AdapterShape>> {
        &self.slots[position * FilterKind::COUNT + kind.index()]
    }
}

/// Registry counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Distinct generic entry types seen.
    pub tables: usize,
    /// Shapes built.
    pub shapes: usize,
    /// Adapter instances created.
    pub instances: usize,
}

/// Process-lifetime cache of adapter shapes.
pub struct ShapeRegistry {
    tables: DashMap<TypeDescriptor, Arc<ShapeTable>, FxBuildHasher>,
    synthesizer: Option<Arc<dyn ShapeSynthesizer>>,
    shapes: AtomicUsize,
    instances: AtomicUsize,
}

impl ShapeRegistry {
    /// Registry limited to the static shape table.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Registry that falls back to `synthesizer` above the static table.
    pub fn with_synthesizer(synthesizer: Arc<dyn ShapeSynthesizer>) -> Self {
        Self::build(Some(synthesizer))
    }

    fn build(synthesizer: Option<Arc<dyn ShapeSynthesizer>>) -> Self {
        Self {
            tables: DashMap::with_hasher(FxBuildHasher),
            synthesizer,
            shapes: AtomicUsize::new(0),
            instances: AtomicUsize::new(0),
        }
    }

    pub fn synthesizer_name(&self) -> Option<&'static str> {
        self.synthesizer.as_ref().map(|s| s.name())
    }

    /// The shared shape for (`entry.generic()`, `kind`, `position`).
    pub fn shape(
        &self,
        entry: &TypeDescriptor,
        kind: FilterKind,
        position: usize,
    ) -> Result<Arc<AdapterShape>> {
        let key = entry.generic();
        let arity = key.parameter_count();
        if !kind.accepts_position(arity, position) {
            return Err(Error::Index {
                index: position,
                limit: kind.position_limit(arity),
            });
        }

        // Clone the table out so no map guard is held while building.
        let existing = self.tables.get(&key).map(|table| table.value().clone());
        let table = match existing {
            Some(table) => table,
            None => self
                .tables
                .entry(key.clone())
                .or_insert_with(|| Arc::new(ShapeTable::new(arity)))
                .clone(),
        };

        table
            .slot(kind, position)
            .get_or_try_init(|| self.resolve(key, kind, position))
            .cloned()
    }

    fn resolve(
        &self,
        entry: TypeDescriptor,
        kind: FilterKind,
        position: usize,
    ) -> Result<Arc<AdapterShape>> {
        let arity = entry.parameter_count();
        let (dispatch, origin) = if arity <= MAX_STATIC_SHAPE_ARITY {
            (
                StaticShapes.synthesize(&entry, kind, position)?,
                ShapeOrigin::Static,
            )
        } else if let Some(synthesizer) = &self.synthesizer {
            (
                synthesizer.synthesize(&entry, kind, position)?,
                ShapeOrigin::Synthesized(synthesizer.name()),
            )
        } else {
            return Err(Error::UnsupportedShape {
                arity,
                kind,
                position,
            });
        };
        self.shapes.fetch_add(1, Ordering::Relaxed);
        debug!(
            entry = %entry,
            kind = %kind,
            position,
            origin = %origin,
            "ShapeRegistry::resolve"
        );
        Ok(Arc::new(AdapterShape {
            entry,
            kind,
            position,
            origin,
            dispatch,
        }))
    }

    /// Resolve the shape and configure it with `filter` and `target`.
    pub fn instantiate(
        &self,
        entry: &TypeDescriptor,
        kind: FilterKind,
        position: usize,
        filter: CallableValue,
        target: CallableValue,
    ) -> Result<AdapterInstance> {
        let shape = self.shape(entry, kind, position)?;
        self.instances.fetch_add(1, Ordering::Relaxed);
        Ok(AdapterInstance::new(shape, filter, target))
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            tables: self.tables.len(),
            shapes: self.shapes.load(Ordering::Relaxed),
            instances: self.instances.load(Ordering::Relaxed),
        }
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/shape_registry_tests.rs"]
mod tests;
