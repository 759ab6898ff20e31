//! Structural type descriptors and their intern table.
//!
//! A `TypeDescriptor` is an ordered parameter list plus one return type. It
//! is immutable; every transformation returns a new descriptor.
//!
//! ## Interning
//!
//! `TypeTable` keeps one canonical allocation per distinct descriptor. Two
//! interned descriptors with the same content share an `Arc`, so equality is
//! a pointer comparison in the common case; non-interned descriptors still
//! compare structurally.

use crate::convert::{ConversionMode, plan};
use crate::error::{Error, Result};
use crate::types::ValueType;
use callweave_common::MAX_ARITY;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

#[derive(PartialEq, Eq, Hash)]
struct DescriptorData {
    ret: ValueType,
    params: Box<[ValueType]>,
}

/// Parameter types plus a return type.
#[derive(Clone)]
pub struct TypeDescriptor(Arc<DescriptorData>);

impl TypeDescriptor {
    /// Build a descriptor, rejecting `void` parameters and oversized arity.
    pub fn new(ret: ValueType, params: impl Into<Vec<ValueType>>) -> Result<Self> {
        let params = params.into();
        if params.len() > MAX_ARITY {
            return Err(Error::ArityLimit {
                requested: params.len(),
                max: MAX_ARITY,
            });
        }
        if let Some(i) = params.iter().position(ValueType::is_void) {
            return Err(Error::mismatch(format!("parameter {i} cannot be void")));
        }
        Ok(Self::from_parts(ret, params))
    }

    fn from_parts(ret: ValueType, params: Vec<ValueType>) -> Self {
        Self(Arc::new(DescriptorData {
            ret,
            params: params.into_boxed_slice(),
        }))
    }

    /// `(Object × n) -> Object`.
    pub fn generic_method_type(n: usize) -> Result<Self> {
        Self::new(ValueType::object(), vec![ValueType::object(); n])
    }

    pub fn return_type(&self) -> &ValueType {
        &self.0.ret
    }

    pub fn parameters(&self) -> &[ValueType] {
        &self.0.params
    }

    pub fn parameter_count(&self) -> usize {
        self.0.params.len()
    }

    /// Parameter `i`, or an index error.
    pub fn parameter_type(&self, i: usize) -> Result<&ValueType> {
        self.0.params.get(i).ok_or(Error::Index {
            index: i,
            limit: self.parameter_count(),
        })
    }

    pub fn last_parameter(&self) -> Option<&ValueType> {
        self.0.params.last()
    }

    /// Whether both handles share one allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn insert_parameter_types(&self, pos: usize, types: &[ValueType]) -> Result<Self> {
        check_position(pos, self.parameter_count())?;
        let mut params = Vec::with_capacity(self.parameter_count() + types.len());
        params.extend_from_slice(&self.0.params[..pos]);
        params.extend_from_slice(types);
        params.extend_from_slice(&self.0.params[pos..]);
        Self::new(self.0.ret.clone(), params)
    }

    pub fn append_parameter_types(&self, types: &[ValueType]) -> Result<Self> {
        self.insert_parameter_types(self.parameter_count(), types)
    }

    /// Remove parameters `[from, to)`.
    pub fn drop_parameter_types(&self, from: usize, to: usize) -> Result<Self> {
        check_position(to, self.parameter_count())?;
        check_position(from, to)?;
        let mut params = self.0.params.to_vec();
        params.drain(from..to);
        Ok(Self::from_parts(self.0.ret.clone(), params))
    }

    pub fn change_parameter_type(&self, i: usize, ty: ValueType) -> Result<Self> {
        self.parameter_type(i)?;
        let mut params = self.0.params.to_vec();
        params[i] = ty;
        Self::new(self.0.ret.clone(), params)
    }

    pub fn change_return_type(&self, ty: ValueType) -> Self {
        Self::from_parts(ty, self.0.params.to_vec())
    }

    /// First `n` parameters, keeping the return type.
    pub fn leading(&self, n: usize) -> Result<Self> {
        self.drop_parameter_types(n, self.parameter_count())
    }

    /// Every reference type erased to `Object`.
    pub fn generic(&self) -> Self {
        self.map_types(ValueType::erase)
    }

    /// Primitives replaced by their box classes.
    pub fn wrap(&self) -> Self {
        self.map_types(ValueType::wrap)
    }

    /// Box classes replaced by their primitives.
    pub fn unwrap(&self) -> Self {
        self.map_types(ValueType::unwrap)
    }

    fn map_types(&self, f: impl Fn(&ValueType) -> ValueType) -> Self {
        let ret = f(&self.0.ret);
        let params: Vec<_> = self.0.params.iter().map(&f).collect();
        if ret == self.0.ret && *params == *self.0.params {
            return self.clone();
        }
        Self::from_parts(ret, params)
    }

    /// Whether a callable of this type can be adapted to `other` by `as_type`.
    pub fn is_convertible_to(&self, other: &TypeDescriptor) -> bool {
        self.converts_to(other, ConversionMode::Assign)
    }

    /// Whether a callable of this type can be adapted to `other` by
    /// `explicit_cast_arguments`.
    pub fn is_castable_to(&self, other: &TypeDescriptor) -> bool {
        self.converts_to(other, ConversionMode::Explicit)
    }

    fn converts_to(&self, other: &TypeDescriptor, mode: ConversionMode) -> bool {
        self.parameter_count() == other.parameter_count()
            && other
                .parameters()
                .iter()
                .zip(self.parameters())
                .all(|(from, to)| plan(from, to, mode).is_some())
            && plan(self.return_type(), other.return_type(), mode).is_some()
    }
}

pub(crate) fn check_position(index: usize, limit: usize) -> Result<()> {
    if index > limit {
        return Err(Error::Index {
            index,
            limit: limit + 1,
        });
    }
    Ok(())
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.0.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, "){}", self.0.ret)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor{self}")
    }
}

// =============================================================================
// TypeTable
// =============================================================================

/// Concurrent intern table for descriptors.
pub struct TypeTable {
    types: DashMap<TypeDescriptor, (), FxBuildHasher>,
    hits: AtomicU64,
}

impl TypeTable {
    pub fn new() -> Self {
        Self {
            types: DashMap::with_hasher(FxBuildHasher),
            hits: AtomicU64::new(0),
        }
    }

    /// Canonical instance of `desc`, inserting it if absent.
    pub fn intern(&self, desc: TypeDescriptor) -> TypeDescriptor {
        match self.types.entry(desc) {
            Entry::Occupied(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(desc = %entry.key(), "TypeTable::intern - hit");
                entry.key().clone()
            }
            Entry::Vacant(entry) => {
                let canonical = entry.key().clone();
                entry.insert(());
                canonical
            }
        }
    }

    /// Build and intern a descriptor.
    pub fn method_type(
        &self,
        ret: ValueType,
        params: impl Into<Vec<ValueType>>,
    ) -> Result<TypeDescriptor> {
        TypeDescriptor::new(ret, params).map(|desc| self.intern(desc))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of `intern` calls that found an existing descriptor.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../tests/descriptor_tests.rs"]
mod tests;
