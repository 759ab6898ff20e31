//! Composition facade.
//!
//! A `Composer` owns the two shared caches (the descriptor intern table and
//! the shape registry) and exposes every combinator. All validation happens
//! here, at composition time; the callables it returns never re-check types
//! when invoked.
//!
//! This file holds the simple combinators. The filter family lives in
//! `compose_filters.rs` and invokers/spreaders/array accessors in
//! `invokers.rs`.

use crate::callable::{CallableValue, Form};
use crate::config::ComposerConfig;
use crate::convert::{ConversionMode, assign_value};
use crate::descriptor::{TypeDescriptor, TypeTable, check_position};
use crate::error::{Error, Result};
use crate::shape::{ShapeRegistry, ShapeSynthesizer, SpreadingSynthesizer};
use crate::types::{ClassRef, Primitive, ValueType};
use crate::value::Value;
use std::sync::Arc;
use tracing::trace;

/// Entry point for building callables.
///
/// Cloning a `Composer` shares its caches.
#[derive(Clone)]
pub struct Composer {
    types: Arc<TypeTable>,
    shapes: Arc<ShapeRegistry>,
    config: ComposerConfig,
}

impl Composer {
    pub fn new() -> Self {
        Self::with_config(ComposerConfig::default())
    }

    pub fn with_config(config: ComposerConfig) -> Self {
        let shapes = if config.dynamic_shapes {
            ShapeRegistry::with_synthesizer(Arc::new(SpreadingSynthesizer))
        } else {
            ShapeRegistry::new()
        };
        Self::from_parts(Arc::new(TypeTable::new()), Arc::new(shapes), config)
    }

    /// Composer whose registry falls back to `synthesizer` above the static table.
    pub fn with_synthesizer(config: ComposerConfig, synthesizer: Arc<dyn ShapeSynthesizer>) -> Self {
        Self::from_parts(
            Arc::new(TypeTable::new()),
            Arc::new(ShapeRegistry::with_synthesizer(synthesizer)),
            config,
        )
    }

    /// Composer over existing caches.
    pub fn from_parts(
        types: Arc<TypeTable>,
        shapes: Arc<ShapeRegistry>,
        config: ComposerConfig,
    ) -> Self {
        Self {
            types,
            shapes,
            config,
        }
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn shapes(&self) -> &ShapeRegistry {
        &self.shapes
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Build a descriptor, interned when configured.
    pub fn method_type(
        &self,
        ret: ValueType,
        params: impl Into<Vec<ValueType>>,
    ) -> Result<TypeDescriptor> {
        TypeDescriptor::new(ret, params).map(|ty| self.intern(ty))
    }

    pub(crate) fn intern(&self, ty: TypeDescriptor) -> TypeDescriptor {
        if self.config.intern_types {
            self.types.intern(ty)
        } else {
            ty
        }
    }

    pub(crate) fn build(&self, op: &'static str, ty: TypeDescriptor, form: Form) -> CallableValue {
        let ty = self.intern(ty);
        trace!(op, ty = %ty, "Composer::build");
        CallableValue::new(ty, form)
    }

    /// Leaf callable running `body`. The body receives arguments that match
    /// `ty` and must return a value of `ty`'s return type.
    pub fn from_fn(
        &self,
        name: &str,
        ty: &TypeDescriptor,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> CallableValue {
        CallableValue::leaf(name, self.intern(ty.clone()), body)
    }

    // =========================================================================
    // Binding and dropping
    // =========================================================================

    /// Bind `values` to the consecutive parameters starting at `pos`.
    pub fn insert_arguments(
        &self,
        target: &CallableValue,
        pos: usize,
        values: Vec<Value>,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        let arity = ty.parameter_count();
        if values.len() > arity {
            return Err(Error::mismatch("too many values to insert"));
        }
        check_position(pos, arity - values.len())?;
        if values.is_empty() {
            return Ok(target.clone());
        }
        let values = values
            .into_iter()
            .zip(&ty.parameters()[pos..])
            .map(|(value, param)| assign_value(value, param))
            .collect::<Result<Arc<[Value]>>>()?;
        let new_type = ty.drop_parameter_types(pos, pos + values.len())?;
        Ok(self.build(
            "insert_arguments",
            new_type,
            Form::Bound {
                target: target.clone(),
                pos,
                values,
            },
        ))
    }

    /// Bind the leading reference parameter to `value`.
    pub fn bind_to(&self, target: &CallableValue, value: Value) -> Result<CallableValue> {
        match target.type_descriptor().parameters().first() {
            Some(ValueType::Ref(_)) => self.insert_arguments(target, 0, vec![value]),
            _ => Err(Error::mismatch(format!(
                "no leading reference parameter: {}",
                target.type_descriptor()
            ))),
        }
    }

    /// Accept and ignore extra parameters of `types` at `pos`.
    pub fn drop_arguments(
        &self,
        target: &CallableValue,
        pos: usize,
        types: &[ValueType],
    ) -> Result<CallableValue> {
        if types.is_empty() {
            return Ok(target.clone());
        }
        let new_type = target.type_descriptor().insert_parameter_types(pos, types)?;
        Ok(self.build(
            "drop_arguments",
            new_type,
            Form::Dropped {
                target: target.clone(),
                pos,
                count: types.len(),
            },
        ))
    }

    /// Call `target` with `args[reorder[i]]` as its i-th argument.
    ///
    /// Indices may repeat or be omitted; types must match exactly.
    pub fn permute_arguments(
        &self,
        target: &CallableValue,
        new_type: &TypeDescriptor,
        reorder: &[usize],
    ) -> Result<CallableValue> {
        let old_type = target.type_descriptor();
        if old_type.return_type() != new_type.return_type() {
            return Err(Error::mismatched_types("return types", old_type, new_type));
        }
        if reorder.len() != old_type.parameter_count() {
            return Err(Error::mismatch(format!(
                "bad reorder array: {} entries for {old_type}",
                reorder.len()
            )));
        }
        for (i, (&j, param)) in reorder.iter().zip(old_type.parameters()).enumerate() {
            let Some(source) = new_type.parameters().get(j) else {
                return Err(Error::mismatch(format!(
                    "index {j} is out of bounds for new type {new_type}"
                )));
            };
            if source != param {
                return Err(Error::mismatch(format!(
                    "parameter types must match after reorder: argument {i} is {param} but {new_type} has {source} at {j}"
                )));
            }
        }
        Ok(self.build(
            "permute_arguments",
            new_type.clone(),
            Form::Permuted {
                target: target.clone(),
                reorder: reorder.into(),
            },
        ))
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Adapt with explicit-cast rules.
    pub fn explicit_cast_arguments(
        &self,
        target: &CallableValue,
        new_type: &TypeDescriptor,
    ) -> Result<CallableValue> {
        target.convert_to(&self.intern(new_type.clone()), ConversionMode::Explicit)
    }

    /// Adapt with assignment rules. A varargs collector first collects its
    /// trailing arguments unless `new_type` already passes the array.
    pub fn as_type(&self, target: &CallableValue, new_type: &TypeDescriptor) -> Result<CallableValue> {
        target.adapt_to(&self.intern(new_type.clone()))
    }

    // =========================================================================
    // Constants
    // =========================================================================

    /// `() -> ty` returning `value`.
    pub fn constant(&self, ty: ValueType, value: Value) -> Result<CallableValue> {
        if ty.is_void() {
            return Err(Error::mismatch("constant cannot be void"));
        }
        let value = assign_value(value, &ty)?;
        let new_type = TypeDescriptor::new(ty, Vec::new())?;
        Ok(self.build("constant", new_type, Form::Constant(value)))
    }

    /// `(ty) -> ty` returning its argument.
    pub fn identity(&self, ty: ValueType) -> Result<CallableValue> {
        if ty.is_void() {
            return Err(Error::mismatch("identity cannot be void"));
        }
        let new_type = TypeDescriptor::new(ty.clone(), vec![ty])?;
        Ok(self.build("identity", new_type, Form::Identity))
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    /// `target(args)` when `test(prefix(args))` is true, else `fallback(args)`.
    pub fn guard_with_test(
        &self,
        test: &CallableValue,
        target: &CallableValue,
        fallback: &CallableValue,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        if ty != fallback.type_descriptor() {
            return Err(Error::mismatched_types(
                "target and fallback types",
                ty,
                fallback.type_descriptor(),
            ));
        }
        if *test.return_type() != ValueType::Prim(Primitive::Boolean) {
            return Err(Error::mismatch(format!(
                "guard type is not a predicate: {}",
                test.type_descriptor()
            )));
        }
        if !is_prefix(test.type_descriptor().parameters(), ty.parameters()) {
            return Err(Error::mismatched_types(
                "target and test types",
                ty,
                test.type_descriptor(),
            ));
        }
        Ok(self.build(
            "guard_with_test",
            ty.clone(),
            Form::Guard {
                test: test.clone(),
                target: target.clone(),
                fallback: fallback.clone(),
            },
        ))
    }

    /// Run `target`; a throwable assignable to `ex_type` is passed to
    /// `handler` along with a prefix of the original arguments.
    pub fn catch_exception(
        &self,
        target: &CallableValue,
        ex_type: &ClassRef,
        handler: &CallableValue,
    ) -> Result<CallableValue> {
        if !ex_type.is_throwable() {
            return Err(Error::mismatch(format!("{ex_type} is not a throwable class")));
        }
        let ty = target.type_descriptor();
        let handler_ty = handler.type_descriptor();
        let accepts_exception = match handler_ty.parameters().first() {
            Some(ValueType::Ref(class)) => class.is_assignable_from(ex_type),
            _ => false,
        };
        if !accepts_exception {
            return Err(Error::mismatch(format!(
                "handler {handler_ty} does not accept {ex_type}"
            )));
        }
        if handler_ty.return_type() != ty.return_type()
            || !is_prefix(&handler_ty.parameters()[1..], ty.parameters())
        {
            return Err(Error::mismatched_types("target and handler types", ty, handler_ty));
        }
        Ok(self.build(
            "catch_exception",
            ty.clone(),
            Form::Catch {
                target: target.clone(),
                ex_type: ex_type.clone(),
                handler: handler.clone(),
            },
        ))
    }

    /// `(ex_type) -> ret` that throws its argument.
    pub fn throw_exception(&self, ret: ValueType, ex_type: &ClassRef) -> Result<CallableValue> {
        if !ex_type.is_throwable() {
            return Err(Error::mismatch(format!("{ex_type} is not a throwable class")));
        }
        let new_type = TypeDescriptor::new(ret, vec![ValueType::Ref(ex_type.clone())])?;
        Ok(self.build("throw_exception", new_type, Form::Throw))
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn is_prefix(prefix: &[ValueType], full: &[ValueType]) -> bool {
    prefix.len() <= full.len() && prefix == &full[..prefix.len()]
}

#[cfg(test)]
#[path = "../tests/compose_tests.rs"]
mod tests;
