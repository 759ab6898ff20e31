//! Immutable typed function values.
//!
//! A `CallableValue` pairs a `TypeDescriptor` with a `Form`: either a leaf
//! closure supplied by the embedder or a composed form that owns its
//! delegate callables. Composition validates types once; `call` trusts them
//! and never re-checks.

use crate::convert::{Conversion, ConversionMode, assign_value, plan};
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::shape::{AdapterInstance, AdapterShape};
use crate::types::{ClassRef, ValueType};
use crate::value::Value;
use callweave_common::INLINE_ARGS;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Argument buffer that stays on the stack for every static shape arity.
pub(crate) type ArgBuffer = SmallVec<[Value; INLINE_ARGS]>;

/// Body of a leaf callable.
pub type LeafFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum InvokerKind {
    Exact,
    General,
    /// Trailing `Object[]` spread after `leading` positional arguments.
    Spread { leading: usize },
}

#[derive(Clone)]
pub(crate) enum Form {
    Leaf {
        name: Arc<str>,
        body: Arc<LeafFn>,
    },
    Bound {
        target: CallableValue,
        pos: usize,
        values: Arc<[Value]>,
    },
    Dropped {
        target: CallableValue,
        pos: usize,
        count: usize,
    },
    Permuted {
        target: CallableValue,
        reorder: Arc<[usize]>,
    },
    Converted {
        target: CallableValue,
        args: Arc<[Conversion]>,
        ret: Conversion,
    },
    Constant(Value),
    Identity,
    Guard {
        test: CallableValue,
        target: CallableValue,
        fallback: CallableValue,
    },
    Catch {
        target: CallableValue,
        ex_type: ClassRef,
        handler: CallableValue,
    },
    Throw,
    Adapter(AdapterInstance),
    ArrayGet,
    ArraySet,
    /// Packs every argument into a fresh array.
    NewArray {
        element: ValueType,
    },
    Invoker {
        kind: InvokerKind,
        target_type: TypeDescriptor,
    },
    /// Spreads a trailing array into `count` arguments of `target`.
    Spreader {
        target: CallableValue,
        count: usize,
    },
    /// Packs the arguments after the fixed prefix into the trailing array
    /// parameter of a varargs `target`.
    Collecting {
        target: CallableValue,
        element: ValueType,
    },
}

impl Form {
    fn label(&self) -> &str {
        match self {
            Self::Leaf { name, .. } => &name[..],
            Self::Bound { .. } => "bound",
            Self::Dropped { .. } => "dropped",
            Self::Permuted { .. } => "permuted",
            Self::Converted { .. } => "converted",
            Self::Constant(_) => "constant",
            Self::Identity => "identity",
            Self::Guard { .. } => "guard",
            Self::Catch { .. } => "catch",
            Self::Throw => "throw",
            Self::Adapter(instance) => instance.shape().kind().label(),
            Self::ArrayGet => "array_get",
            Self::ArraySet => "array_set",
            Self::NewArray { .. } => "new_array",
            Self::Invoker { kind, .. } => match kind {
                InvokerKind::Exact => "exact_invoker",
                InvokerKind::General => "invoker",
                InvokerKind::Spread { .. } => "spread_invoker",
            },
            Self::Spreader { .. } => "spreader",
            Self::Collecting { .. } => "collecting",
        }
    }
}

struct CallableData {
    ty: TypeDescriptor,
    varargs: bool,
    form: Form,
}

/// A typed, immutable function value.
#[derive(Clone)]
pub struct CallableValue(Arc<CallableData>);

impl CallableValue {
    pub(crate) fn new(ty: TypeDescriptor, form: Form) -> Self {
        Self(Arc::new(CallableData {
            ty,
            varargs: false,
            form,
        }))
    }

    /// Leaf callable running `body` with the arguments of `ty`.
    pub(crate) fn leaf(
        name: impl Into<Arc<str>>,
        ty: TypeDescriptor,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            ty,
            Form::Leaf {
                name: name.into(),
                body: Arc::new(body),
            },
        )
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.0.ty
    }

    pub fn arity(&self) -> usize {
        self.0.ty.parameter_count()
    }

    pub fn return_type(&self) -> &ValueType {
        self.0.ty.return_type()
    }

    pub fn is_varargs_collector(&self) -> bool {
        self.0.varargs
    }

    /// Leaf name or form label.
    pub fn name(&self) -> &str {
        self.0.form.label()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The shape behind an adapter built by the filter family.
    pub fn adapter_shape(&self) -> Option<&Arc<AdapterShape>> {
        match &self.0.form {
            Form::Adapter(instance) => Some(instance.shape_arc()),
            _ => None,
        }
    }

    /// Same behaviour and type with the variable-arity flag set to `varargs`.
    pub(crate) fn with_varargs(&self, varargs: bool) -> Self {
        if self.0.varargs == varargs {
            return self.clone();
        }
        Self(Arc::new(CallableData {
            ty: self.0.ty.clone(),
            varargs,
            form: self.0.form.clone(),
        }))
    }

    /// Adapt to `new_type` with assignment rules. A varargs collector keeps
    /// its fixed arity only when `new_type` has the same arity and its last
    /// parameter is assignable to the array parameter; otherwise the trailing
    /// arguments are collected first.
    pub(crate) fn adapt_to(&self, new_type: &TypeDescriptor) -> Result<Self> {
        let Some(element) = self.trailing_array() else {
            return self.convert_to(new_type, ConversionMode::Assign);
        };
        let params = self.0.ty.parameters();
        let array_param = &params[params.len() - 1];
        let fixed_arity = new_type.parameter_count() == params.len()
            && match (array_param, new_type.last_parameter()) {
                (ValueType::Ref(array), Some(ValueType::Ref(last))) => {
                    array.is_assignable_from(last)
                }
                _ => false,
            };
        if fixed_arity {
            return self.convert_to(new_type, ConversionMode::Assign);
        }
        let fixed = params.len() - 1;
        let Some(count) = new_type.parameter_count().checked_sub(fixed) else {
            return Err(Error::mismatched_types(
                "varargs arity",
                &self.0.ty,
                new_type,
            ));
        };
        let mut collected_params = Vec::with_capacity(fixed + count);
        collected_params.extend_from_slice(&params[..fixed]);
        collected_params.extend(std::iter::repeat_n(element.clone(), count));
        let collected_type = TypeDescriptor::new(self.0.ty.return_type().clone(), collected_params)?;
        let collected = Self::new(
            collected_type,
            Form::Collecting {
                target: self.with_varargs(false),
                element: element.clone(),
            },
        );
        collected.convert_to(new_type, ConversionMode::Assign)
    }

    /// Adapt to `new_type` by converting each argument and the result.
    pub(crate) fn convert_to(&self, new_type: &TypeDescriptor, mode: ConversionMode) -> Result<Self> {
        if self.0.ty == *new_type {
            return Ok(self.clone());
        }
        let old = &self.0.ty;
        let incompatible = || {
            Error::mismatch(format!("cannot convert {old} to {new_type}"))
        };
        if old.parameter_count() != new_type.parameter_count() {
            return Err(incompatible());
        }
        let args = new_type
            .parameters()
            .iter()
            .zip(old.parameters())
            .map(|(from, to)| plan(from, to, mode))
            .collect::<Option<Arc<[Conversion]>>>()
            .ok_or_else(incompatible)?;
        let ret = plan(old.return_type(), new_type.return_type(), mode).ok_or_else(incompatible)?;
        Ok(Self::new(
            new_type.clone(),
            Form::Converted {
                target: self.clone(),
                args,
                ret,
            },
        ))
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Invoke with arguments that already match the parameter types.
    pub fn invoke_exact(&self, args: &[Value]) -> Result<Value> {
        self.check_count(args.len())?;
        for (arg, ty) in args.iter().zip(self.0.ty.parameters()) {
            if !ty.accepts(arg) {
                return Err(Error::conversion(arg, ty));
            }
        }
        self.call(args)
    }

    /// Invoke converting each argument with assignment rules. A varargs
    /// collector gathers surplus trailing arguments into its array parameter.
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        let params = self.0.ty.parameters();
        let collected;
        let args = match self.trailing_array() {
            Some(element) if needs_collection(params, args) => {
                let fixed = params.len() - 1;
                if args.len() < fixed {
                    return Err(Error::WrongArgumentCount {
                        expected: fixed,
                        found: args.len(),
                    });
                }
                let mut full: ArgBuffer = args[..fixed].iter().cloned().collect();
                let rest = args[fixed..]
                    .iter()
                    .map(|arg| assign_value(arg.clone(), element))
                    .collect::<Result<Vec<_>>>()?;
                full.push(Value::array(element.clone(), rest));
                collected = full;
                &collected[..]
            }
            _ => args,
        };
        self.check_count(args.len())?;
        let converted = args
            .iter()
            .zip(params)
            .map(|(arg, ty)| assign_value(arg.clone(), ty))
            .collect::<Result<ArgBuffer>>()?;
        self.call(&converted)
    }

    /// Owning form of [`CallableValue::invoke`].
    pub fn invoke_with_arguments(&self, args: Vec<Value>) -> Result<Value> {
        self.invoke(&args)
    }

    fn trailing_array(&self) -> Option<&ValueType> {
        if !self.0.varargs {
            return None;
        }
        self.0
            .ty
            .last_parameter()
            .and_then(ValueType::class)
            .and_then(ClassRef::component)
    }

    fn check_count(&self, found: usize) -> Result<()> {
        let expected = self.arity();
        if found != expected {
            return Err(Error::WrongArgumentCount { expected, found });
        }
        Ok(())
    }

    /// Run the callable on well-typed arguments.
    pub(crate) fn call(&self, args: &[Value]) -> Result<Value> {
        match &self.0.form {
            Form::Leaf { body, .. } => body(args),
            Form::Bound {
                target,
                pos,
                values,
            } => {
                let mut full = ArgBuffer::with_capacity(args.len() + values.len());
                full.extend(args[..*pos].iter().cloned());
                full.extend(values.iter().cloned());
                full.extend(args[*pos..].iter().cloned());
                target.call(&full)
            }
            Form::Dropped { target, pos, count } => {
                let mut kept = ArgBuffer::with_capacity(args.len() - count);
                kept.extend(args[..*pos].iter().cloned());
                kept.extend(args[pos + count..].iter().cloned());
                target.call(&kept)
            }
            Form::Permuted { target, reorder } => {
                let permuted: ArgBuffer = reorder.iter().map(|&i| args[i].clone()).collect();
                target.call(&permuted)
            }
            Form::Converted {
                target,
                args: conversions,
                ret,
            } => {
                let converted = args
                    .iter()
                    .zip(conversions.iter())
                    .map(|(arg, conversion)| conversion.apply(arg.clone()))
                    .collect::<Result<ArgBuffer>>()?;
                ret.apply(target.call(&converted)?)
            }
            Form::Constant(value) => Ok(value.clone()),
            Form::Identity => Ok(args[0].clone()),
            Form::Guard {
                test,
                target,
                fallback,
            } => {
                if test.call(&args[..test.arity()])?.try_bool()? {
                    target.call(args)
                } else {
                    fallback.call(args)
                }
            }
            Form::Catch {
                target,
                ex_type,
                handler,
            } => match target.call(args) {
                Ok(value) => Ok(value),
                Err(err) => match err.as_throwable() {
                    Some(thrown) if ex_type.is_instance(&thrown) => {
                        let mut handler_args = ArgBuffer::with_capacity(handler.arity());
                        handler_args.push(thrown);
                        handler_args.extend(args[..handler.arity() - 1].iter().cloned());
                        handler.call(&handler_args)
                    }
                    _ => Err(err),
                },
            },
            Form::Throw => match &args[0] {
                Value::Null => Err(Error::thrown(
                    ClassRef::null_pointer_exception(),
                    "thrown value is null",
                )),
                thrown => Err(Error::Thrown(thrown.clone())),
            },
            Form::Adapter(instance) => instance.dispatch(args),
            Form::ArrayGet => args[0].try_array()?.get(args[1].try_int()?),
            Form::ArraySet => {
                args[0]
                    .try_array()?
                    .set(args[1].try_int()?, args[2].clone())?;
                Ok(Value::Void)
            }
            Form::NewArray { element } => Ok(Value::array(element.clone(), args.to_vec())),
            Form::Invoker { kind, target_type } => {
                self.call_invoker(*kind, target_type, &args[0], &args[1..])
            }
            Form::Spreader { target, count } => {
                let (fixed, array) = args.split_at(args.len() - 1);
                let mut full = ArgBuffer::with_capacity(fixed.len() + count);
                full.extend(fixed.iter().cloned());
                spread_into(&mut full, &array[0], &target.type_descriptor().parameters()[fixed.len()..])?;
                target.call(&full)
            }
            Form::Collecting { target, element } => {
                let fixed = target.arity() - 1;
                let mut full = ArgBuffer::with_capacity(target.arity());
                full.extend(args[..fixed].iter().cloned());
                full.push(Value::array(element.clone(), args[fixed..].to_vec()));
                target.call(&full)
            }
        }
    }

    fn call_invoker(
        &self,
        kind: InvokerKind,
        target_type: &TypeDescriptor,
        callee: &Value,
        args: &[Value],
    ) -> Result<Value> {
        let callee = callee.try_callable()?;
        match kind {
            InvokerKind::Exact => {
                if callee.type_descriptor() != target_type {
                    return Err(Error::WrongMethodType {
                        expected: target_type.to_string(),
                        found: callee.type_descriptor().to_string(),
                    });
                }
                callee.call(args)
            }
            InvokerKind::General => callee.adapt_to(target_type)?.call(args),
            InvokerKind::Spread { leading } => {
                let mut full = ArgBuffer::with_capacity(target_type.parameter_count());
                full.extend(args[..leading].iter().cloned());
                spread_into(&mut full, &args[leading], &target_type.parameters()[leading..])?;
                callee.adapt_to(target_type)?.call(&full)
            }
        }
    }
}

/// Whether converting invocation of a varargs collector must pack the
/// trailing arguments instead of passing them through.
fn needs_collection(params: &[ValueType], args: &[Value]) -> bool {
    if args.len() != params.len() {
        return true;
    }
    match (args.last(), params.last()) {
        (Some(last), Some(ty)) => !ty.accepts(last),
        _ => false,
    }
}

/// Append the elements of `array` to `out`, converted to `types`.
fn spread_into(out: &mut ArgBuffer, array: &Value, types: &[ValueType]) -> Result<()> {
    if types.is_empty() && array.is_null() {
        return Ok(());
    }
    let elements = array.try_array()?.to_vec();
    if elements.len() != types.len() {
        return Err(Error::WrongArgumentCount {
            expected: types.len(),
            found: elements.len(),
        });
    }
    for (element, ty) in elements.into_iter().zip(types) {
        out.push(assign_value(element, ty)?);
    }
    Ok(())
}

impl fmt::Display for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.0.ty)?;
        if self.0.varargs {
            f.write_str("...")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CallableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallableValue({self})")
    }
}
