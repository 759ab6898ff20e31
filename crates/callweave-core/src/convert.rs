//! Value conversions between slot types.
//!
//! Two rule sets exist:
//!
//! | Mode | Primitive ↔ primitive | Reference → primitive | Reference → reference |
//! |------|-----------------------|-----------------------|-----------------------|
//! | `Assign` | widening only | unbox then widen; `null` fails | checked cast |
//! | `Explicit` | any, booleans via 0/1 | unbox then convert; `null` is zero | checked cast, unchecked to interfaces |
//!
//! A conversion is planned once from the static types (`plan`) and applied to
//! every value that flows through the slot (`Conversion::apply`).

use crate::error::{Error, Result};
use crate::types::{ClassRef, Primitive, ValueType};
use crate::value::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    /// Rules of `as_type` and converting invocation.
    Assign,
    /// Rules of `explicit_cast_arguments`.
    Explicit,
}

/// A planned conversion from one slot type to another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    /// Primitive to primitive.
    Primitive(Primitive),
    /// Primitive into a reference slot that accepts its box class.
    Box,
    /// Reference to primitive.
    Unbox { to: Primitive, mode: ConversionMode },
    /// Reference (or boxed primitive) checked against a class at runtime.
    CheckCast(ClassRef),
    /// Any value into a `void` slot.
    Discard,
    /// `void` into a value slot.
    Zero(ValueType),
}

/// Plan the conversion of a `from` slot into a `to` slot, if one exists.
pub fn plan(from: &ValueType, to: &ValueType, mode: ConversionMode) -> Option<Conversion> {
    use ConversionMode::*;
    if from == to {
        return Some(Conversion::Identity);
    }
    Some(match (from, to) {
        (_, ValueType::Void) => Conversion::Discard,
        (ValueType::Void, _) => Conversion::Zero(to.clone()),
        (ValueType::Prim(a), ValueType::Prim(b)) => match mode {
            Assign if !a.widens_to(*b) => return None,
            _ => Conversion::Primitive(*b),
        },
        (ValueType::Prim(a), ValueType::Ref(class)) => {
            if class.is_assignable_from(&a.box_class()) {
                Conversion::Box
            } else if mode == Explicit {
                Conversion::CheckCast(class.clone())
            } else {
                return None;
            }
        }
        (ValueType::Ref(class), ValueType::Prim(p)) => {
            let unboxes = class.is_assignable_from(&p.box_class())
                || class.unboxed().is_some_and(|q| q.converts_to(*p));
            if mode == Assign && !unboxes {
                return None;
            }
            Conversion::Unbox { to: *p, mode }
        }
        (ValueType::Ref(a), ValueType::Ref(b)) => {
            if b.is_assignable_from(a) || (mode == Explicit && b.is_interface()) {
                Conversion::Identity
            } else {
                Conversion::CheckCast(b.clone())
            }
        }
    })
}

impl Conversion {
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity | Self::Box)
    }

    pub fn apply(&self, value: Value) -> Result<Value> {
        match self {
            Self::Identity | Self::Box => Ok(value),
            Self::Discard => Ok(Value::Void),
            Self::Zero(ty) => Ok(ty.zero()),
            Self::Primitive(to) => match value.primitive() {
                Some(_) => Ok(convert_primitive(&value, *to)),
                None => Err(Error::conversion(&value, to)),
            },
            Self::Unbox { to, mode } => match (&value, value.primitive(), mode) {
                (Value::Null, _, ConversionMode::Explicit) => Ok(to.zero()),
                (_, Some(_), ConversionMode::Explicit) => Ok(convert_primitive(&value, *to)),
                (_, Some(from), ConversionMode::Assign) if from.converts_to(*to) => {
                    Ok(convert_primitive(&value, *to))
                }
                _ => Err(Error::conversion(&value, to)),
            },
            Self::CheckCast(class) => {
                if value.is_null() || class.is_instance(&value) {
                    Ok(value)
                } else {
                    Err(Error::conversion(&value, class))
                }
            }
        }
    }
}

enum Num {
    I(i64),
    F(f64),
}

fn numeric(value: &Value) -> Option<Num> {
    Some(match value {
        Value::Boolean(v) => Num::I(i64::from(*v)),
        Value::Byte(v) => Num::I(i64::from(*v)),
        Value::Char(v) => Num::I(i64::from(*v)),
        Value::Short(v) => Num::I(i64::from(*v)),
        Value::Int(v) => Num::I(i64::from(*v)),
        Value::Long(v) => Num::I(*v),
        Value::Float(v) => Num::F(f64::from(*v)),
        Value::Double(v) => Num::F(*v),
        _ => return None,
    })
}

/// Convert a primitive value to `to` with cast semantics.
///
/// Integral narrowing keeps the low-order bits. Floating to integral
/// saturates and maps NaN to zero. Narrower-than-int targets go through
/// `int` first. Booleans read as 1/0; a primitive becomes a boolean from
/// its low-order bit. Non-primitive input yields the zero of `to`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn convert_primitive(value: &Value, to: Primitive) -> Value {
    let Some(n) = numeric(value) else {
        return to.zero();
    };
    let int = match n {
        Num::I(v) => v,
        Num::F(v) => match to {
            Primitive::Long => v as i64,
            _ => i64::from(v as i32),
        },
    };
    match to {
        Primitive::Boolean => Value::Boolean(int & 1 != 0),
        Primitive::Byte => Value::Byte(int as i8),
        Primitive::Char => Value::Char(int as u16),
        Primitive::Short => Value::Short(int as i16),
        Primitive::Int => Value::Int(int as i32),
        Primitive::Long => Value::Long(int),
        Primitive::Float => Value::Float(match n {
            Num::I(v) => v as f32,
            Num::F(v) => v as f32,
        }),
        Primitive::Double => Value::Double(match n {
            Num::I(v) => v as f64,
            Num::F(v) => v,
        }),
    }
}

/// Convert a dynamic value into a slot of type `to` with assignment rules.
///
/// Used for bound values, constants and converting invocation.
pub fn assign_value(value: Value, to: &ValueType) -> Result<Value> {
    match (to, value.primitive()) {
        (ValueType::Void, _) => match value {
            Value::Void => Ok(value),
            other => Err(Error::conversion(&other, to)),
        },
        (ValueType::Prim(p), Some(q)) if q.converts_to(*p) => Ok(convert_primitive(&value, *p)),
        (ValueType::Prim(_), _) => Err(Error::conversion(&value, to)),
        (ValueType::Ref(class), _) => {
            if value.is_null() || class.is_instance(&value) {
                Ok(value)
            } else {
                Err(Error::conversion(&value, to))
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/convert_tests.rs"]
mod tests;
