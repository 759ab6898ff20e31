//! Runtime values carried through invocations.
//!
//! A reference-typed slot may hold a primitive variant; that is the boxed
//! form of the primitive. Objects, arrays and callables are shared by `Arc`
//! and compare by identity.

use crate::callable::CallableValue;
use crate::error::{Error, Result};
use crate::types::{ClassRef, Primitive, ValueType};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Debug)]
pub enum Value {
    /// Result of a `void` callable.
    Void,
    Null,
    Boolean(bool),
    Byte(i8),
    /// UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Object(Arc<ObjectValue>),
    Array(Arc<ArrayValue>),
    Callable(CallableValue),
}

/// Instance of a reference class, optionally carrying a message.
#[derive(Debug)]
pub struct ObjectValue {
    class: ClassRef,
    message: Option<String>,
}

impl ObjectValue {
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Fixed-length array with shared, mutable slots.
#[derive(Debug)]
pub struct ArrayValue {
    element: ValueType,
    slots: RwLock<Vec<Value>>,
}

impl ArrayValue {
    pub fn element_type(&self) -> &ValueType {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read slot `index`, throwing `ArrayIndexOutOfBoundsException` when out of range.
    pub fn get(&self, index: i32) -> Result<Value> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        usize::try_from(index)
            .ok()
            .and_then(|i| slots.get(i).cloned())
            .ok_or_else(|| out_of_bounds(index, slots.len()))
    }

    /// Store into slot `index`. The value must already fit the element type.
    pub fn set(&self, index: i32, value: Value) -> Result<()> {
        if !self.element.accepts(&value) {
            return Err(Error::thrown(
                ClassRef::array_store_exception(),
                value.describe(),
            ));
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let len = slots.len();
        let slot = usize::try_from(index)
            .ok()
            .and_then(|i| slots.get_mut(i))
            .ok_or_else(|| out_of_bounds(index, len))?;
        *slot = value;
        Ok(())
    }

    /// Snapshot of every slot.
    pub fn to_vec(&self) -> Vec<Value> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn out_of_bounds(index: i32, len: usize) -> Error {
    Error::thrown(
        ClassRef::array_index_out_of_bounds_exception(),
        format!("index {index} out of bounds for length {len}"),
    )
}

impl Value {
    /// A UTF-16 code unit from a Rust `char` in the basic multilingual plane.
    pub fn char(c: char) -> Self {
        Self::Char(u16::try_from(u32::from(c)).unwrap_or(0xFFFD))
    }

    pub fn str(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }

    /// A plain instance of `class`.
    pub fn object(class: ClassRef) -> Self {
        Self::Object(Arc::new(ObjectValue {
            class,
            message: None,
        }))
    }

    /// A throwable instance of `class` with a message.
    pub fn exception(class: ClassRef, message: impl Into<String>) -> Self {
        Self::Object(Arc::new(ObjectValue {
            class,
            message: Some(message.into()),
        }))
    }

    pub fn array(element: ValueType, values: Vec<Value>) -> Self {
        Self::Array(Arc::new(ArrayValue {
            element,
            slots: RwLock::new(values),
        }))
    }

    /// An array of `len` zero values of `element`.
    pub fn new_array(element: ValueType, len: usize) -> Self {
        let zero = element.zero();
        Self::array(element, vec![zero; len])
    }

    pub fn primitive(&self) -> Option<Primitive> {
        Some(match self {
            Self::Boolean(_) => Primitive::Boolean,
            Self::Byte(_) => Primitive::Byte,
            Self::Char(_) => Primitive::Char,
            Self::Short(_) => Primitive::Short,
            Self::Int(_) => Primitive::Int,
            Self::Long(_) => Primitive::Long,
            Self::Float(_) => Primitive::Float,
            Self::Double(_) => Primitive::Double,
            _ => return None,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Class of the boxed or reference value; `None` for `null` and `void`.
    pub fn runtime_class(&self) -> Option<ClassRef> {
        match self {
            Self::Void | Self::Null => None,
            Self::Str(_) => Some(ClassRef::string()),
            Self::Object(object) => Some(object.class.clone()),
            Self::Array(array) => Some(ClassRef::array_of(array.element.clone())),
            Self::Callable(_) => Some(ClassRef::callable()),
            other => other.primitive().map(Primitive::box_class),
        }
    }

    /// Type-qualified rendering used in diagnostics, e.g. `int 3`.
    pub fn describe(&self) -> String {
        match self {
            Self::Void => "void".to_string(),
            Self::Null => "null".to_string(),
            Self::Str(s) => format!("String {s:?}"),
            other => match (other.primitive(), other.runtime_class()) {
                (Some(p), _) => format!("{p} {other}"),
                (None, Some(class)) => format!("{class} {other}"),
                (None, None) => other.to_string(),
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral view of any `int`-or-narrower primitive.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Byte(v) => Some(i32::from(*v)),
            Self::Char(v) => Some(i32::from(*v)),
            Self::Short(v) => Some(i32::from(*v)),
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            other => other.as_int().map(i64::from),
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<ArrayValue>> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectValue>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&CallableValue> {
        match self {
            Self::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn try_bool(&self) -> Result<bool> {
        self.as_bool()
            .ok_or_else(|| Error::conversion(self, ValueType::BOOLEAN))
    }

    pub fn try_int(&self) -> Result<i32> {
        self.as_int()
            .ok_or_else(|| Error::conversion(self, ValueType::INT))
    }

    pub fn try_long(&self) -> Result<i64> {
        self.as_long()
            .ok_or_else(|| Error::conversion(self, ValueType::LONG))
    }

    pub fn try_double(&self) -> Result<f64> {
        self.as_double()
            .ok_or_else(|| Error::conversion(self, ValueType::DOUBLE))
    }

    pub fn try_str(&self) -> Result<&str> {
        self.as_str()
            .ok_or_else(|| Error::conversion(self, ValueType::string()))
    }

    /// The array behind a non-null array value; `null` throws `NullPointerException`.
    pub fn try_array(&self) -> Result<&Arc<ArrayValue>> {
        match self {
            Self::Array(array) => Ok(array),
            Self::Null => Err(Error::thrown(
                ClassRef::null_pointer_exception(),
                "array is null",
            )),
            other => Err(Error::conversion(other, "array")),
        }
    }

    pub fn try_callable(&self) -> Result<&CallableValue> {
        match self {
            Self::Callable(callable) => Ok(callable),
            Self::Null => Err(Error::thrown(
                ClassRef::null_pointer_exception(),
                "callable is null",
            )),
            other => Err(Error::conversion(other, ClassRef::callable())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Null => f.write_str("null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "{c}"),
                None => write!(f, "\\u{v:04x}"),
            },
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
            Self::Object(object) => match &object.message {
                Some(message) => write!(f, "{}: {message}", object.class),
                None => write!(f, "{}@{:p}", object.class, Arc::as_ptr(object)),
            },
            Self::Array(array) => {
                f.write_str("[")?;
                for (i, slot) in array.to_vec().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{slot}")?;
                }
                f.write_str("]")
            }
            Self::Callable(callable) => write!(f, "{callable}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::str(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Arc::from(v))
    }
}

impl From<CallableValue> for Value {
    fn from(v: CallableValue) -> Self {
        Self::Callable(v)
    }
}
