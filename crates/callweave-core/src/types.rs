//! Semantic value types: primitives, reference classes and `void`.
//!
//! Reference classes form a small nominal hierarchy (`ClassRef`) with single
//! inheritance plus interfaces. Built-in classes mirror the ones the
//! combinators need to talk about: `Object`, `String`, the box classes, the
//! `Throwable` family raised at invocation time, arrays, and the class of
//! callable values themselves.
//!
//! ## Identity
//!
//! `ClassRef` compares and hashes by name, so two handles to `"String"` are
//! interchangeable even when they were built separately. Array classes are
//! named after their component (`int[]`, `String[][]`).

use crate::value::Value;
use bitflags::bitflags;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// Primitive
// =============================================================================

/// The eight primitive value kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Primitive {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    pub const fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Whether a value of `self` converts to `to` by primitive widening.
    ///
    /// Identity is not a widening; use [`Primitive::converts_to`] for the
    /// reflexive relation.
    pub const fn widens_to(self, to: Primitive) -> bool {
        use Primitive::*;
        match self {
            Byte => matches!(to, Short | Int | Long | Float | Double),
            Short | Char => matches!(to, Int | Long | Float | Double),
            Int => matches!(to, Long | Float | Double),
            Long => matches!(to, Float | Double),
            Float => matches!(to, Double),
            Double | Boolean => false,
        }
    }

    /// Identity or widening.
    pub fn converts_to(self, to: Primitive) -> bool {
        self == to || self.widens_to(to)
    }

    /// The reference class a value of this primitive boxes into.
    pub fn box_class(self) -> ClassRef {
        BUILTINS.boxes[self as usize].clone()
    }

    /// The zero value (`false`, `0`, `0.0`).
    pub const fn zero(self) -> Value {
        match self {
            Self::Boolean => Value::Boolean(false),
            Self::Byte => Value::Byte(0),
            Self::Char => Value::Char(0),
            Self::Short => Value::Short(0),
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Float => Value::Float(0.0),
            Self::Double => Value::Double(0.0),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ClassRef
// =============================================================================

bitflags! {
    /// Structural flags of a reference class.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u8 {
        const INTERFACE = 1 << 0;
        const ARRAY = 1 << 1;
        const BOX = 1 << 2;
    }
}

struct ClassData {
    name: Arc<str>,
    flags: ClassFlags,
    superclass: Option<ClassRef>,
    interfaces: Box<[ClassRef]>,
    /// Component type, for array classes.
    component: Option<ValueType>,
    /// Primitive carried by a box class.
    unboxed: Option<Primitive>,
}

/// Handle to a reference class.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassData>);

impl ClassRef {
    /// Define a class with an optional superclass (`Object` when `None`).
    pub fn new_class(
        name: impl Into<Arc<str>>,
        superclass: Option<ClassRef>,
        interfaces: Vec<ClassRef>,
    ) -> Self {
        Self(Arc::new(ClassData {
            name: name.into(),
            flags: ClassFlags::empty(),
            superclass: Some(superclass.unwrap_or_else(ClassRef::object)),
            interfaces: interfaces.into_boxed_slice(),
            component: None,
            unboxed: None,
        }))
    }

    /// Define an interface extending `extends`.
    pub fn new_interface(name: impl Into<Arc<str>>, extends: Vec<ClassRef>) -> Self {
        Self(Arc::new(ClassData {
            name: name.into(),
            flags: ClassFlags::INTERFACE,
            superclass: None,
            interfaces: extends.into_boxed_slice(),
            component: None,
            unboxed: None,
        }))
    }

    /// The array class whose elements are `component`.
    pub fn array_of(component: ValueType) -> Self {
        Self(Arc::new(ClassData {
            name: format!("{component}[]").into(),
            flags: ClassFlags::ARRAY,
            superclass: Some(ClassRef::object()),
            interfaces: Box::default(),
            component: Some(component),
            unboxed: None,
        }))
    }

    fn root(name: &str) -> Self {
        Self(Arc::new(ClassData {
            name: name.into(),
            flags: ClassFlags::empty(),
            superclass: None,
            interfaces: Box::default(),
            component: None,
            unboxed: None,
        }))
    }

    fn subclass(name: &str, superclass: &ClassRef) -> Self {
        Self(Arc::new(ClassData {
            name: name.into(),
            flags: ClassFlags::empty(),
            superclass: Some(superclass.clone()),
            interfaces: Box::default(),
            component: None,
            unboxed: None,
        }))
    }

    fn boxed(name: &str, superclass: &ClassRef, primitive: Primitive) -> Self {
        Self(Arc::new(ClassData {
            name: name.into(),
            flags: ClassFlags::BOX,
            superclass: Some(superclass.clone()),
            interfaces: Box::default(),
            component: None,
            unboxed: Some(primitive),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn flags(&self) -> ClassFlags {
        self.0.flags
    }

    pub fn is_interface(&self) -> bool {
        self.0.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn is_array(&self) -> bool {
        self.0.flags.contains(ClassFlags::ARRAY)
    }

    pub fn is_object(&self) -> bool {
        self.0.superclass.is_none() && self.0.flags.is_empty()
    }

    pub fn superclass(&self) -> Option<&ClassRef> {
        self.0.superclass.as_ref()
    }

    pub fn interfaces(&self) -> &[ClassRef] {
        &self.0.interfaces
    }

    /// Component type of an array class.
    pub fn component(&self) -> Option<&ValueType> {
        self.0.component.as_ref()
    }

    /// Primitive wrapped by a box class.
    pub fn unboxed(&self) -> Option<Primitive> {
        self.0.unboxed
    }

    pub fn is_throwable(&self) -> bool {
        ClassRef::throwable().is_assignable_from(self)
    }

    /// Whether a reference of class `other` may be stored in a slot of `self`.
    pub fn is_assignable_from(&self, other: &ClassRef) -> bool {
        if self == other || self.is_object() {
            return true;
        }
        if let (Some(mine), Some(theirs)) = (self.component(), other.component()) {
            return match (mine, theirs) {
                (ValueType::Ref(a), ValueType::Ref(b)) => a.is_assignable_from(b),
                (a, b) => a == b,
            };
        }
        other
            .superclass()
            .is_some_and(|parent| self.is_assignable_from(parent))
            || other
                .interfaces()
                .iter()
                .any(|iface| self.is_assignable_from(iface))
    }

    /// Whether `value` is an instance of this class. `null` is not.
    pub fn is_instance(&self, value: &Value) -> bool {
        if self.is_object() {
            return !matches!(value, Value::Null | Value::Void);
        }
        match value {
            Value::Null | Value::Void => false,
            Value::Array(array) => match self.component() {
                Some(component) => match (component, array.element_type()) {
                    (ValueType::Ref(a), ValueType::Ref(b)) => a.is_assignable_from(b),
                    (a, b) => a == b,
                },
                None => false,
            },
            other => other
                .runtime_class()
                .is_some_and(|class| self.is_assignable_from(&class)),
        }
    }
}

impl ClassRef {
    pub fn object() -> Self {
        BUILTINS.object.clone()
    }
    pub fn string() -> Self {
        BUILTINS.string.clone()
    }
    pub fn number() -> Self {
        BUILTINS.number.clone()
    }
    pub fn throwable() -> Self {
        BUILTINS.throwable.clone()
    }
    pub fn exception() -> Self {
        BUILTINS.exception.clone()
    }
    pub fn runtime_exception() -> Self {
        BUILTINS.runtime_exception.clone()
    }
    pub fn illegal_argument_exception() -> Self {
        BUILTINS.illegal_argument.clone()
    }
    pub fn illegal_state_exception() -> Self {
        BUILTINS.illegal_state.clone()
    }
    pub fn class_cast_exception() -> Self {
        BUILTINS.class_cast.clone()
    }
    pub fn null_pointer_exception() -> Self {
        BUILTINS.null_pointer.clone()
    }
    pub fn array_index_out_of_bounds_exception() -> Self {
        BUILTINS.array_index_out_of_bounds.clone()
    }
    pub fn array_store_exception() -> Self {
        BUILTINS.array_store.clone()
    }
    pub fn wrong_method_type_exception() -> Self {
        BUILTINS.wrong_method_type.clone()
    }
    /// The class of callable values.
    pub fn callable() -> Self {
        BUILTINS.callable.clone()
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.name())
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Builtins {
    object: ClassRef,
    string: ClassRef,
    number: ClassRef,
    /// Indexed by `Primitive as usize`.
    boxes: [ClassRef; 8],
    throwable: ClassRef,
    exception: ClassRef,
    runtime_exception: ClassRef,
    illegal_argument: ClassRef,
    illegal_state: ClassRef,
    class_cast: ClassRef,
    null_pointer: ClassRef,
    array_index_out_of_bounds: ClassRef,
    array_store: ClassRef,
    wrong_method_type: ClassRef,
    callable: ClassRef,
}

static BUILTINS: Lazy<Builtins> = Lazy::new(|| {
    let object = ClassRef::root("Object");
    let number = ClassRef::subclass("Number", &object);
    let boxes = [
        ClassRef::boxed("Boolean", &object, Primitive::Boolean),
        ClassRef::boxed("Byte", &number, Primitive::Byte),
        ClassRef::boxed("Character", &object, Primitive::Char),
        ClassRef::boxed("Short", &number, Primitive::Short),
        ClassRef::boxed("Integer", &number, Primitive::Int),
        ClassRef::boxed("Long", &number, Primitive::Long),
        ClassRef::boxed("Float", &number, Primitive::Float),
        ClassRef::boxed("Double", &number, Primitive::Double),
    ];
    let throwable = ClassRef::subclass("Throwable", &object);
    let exception = ClassRef::subclass("Exception", &throwable);
    let runtime_exception = ClassRef::subclass("RuntimeException", &exception);
    let index_out_of_bounds = ClassRef::subclass("IndexOutOfBoundsException", &runtime_exception);
    Builtins {
        string: ClassRef::subclass("String", &object),
        callable: ClassRef::subclass("CallableValue", &object),
        illegal_argument: ClassRef::subclass("IllegalArgumentException", &runtime_exception),
        illegal_state: ClassRef::subclass("IllegalStateException", &runtime_exception),
        class_cast: ClassRef::subclass("ClassCastException", &runtime_exception),
        null_pointer: ClassRef::subclass("NullPointerException", &runtime_exception),
        array_index_out_of_bounds: ClassRef::subclass(
            "ArrayIndexOutOfBoundsException",
            &index_out_of_bounds,
        ),
        array_store: ClassRef::subclass("ArrayStoreException", &runtime_exception),
        wrong_method_type: ClassRef::subclass("WrongMethodTypeException", &runtime_exception),
        object,
        number,
        boxes,
        throwable,
        exception,
        runtime_exception,
    }
});

// =============================================================================
// ValueType
// =============================================================================

/// The semantic type of a parameter or return slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Legal only as a return type.
    Void,
    Prim(Primitive),
    Ref(ClassRef),
}

impl ValueType {
    pub const VOID: ValueType = ValueType::Void;
    pub const BOOLEAN: ValueType = ValueType::Prim(Primitive::Boolean);
    pub const BYTE: ValueType = ValueType::Prim(Primitive::Byte);
    pub const CHAR: ValueType = ValueType::Prim(Primitive::Char);
    pub const SHORT: ValueType = ValueType::Prim(Primitive::Short);
    pub const INT: ValueType = ValueType::Prim(Primitive::Int);
    pub const LONG: ValueType = ValueType::Prim(Primitive::Long);
    pub const FLOAT: ValueType = ValueType::Prim(Primitive::Float);
    pub const DOUBLE: ValueType = ValueType::Prim(Primitive::Double);

    pub fn object() -> Self {
        Self::Ref(ClassRef::object())
    }

    pub fn string() -> Self {
        Self::Ref(ClassRef::string())
    }

    pub fn of(class: ClassRef) -> Self {
        Self::Ref(class)
    }

    /// Array type with the given component.
    pub fn array_of(component: ValueType) -> Self {
        Self::Ref(ClassRef::array_of(component))
    }

    /// `Object[]`, the reified argument list handed to flyby filters.
    pub fn object_array() -> Self {
        Self::array_of(Self::object())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Prim(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Self::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            Self::Ref(class) => Some(class),
            _ => None,
        }
    }

    /// References erased to `Object`; primitives and `void` unchanged.
    pub fn erase(&self) -> ValueType {
        match self {
            Self::Ref(class) if !class.is_object() => Self::object(),
            other => other.clone(),
        }
    }

    /// Primitives replaced by their box classes.
    pub fn wrap(&self) -> ValueType {
        match self {
            Self::Prim(p) => Self::Ref(p.box_class()),
            other => other.clone(),
        }
    }

    /// Box classes replaced by their primitives.
    pub fn unwrap(&self) -> ValueType {
        match self {
            Self::Ref(class) => class
                .unboxed()
                .map_or_else(|| self.clone(), ValueType::Prim),
            other => other.clone(),
        }
    }

    /// Default value of a slot of this type.
    pub fn zero(&self) -> Value {
        match self {
            Self::Void => Value::Void,
            Self::Prim(p) => p.zero(),
            Self::Ref(_) => Value::Null,
        }
    }

    /// Whether `value` may occupy a slot of this type without conversion.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Void => matches!(value, Value::Void),
            Self::Prim(p) => value.primitive() == Some(*p),
            Self::Ref(class) => matches!(value, Value::Null) || class.is_instance(value),
        }
    }
}

impl From<Primitive> for ValueType {
    fn from(p: Primitive) -> Self {
        Self::Prim(p)
    }
}

impl From<ClassRef> for ValueType {
    fn from(class: ClassRef) -> Self {
        Self::Ref(class)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Prim(p) => f.write_str(p.name()),
            Self::Ref(class) => f.write_str(class.name()),
        }
    }
}
