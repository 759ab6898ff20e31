//! Error taxonomy for composition and invocation.
//!
//! Composition-time failures (`TypeMismatch`, `ArityLimit`, `Index`,
//! `UnsupportedShape`) are reported synchronously by the combinator that
//! detected them. Invocation-time failures (`ConversionFailure` from dynamic
//! casts, `WrongArgumentCount`, `WrongMethodType`, `Thrown`) surface from
//! `invoke*` calls and can be intercepted by `catch_exception` adapters.

use crate::descriptor::TypeDescriptor;
use crate::shape::FilterKind;
use crate::types::ClassRef;
use crate::value::Value;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the engine can report.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A combinator's required type relationship is violated.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A composition would exceed the maximum supported parameter count.
    #[error("arity {requested} exceeds the maximum of {max}")]
    ArityLimit { requested: usize, max: usize },

    /// A parameter position lies outside `0..limit`.
    #[error("position {index} is outside 0..{limit}")]
    Index { index: usize, limit: usize },

    /// No static shape exists and no synthesizer is configured.
    #[error("no adapter shape for {kind} at position {position} of arity {arity}")]
    UnsupportedShape {
        arity: usize,
        kind: FilterKind,
        position: usize,
    },

    /// A value cannot be converted to the required type.
    #[error("cannot convert {value} to {target}")]
    ConversionFailure { value: String, target: String },

    /// An invocation supplied the wrong number of arguments.
    #[error("expected {expected} arguments but got {found}")]
    WrongArgumentCount { expected: usize, found: usize },

    /// An exact invocation received a callable of a different type.
    #[error("expected a callable of type {expected} but got {found}")]
    WrongMethodType { expected: String, found: String },

    /// A value thrown by a callable.
    #[error("thrown {0}")]
    Thrown(Value),
}

impl Error {
    pub(crate) fn mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    /// `"{what} must match: t1 != t2"`, the shape used by every pairwise check.
    pub(crate) fn mismatched_types(what: &str, t1: &TypeDescriptor, t2: &TypeDescriptor) -> Self {
        Self::TypeMismatch(format!("{what} must match: {t1} != {t2}"))
    }

    pub(crate) fn conversion(value: &Value, target: impl std::fmt::Display) -> Self {
        Self::ConversionFailure {
            value: value.describe(),
            target: target.to_string(),
        }
    }

    /// Throw a fresh instance of `class` carrying `message`.
    pub fn thrown(class: ClassRef, message: impl Into<String>) -> Self {
        Self::Thrown(Value::exception(class, message))
    }

    /// The throwable object this error presents to an exception handler.
    ///
    /// Thrown values are returned as-is. Invocation-time failures become
    /// instances of the matching runtime exception class. Composition-only
    /// errors are never catchable.
    pub fn as_throwable(&self) -> Option<Value> {
        match self {
            Self::Thrown(value) => Some(value.clone()),
            Self::ConversionFailure { .. } => {
                Some(Value::exception(ClassRef::class_cast_exception(), self.to_string()))
            }
            Self::WrongMethodType { .. } | Self::TypeMismatch(_) => Some(Value::exception(
                ClassRef::wrong_method_type_exception(),
                self.to_string(),
            )),
            Self::WrongArgumentCount { .. } => Some(Value::exception(
                ClassRef::illegal_argument_exception(),
                self.to_string(),
            )),
            Self::ArityLimit { .. } | Self::Index { .. } | Self::UnsupportedShape { .. } => None,
        }
    }
}
