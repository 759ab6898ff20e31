//! callweave: typed callable composition with cached adapter shapes.
//!
//! The engine lives in `callweave-core`; this crate re-exports it and adds
//! process-level plumbing (tracing setup) shared by the CLI and embedders.
//!
//! ```no_run
//! use callweave::{Composer, Value, ValueType};
//!
//! let composer = Composer::new();
//! let ty = composer
//!     .method_type(ValueType::INT, vec![ValueType::INT, ValueType::INT])
//!     .unwrap();
//! let add = composer.from_fn("add", &ty, |args| {
//!     Ok(Value::Int(args[0].try_int()? + args[1].try_int()?))
//! });
//! let add_one = composer.insert_arguments(&add, 0, vec![Value::Int(1)]).unwrap();
//! assert_eq!(add_one.invoke_exact(&[Value::Int(41)]).unwrap(), Value::Int(42));
//! ```

pub use callweave_common as common;
pub use callweave_core::*;

// Tracing configuration (CALLWEAVE_LOG / CALLWEAVE_LOG_FORMAT)
pub mod tracing_config;
