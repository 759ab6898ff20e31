//! Statically monomorphised dispatch routines.
//!
//! Each routine is instantiated once per arity `N` in `0..=MAX_STATIC_SHAPE_ARITY`
//! and stored in a `(arity, kind)` table of `fn` pointers. Buffers live on the
//! stack; FLYBY allocates its one `Object[]`.

use super::{AdapterInstance, DispatchFn, FilterKind, ShapeSynthesizer};
use crate::callable::ArgBuffer;
use crate::convert::assign_value;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::types::ValueType;
use crate::value::Value;
use callweave_common::MAX_STATIC_SHAPE_ARITY;
use std::array;
use std::mem;

/// Replace argument P with the filter's result.
fn filter_value<const N: usize>(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    debug_assert_eq!(args.len(), N);
    let pos = adapter.position();
    let mut buf: [Value; N] = array::from_fn(|i| args[i].clone());
    let arg = mem::replace(&mut buf[pos], Value::Void);
    buf[pos] = adapter.filter().call(std::slice::from_ref(&arg))?;
    adapter.target().call(&buf)
}

/// Prepend the combiner's result over the first P arguments.
fn fold_leading<const N: usize>(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    debug_assert_eq!(args.len(), N);
    let combiner = adapter.filter();
    let folded = combiner.call(&args[..adapter.position()])?;
    if combiner.return_type().is_void() {
        return adapter.target().call(args);
    }
    let mut buf = ArgBuffer::with_capacity(N + 1);
    buf.push(folded);
    buf.extend(args.iter().cloned());
    adapter.target().call(&buf)
}

/// Replace the suffix from P with the collector's result.
fn collect_trailing<const N: usize>(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    debug_assert_eq!(args.len(), N);
    let pos = adapter.position();
    let collector = adapter.filter();
    let collected = collector.call(&args[pos..])?;
    let mut buf = ArgBuffer::with_capacity(pos + 1);
    buf.extend(args[..pos].iter().cloned());
    if !collector.return_type().is_void() {
        buf.push(collected);
    }
    adapter.target().call(&buf)
}

/// Hand every argument to the filter as one `Object[]`, then spread it back.
fn flyby_all<const N: usize>(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    debug_assert_eq!(args.len(), N);
    let reified = Value::array(ValueType::object(), args.to_vec());
    adapter.filter().call(std::slice::from_ref(&reified))?;
    let slots = reified.try_array()?.to_vec();
    let params = adapter.target().type_descriptor().parameters();
    let mut buf: [Value; N] = array::from_fn(|_| Value::Void);
    for ((dst, slot), ty) in buf.iter_mut().zip(slots).zip(params) {
        *dst = assign_value(slot, ty)?;
    }
    adapter.target().call(&buf)
}

macro_rules! static_dispatch_table {
    ($($n:literal)*) => {
        [$([
            filter_value::<$n> as DispatchFn,
            fold_leading::<$n>,
            collect_trailing::<$n>,
            flyby_all::<$n>,
        ],)*]
    };
}

/// Indexed by `[arity][kind.index()]`; columns follow `FilterKind::ALL`.
static STATIC_DISPATCH: [[DispatchFn; FilterKind::COUNT]; MAX_STATIC_SHAPE_ARITY + 1] =
    static_dispatch_table!(0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20);

/// The compile-time shape table.
#[derive(Copy, Clone, Debug, Default)]
pub struct StaticShapes;

impl ShapeSynthesizer for StaticShapes {
    fn name(&self) -> &'static str {
        "static"
    }

    fn synthesize(
        &self,
        entry: &TypeDescriptor,
        kind: FilterKind,
        position: usize,
    ) -> Result<DispatchFn> {
        let arity = entry.parameter_count();
        STATIC_DISPATCH
            .get(arity)
            .map(|row| row[kind.index()])
            .ok_or(Error::UnsupportedShape {
                arity,
                kind,
                position,
            })
    }
}
