//! Arity-independent dispatch routines for shapes above the static table.

use super::{AdapterInstance, DispatchFn, FilterKind, ShapeSynthesizer};
use crate::convert::assign_value;
use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::types::ValueType;
use crate::value::Value;
use tracing::trace;

/// General synthesizer that serves any arity from heap-allocated buffers.
#[derive(Copy, Clone, Debug, Default)]
pub struct SpreadingSynthesizer;

impl ShapeSynthesizer for SpreadingSynthesizer {
    fn name(&self) -> &'static str {
        "spreading"
    }

    fn synthesize(
        &self,
        entry: &TypeDescriptor,
        kind: FilterKind,
        position: usize,
    ) -> Result<DispatchFn> {
        trace!(entry = %entry, kind = %kind, position, "SpreadingSynthesizer::synthesize");
        Ok(match kind {
            FilterKind::Value => spread_value,
            FilterKind::Fold => spread_fold,
            FilterKind::Collect => spread_collect,
            FilterKind::Flyby => spread_flyby,
        })
    }
}

fn spread_value(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    let pos = adapter.position();
    let mut buf = args.to_vec();
    buf[pos] = adapter.filter().call(&args[pos..=pos])?;
    adapter.target().call(&buf)
}

fn spread_fold(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    let combiner = adapter.filter();
    let folded = combiner.call(&args[..adapter.position()])?;
    if combiner.return_type().is_void() {
        return adapter.target().call(args);
    }
    let mut buf = Vec::with_capacity(args.len() + 1);
    buf.push(folded);
    buf.extend_from_slice(args);
    adapter.target().call(&buf)
}

fn spread_collect(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    let pos = adapter.position();
    let collector = adapter.filter();
    let collected = collector.call(&args[pos..])?;
    let mut buf = args[..pos].to_vec();
    if !collector.return_type().is_void() {
        buf.push(collected);
    }
    adapter.target().call(&buf)
}

fn spread_flyby(adapter: &AdapterInstance, args: &[Value]) -> Result<Value> {
    let reified = Value::array(ValueType::object(), args.to_vec());
    adapter.filter().call(std::slice::from_ref(&reified))?;
    let params = adapter.target().type_descriptor().parameters();
    let buf = reified
        .try_array()?
        .to_vec()
        .into_iter()
        .zip(params)
        .map(|(slot, ty)| assign_value(slot, ty))
        .collect::<Result<Vec<_>>>()?;
    adapter.target().call(&buf)
}
