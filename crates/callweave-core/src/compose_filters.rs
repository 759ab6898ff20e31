//! Filter-family combinators built on the shape registry.
//!
//! | Operation | Kind | Position | Adapter filter | Adapter target |
//! |-----------|------|----------|----------------|----------------|
//! | `filter_argument` | VALUE | P | filter | target |
//! | `fold_arguments` | FOLD | combiner arity | combiner | target |
//! | `collect_arguments` | COLLECT | P | collector | target |
//! | `filter_return_value` | COLLECT | 0 | target | filter |
//! | `flyby_arguments` | FLYBY | 0 | filter | target |

use crate::callable::{CallableValue, Form};
use crate::compose::Composer;
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::shape::FilterKind;
use crate::types::ValueType;

impl Composer {
    fn adapter(
        &self,
        entry: TypeDescriptor,
        kind: FilterKind,
        position: usize,
        filter: &CallableValue,
        target: &CallableValue,
    ) -> Result<CallableValue> {
        let instance =
            self.shapes()
                .instantiate(&entry, kind, position, filter.clone(), target.clone())?;
        Ok(self.build(kind.label(), entry, Form::Adapter(instance)))
    }

    /// Apply `filters[i]` to argument `pos + i`; `None` entries leave the
    /// argument unchanged.
    pub fn filter_arguments(
        &self,
        target: &CallableValue,
        pos: usize,
        filters: &[Option<CallableValue>],
    ) -> Result<CallableValue> {
        if pos + filters.len() > target.arity() {
            return Err(Error::mismatch("too many filters"));
        }
        let mut adapted = target.clone();
        for (i, filter) in filters.iter().enumerate() {
            if let Some(filter) = filter {
                adapted = self.filter_argument(&adapted, pos + i, filter)?;
            }
        }
        Ok(adapted)
    }

    /// Replace argument `pos` with `filter(arg)`.
    pub fn filter_argument(
        &self,
        target: &CallableValue,
        pos: usize,
        filter: &CallableValue,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        let param = ty.parameter_type(pos)?;
        let filter_ty = filter.type_descriptor();
        if filter_ty.parameter_count() != 1 || filter_ty.return_type() != param {
            return Err(Error::mismatch(format!(
                "filter {filter_ty} does not produce argument {pos} of {ty}"
            )));
        }
        let entry = ty.change_parameter_type(pos, filter_ty.parameters()[0].clone())?;
        self.adapter(entry, FilterKind::Value, pos, filter, target)
    }

    /// Pass the result of `target` through `filter`.
    pub fn filter_return_value(
        &self,
        target: &CallableValue,
        filter: &CallableValue,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        let filter_ty = filter.type_descriptor();
        let fits = match ty.return_type() {
            ValueType::Void => filter_ty.parameter_count() == 0,
            ret => filter_ty.parameters() == std::slice::from_ref(ret),
        };
        if !fits {
            return Err(Error::mismatched_types("target and filter types", ty, filter_ty));
        }
        let entry = ty.change_return_type(filter_ty.return_type().clone());
        self.adapter(entry, FilterKind::Collect, 0, target, filter)
    }

    /// `target(combiner(a0..ak), a0..aN)`, dropping the combiner result when
    /// it is void.
    pub fn fold_arguments(
        &self,
        target: &CallableValue,
        combiner: &CallableValue,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        let combiner_ty = combiner.type_descriptor();
        let fold_vals = usize::from(!combiner_ty.return_type().is_void());
        let k = combiner_ty.parameter_count();
        let params = ty.parameters();
        let fits = params.len() >= fold_vals + k
            && params[fold_vals..fold_vals + k] == *combiner_ty.parameters()
            && (fold_vals == 0 || params[0] == *combiner_ty.return_type());
        if !fits {
            return Err(Error::mismatched_types("target and combiner types", ty, combiner_ty));
        }
        let entry = ty.drop_parameter_types(0, fold_vals)?;
        self.adapter(entry, FilterKind::Fold, k, combiner, target)
    }

    /// Replace the trailing arguments from `pos` with `collector(args[pos..])`.
    ///
    /// A non-void collector feeds `target`'s last parameter; a void
    /// collector requires `pos` to be `target`'s arity.
    pub fn collect_arguments(
        &self,
        target: &CallableValue,
        pos: usize,
        collector: &CallableValue,
    ) -> Result<CallableValue> {
        let ty = target.type_descriptor();
        let collector_ty = collector.type_descriptor();
        let arity = ty.parameter_count();
        if pos > arity {
            return Err(Error::Index {
                index: pos,
                limit: arity + 1,
            });
        }
        let fits = match collector_ty.return_type() {
            ValueType::Void => pos == arity,
            ret => pos + 1 == arity && ty.parameters()[pos] == *ret,
        };
        if !fits {
            return Err(Error::mismatched_types("target and collector types", ty, collector_ty));
        }
        let entry = ty
            .leading(pos)?
            .append_parameter_types(collector_ty.parameters())?;
        self.adapter(entry, FilterKind::Collect, pos, collector, target)
    }

    /// Show every argument to `filter` as one mutable `Object[]` before
    /// calling `target` with the possibly updated values.
    pub fn flyby_arguments(
        &self,
        target: &CallableValue,
        filter: &CallableValue,
    ) -> Result<CallableValue> {
        let filter_ty = filter.type_descriptor();
        let fits = filter_ty.return_type().is_void()
            && filter_ty.parameters() == [ValueType::object_array()];
        if !fits {
            return Err(Error::mismatch(format!(
                "flyby filter must be (Object[])void, found {filter_ty}"
            )));
        }
        self.adapter(
            target.type_descriptor().clone(),
            FilterKind::Flyby,
            0,
            filter,
            target,
        )
    }
}

#[cfg(test)]
#[path = "../tests/filter_tests.rs"]
mod tests;
