//! Invokers, spreaders, collectors and array element accessors.

use crate::callable::{CallableValue, Form, InvokerKind};
use crate::compose::Composer;
use crate::convert::{ConversionMode, plan};
use crate::descriptor::{TypeDescriptor, check_position};
use crate::error::{Error, Result};
use crate::types::{ClassRef, ValueType};

/// Component type of an array type, or a mismatch naming `what`.
fn array_component<'a>(array_type: &'a ValueType, what: &str) -> Result<&'a ValueType> {
    array_type
        .class()
        .and_then(ClassRef::component)
        .ok_or_else(|| Error::mismatch(format!("{what} must be an array type, found {array_type}")))
}

impl Composer {
    fn invoker_of(
        &self,
        op: &'static str,
        kind: InvokerKind,
        ty: &TypeDescriptor,
        invoker_type: TypeDescriptor,
    ) -> CallableValue {
        self.build(
            op,
            invoker_type,
            Form::Invoker {
                kind,
                target_type: self.intern(ty.clone()),
            },
        )
    }

    /// `(CallableValue, ty.params...) -> ty.ret` invoking its leading
    /// argument exactly.
    pub fn exact_invoker(&self, ty: &TypeDescriptor) -> Result<CallableValue> {
        let invoker_type = ty.insert_parameter_types(0, &[ValueType::of(ClassRef::callable())])?;
        Ok(self.invoker_of("exact_invoker", InvokerKind::Exact, ty, invoker_type))
    }

    /// Like `exact_invoker`, but adapts the leading callable to `ty` with
    /// assignment rules at invocation.
    pub fn invoker(&self, ty: &TypeDescriptor) -> Result<CallableValue> {
        let invoker_type = ty.insert_parameter_types(0, &[ValueType::of(ClassRef::callable())])?;
        Ok(self.invoker_of("invoker", InvokerKind::General, ty, invoker_type))
    }

    /// `(CallableValue, ty.params[..leading]..., Object[]) -> ty.ret`.
    pub fn spread_invoker(&self, ty: &TypeDescriptor, leading: usize) -> Result<CallableValue> {
        check_position(leading, ty.parameter_count())?;
        let mut params = Vec::with_capacity(leading + 2);
        params.push(ValueType::of(ClassRef::callable()));
        params.extend_from_slice(&ty.parameters()[..leading]);
        params.push(ValueType::object_array());
        let invoker_type = TypeDescriptor::new(ty.return_type().clone(), params)?;
        Ok(self.invoker_of(
            "spread_invoker",
            InvokerKind::Spread { leading },
            ty,
            invoker_type,
        ))
    }

    /// Replace the trailing `count` parameters by one `array_type` parameter.
    pub fn as_spreader(
        &self,
        target: &CallableValue,
        array_type: &ValueType,
        count: usize,
    ) -> Result<CallableValue> {
        let element = array_component(array_type, "spreader")?;
        let ty = target.type_descriptor();
        let arity = ty.parameter_count();
        check_position(count, arity)?;
        let fixed = arity - count;
        if let Some(param) = ty.parameters()[fixed..]
            .iter()
            .find(|param| plan(element, param, ConversionMode::Assign).is_none())
        {
            return Err(Error::mismatch(format!(
                "array element {element} cannot be spread into {param}"
            )));
        }
        let new_type = ty
            .drop_parameter_types(fixed, arity)?
            .append_parameter_types(std::slice::from_ref(array_type))?;
        Ok(self.build(
            "as_spreader",
            new_type,
            Form::Spreader {
                target: target.clone(),
                count,
            },
        ))
    }

    /// Replace the trailing array parameter by `count` element parameters.
    pub fn as_collector(
        &self,
        target: &CallableValue,
        array_type: &ValueType,
        count: usize,
    ) -> Result<CallableValue> {
        let element = array_component(array_type, "collector")?.clone();
        let ty = target.type_descriptor();
        let last = match (ty.last_parameter(), array_type) {
            (Some(last @ ValueType::Ref(class)), ValueType::Ref(array))
                if class.is_assignable_from(array) =>
            {
                last.clone()
            }
            _ => {
                return Err(Error::mismatch(format!(
                    "last parameter of {ty} does not accept {array_type}"
                )));
            }
        };
        let collector_type = TypeDescriptor::new(last, vec![element.clone(); count])?;
        let collector = self.build("new_array", collector_type, Form::NewArray { element });
        self.collect_arguments(target, ty.parameter_count() - 1, &collector)
    }

    /// Same callable, flagged to collect surplus trailing arguments into its
    /// `array_type` parameter on converting invocation.
    pub fn as_varargs_collector(
        &self,
        target: &CallableValue,
        array_type: &ValueType,
    ) -> Result<CallableValue> {
        array_component(array_type, "varargs collector")?;
        let ty = target.type_descriptor();
        let takes_array = match (ty.last_parameter(), array_type) {
            (Some(ValueType::Ref(last)), ValueType::Ref(array)) => {
                last.is_array() && last.is_assignable_from(array)
            }
            _ => false,
        };
        if !takes_array {
            return Err(Error::mismatch(format!(
                "last parameter of {ty} is not an array accepting {array_type}"
            )));
        }
        Ok(target.with_varargs(true))
    }

    /// `(T[], int) -> T`.
    pub fn array_element_getter(&self, array_class: &ClassRef) -> Result<CallableValue> {
        let array_type = ValueType::of(array_class.clone());
        let element = array_component(&array_type, "array getter")?.clone();
        let ty = TypeDescriptor::new(element, vec![array_type, ValueType::INT])?;
        Ok(self.build("array_element_getter", ty, Form::ArrayGet))
    }

    /// `(T[], int, T) -> void`.
    pub fn array_element_setter(&self, array_class: &ClassRef) -> Result<CallableValue> {
        let array_type = ValueType::of(array_class.clone());
        let element = array_component(&array_type, "array setter")?.clone();
        let ty = TypeDescriptor::new(ValueType::VOID, vec![array_type, ValueType::INT, element])?;
        Ok(self.build("array_element_setter", ty, Form::ArraySet))
    }
}

#[cfg(test)]
#[path = "../tests/invoker_tests.rs"]
mod tests;
