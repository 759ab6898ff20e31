use super::*;
use crate::value::Value;

fn ty(ret: ValueType, params: Vec<ValueType>) -> TypeDescriptor {
    TypeDescriptor::new(ret, params).unwrap()
}

fn add(composer: &Composer) -> CallableValue {
    composer.from_fn(
        "add",
        &ty(ValueType::INT, vec![ValueType::INT; 2]),
        |args| Ok(Value::Int(args[0].try_int()? + args[1].try_int()?)),
    )
}

fn add3(composer: &Composer) -> CallableValue {
    composer.from_fn(
        "add3",
        &ty(ValueType::INT, vec![ValueType::INT; 3]),
        |args| {
            let mut sum = 0;
            for arg in args {
                sum += arg.try_int()?;
            }
            Ok(Value::Int(sum))
        },
    )
}

fn thrown_class(err: &Error) -> String {
    match err {
        Error::Thrown(Value::Object(object)) => object.class().name().to_string(),
        other => panic!("expected a thrown object, got {other:?}"),
    }
}

// =============================================================================
// Invokers
// =============================================================================

#[test]
fn test_exact_invoker() {
    let composer = Composer::new();
    let add = add(&composer);
    let invoker = composer.exact_invoker(add.type_descriptor()).unwrap();
    assert_eq!(
        invoker.type_descriptor().to_string(),
        "(CallableValue,int,int)int"
    );
    assert_eq!(
        invoker
            .invoke_exact(&[Value::Callable(add.clone()), Value::Int(2), Value::Int(3)])
            .unwrap(),
        Value::Int(5)
    );

    let longs = composer.from_fn(
        "addl",
        &ty(ValueType::LONG, vec![ValueType::LONG; 2]),
        |args| Ok(Value::Long(args[0].try_long()? + args[1].try_long()?)),
    );
    let err = invoker
        .invoke_exact(&[Value::Callable(longs), Value::Int(2), Value::Int(3)])
        .unwrap_err();
    assert!(matches!(err, Error::WrongMethodType { .. }));
    assert_eq!(thrown_class_of(&err), "WrongMethodTypeException");
}

fn thrown_class_of(err: &Error) -> String {
    err.as_throwable()
        .and_then(|v| v.as_object().map(|o| o.class().name().to_string()))
        .unwrap_or_default()
}

#[test]
fn test_general_invoker_converts_callee() {
    let composer = Composer::new();
    let longs = composer.from_fn(
        "addl",
        &ty(ValueType::LONG, vec![ValueType::LONG; 2]),
        |args| Ok(Value::Long(args[0].try_long()? + args[1].try_long()?)),
    );

    let widening = composer
        .invoker(&ty(ValueType::LONG, vec![ValueType::INT; 2]))
        .unwrap();
    assert_eq!(
        widening
            .invoke_exact(&[Value::Callable(longs.clone()), Value::Int(2), Value::Int(3)])
            .unwrap(),
        Value::Long(5)
    );

    let narrowing = composer
        .invoker(&ty(ValueType::INT, vec![ValueType::INT; 2]))
        .unwrap();
    assert!(matches!(
        narrowing.invoke_exact(&[Value::Callable(longs), Value::Int(2), Value::Int(3)]),
        Err(Error::TypeMismatch(_))
    ));

    // A null callee is a null dereference.
    let err = widening
        .invoke_exact(&[Value::Null, Value::Int(1), Value::Int(1)])
        .unwrap_err();
    assert_eq!(thrown_class(&err), "NullPointerException");
}

#[test]
fn test_spread_invoker() {
    let composer = Composer::new();
    let add = add(&composer);
    let invoker = composer.spread_invoker(add.type_descriptor(), 1).unwrap();
    assert_eq!(
        invoker.type_descriptor().to_string(),
        "(CallableValue,int,Object[])int"
    );

    let rest = Value::array(ValueType::object(), vec![Value::Int(2)]);
    assert_eq!(
        invoker
            .invoke_exact(&[Value::Callable(add.clone()), Value::Int(1), rest])
            .unwrap(),
        Value::Int(3)
    );

    let too_long = Value::array(ValueType::object(), vec![Value::Int(2), Value::Int(3)]);
    assert!(matches!(
        invoker.invoke_exact(&[Value::Callable(add.clone()), Value::Int(1), too_long]),
        Err(Error::WrongArgumentCount {
            expected: 1,
            found: 2
        })
    ));

    let wrong_element = Value::array(ValueType::object(), vec![Value::str("2")]);
    assert!(matches!(
        invoker.invoke_exact(&[Value::Callable(add.clone()), Value::Int(1), wrong_element]),
        Err(Error::ConversionFailure { .. })
    ));

    // Nothing left to spread: a null array stands for no arguments.
    let all_leading = composer.spread_invoker(add.type_descriptor(), 2).unwrap();
    assert_eq!(
        all_leading
            .invoke_exact(&[Value::Callable(add.clone()), Value::Int(4), Value::Int(5), Value::Null])
            .unwrap(),
        Value::Int(9)
    );

    assert!(matches!(
        composer.spread_invoker(add.type_descriptor(), 3),
        Err(Error::Index { index: 3, limit: 3 })
    ));
}

// =============================================================================
// Spreaders and collectors
// =============================================================================

#[test]
fn test_as_spreader() {
    let composer = Composer::new();
    let add3 = add3(&composer);
    let int_array = ValueType::array_of(ValueType::INT);

    let spread = composer.as_spreader(&add3, &int_array, 2).unwrap();
    assert_eq!(spread.type_descriptor().to_string(), "(int,int[])int");
    let tail = Value::array(ValueType::INT, vec![Value::Int(2), Value::Int(3)]);
    assert_eq!(spread.invoke_exact(&[Value::Int(1), tail]).unwrap(), Value::Int(6));

    let boxed = composer.as_spreader(&add3, &ValueType::object_array(), 3).unwrap();
    let all = Value::array(
        ValueType::object(),
        vec![Value::Int(1), Value::Short(2), Value::Byte(3)],
    );
    assert_eq!(boxed.invoke_exact(&[all]).unwrap(), Value::Int(6));
    let bad = Value::array(
        ValueType::object(),
        vec![Value::Int(1), Value::str("2"), Value::Int(3)],
    );
    assert!(matches!(
        boxed.invoke_exact(&[bad]),
        Err(Error::ConversionFailure { .. })
    ));

    assert!(matches!(
        composer.as_spreader(&add3, &ValueType::INT, 1),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        composer.as_spreader(&add3, &int_array, 4),
        Err(Error::Index { .. })
    ));
    let strings = ValueType::array_of(ValueType::string());
    assert!(matches!(
        composer.as_spreader(&add3, &strings, 1),
        Err(Error::TypeMismatch(_))
    ));
}

fn sum_array(composer: &Composer) -> CallableValue {
    composer.from_fn(
        "sum",
        &ty(ValueType::INT, vec![ValueType::array_of(ValueType::INT)]),
        |args| {
            let mut sum = 0;
            for element in args[0].try_array()?.to_vec() {
                sum += element.try_int()?;
            }
            Ok(Value::Int(sum))
        },
    )
}

#[test]
fn test_as_collector() {
    let composer = Composer::new();
    let sum = sum_array(&composer);
    let int_array = ValueType::array_of(ValueType::INT);

    let three = composer.as_collector(&sum, &int_array, 3).unwrap();
    assert_eq!(three.type_descriptor().to_string(), "(int,int,int)int");
    assert_eq!(
        three
            .invoke_exact(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap(),
        Value::Int(6)
    );

    let none = composer.as_collector(&sum, &int_array, 0).unwrap();
    assert_eq!(none.type_descriptor().to_string(), "()int");
    assert_eq!(none.invoke_exact(&[]).unwrap(), Value::Int(0));

    let add = add(&composer);
    assert!(matches!(
        composer.as_collector(&add, &int_array, 2),
        Err(Error::TypeMismatch(_))
    ));
}

fn format_all(composer: &Composer) -> CallableValue {
    composer.from_fn(
        "format",
        &ty(
            ValueType::string(),
            vec![ValueType::string(), ValueType::object_array()],
        ),
        |args| {
            let parts: Vec<String> = args[1]
                .try_array()?
                .to_vec()
                .iter()
                .map(ToString::to_string)
                .collect();
            Ok(Value::str(&format!("{}[{}]", args[0].try_str()?, parts.join(","))))
        },
    )
}

#[test]
fn test_varargs_collector_invoke() {
    let composer = Composer::new();
    let format = format_all(&composer);
    assert!(!format.is_varargs_collector());

    let varargs = composer
        .as_varargs_collector(&format, &ValueType::object_array())
        .unwrap();
    assert!(varargs.is_varargs_collector());
    assert!(varargs.to_string().ends_with("..."));
    assert!(varargs.type_descriptor().ptr_eq(format.type_descriptor()));

    assert_eq!(
        varargs
            .invoke(&[Value::str("a"), Value::Int(1), Value::Int(2)])
            .unwrap(),
        Value::str("a[1,2]")
    );
    assert_eq!(varargs.invoke(&[Value::str("b")]).unwrap(), Value::str("b[]"));

    // An argument that already fits the array slot passes through.
    let packed = Value::array(ValueType::object(), vec![Value::Int(7)]);
    assert_eq!(
        varargs.invoke(&[Value::str("c"), packed]).unwrap(),
        Value::str("c[7]")
    );

    // Exact invocation never collects.
    assert!(matches!(
        varargs.invoke_exact(&[Value::str("a"), Value::Int(1), Value::Int(2)]),
        Err(Error::WrongArgumentCount { .. })
    ));
    assert!(matches!(
        varargs.invoke(&[]),
        Err(Error::WrongArgumentCount { .. })
    ));
}

#[test]
fn test_varargs_collector_as_type() {
    let composer = Composer::new();
    let varargs = composer
        .as_varargs_collector(&format_all(&composer), &ValueType::object_array())
        .unwrap();

    let fixed = composer
        .as_type(
            &varargs,
            &ty(
                ValueType::string(),
                vec![ValueType::string(), ValueType::INT, ValueType::INT],
            ),
        )
        .unwrap();
    assert_eq!(fixed.type_descriptor().to_string(), "(String,int,int)String");
    assert_eq!(
        fixed
            .invoke_exact(&[Value::str("x"), Value::Int(3), Value::Int(4)])
            .unwrap(),
        Value::str("x[3,4]")
    );

    assert!(matches!(
        composer.as_type(&varargs, &ty(ValueType::string(), vec![])),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn test_varargs_as_type_collects_at_equal_arity() {
    let composer = Composer::new();
    let varargs = composer
        .as_varargs_collector(&format_all(&composer), &ValueType::object_array())
        .unwrap();

    // `int` is not assignable to `Object[]`, so the single trailing
    // argument is collected.
    let single = composer
        .as_type(&varargs, &ty(ValueType::string(), vec![ValueType::string(), ValueType::INT]))
        .unwrap();
    assert_eq!(single.type_descriptor().to_string(), "(String,int)String");
    assert_eq!(
        single.invoke_exact(&[Value::str("x"), Value::Int(3)]).unwrap(),
        Value::str("x[3]")
    );
    assert_eq!(
        single.invoke_exact(&[Value::str("x"), Value::Int(3)]).unwrap(),
        varargs.invoke(&[Value::str("x"), Value::Int(3)]).unwrap()
    );

    // An array type in the trailing slot keeps the fixed arity.
    let passthrough = composer
        .as_type(
            &varargs,
            &ty(
                ValueType::string(),
                vec![ValueType::string(), ValueType::object_array()],
            ),
        )
        .unwrap();
    let packed = Value::array(ValueType::object(), vec![Value::Int(7), Value::Int(8)]);
    assert_eq!(
        passthrough.invoke_exact(&[Value::str("y"), packed]).unwrap(),
        Value::str("y[7,8]")
    );
}

#[test]
fn test_general_invoker_collects_varargs_callee() {
    let composer = Composer::new();
    let varargs = composer
        .as_varargs_collector(&format_all(&composer), &ValueType::object_array())
        .unwrap();
    let expected = ty(
        ValueType::string(),
        vec![ValueType::string(), ValueType::INT, ValueType::INT],
    );

    let invoker = composer.invoker(&expected).unwrap();
    assert_eq!(
        invoker
            .invoke_exact(&[
                Value::Callable(varargs.clone()),
                Value::str("x"),
                Value::Int(3),
                Value::Int(4),
            ])
            .unwrap(),
        Value::str("x[3,4]")
    );

    let spread = composer.spread_invoker(&expected, 1).unwrap();
    let rest = Value::array(ValueType::object(), vec![Value::Int(5), Value::Int(6)]);
    assert_eq!(
        spread
            .invoke_exact(&[Value::Callable(varargs), Value::str("z"), rest])
            .unwrap(),
        Value::str("z[5,6]")
    );
}

#[test]
fn test_varargs_collector_rejects_non_array() {
    let composer = Composer::new();
    let add = add(&composer);
    assert!(matches!(
        composer.as_varargs_collector(&add, &ValueType::array_of(ValueType::INT)),
        Err(Error::TypeMismatch(_))
    ));
    let format = format_all(&composer);
    assert!(matches!(
        composer.as_varargs_collector(&format, &ValueType::INT),
        Err(Error::TypeMismatch(_))
    ));
}

// =============================================================================
// Array element accessors
// =============================================================================

#[test]
fn test_array_element_round_trip() {
    let composer = Composer::new();
    let int_array = ClassRef::array_of(ValueType::INT);
    let getter = composer.array_element_getter(&int_array).unwrap();
    let setter = composer.array_element_setter(&int_array).unwrap();
    assert_eq!(getter.type_descriptor().to_string(), "(int[],int)int");
    assert_eq!(setter.type_descriptor().to_string(), "(int[],int,int)void");

    let array = Value::new_array(ValueType::INT, 3);
    assert_eq!(
        setter
            .invoke_exact(&[array.clone(), Value::Int(1), Value::Int(7)])
            .unwrap(),
        Value::Void
    );
    assert_eq!(
        getter.invoke_exact(&[array.clone(), Value::Int(1)]).unwrap(),
        Value::Int(7)
    );
    assert_eq!(
        getter.invoke_exact(&[array, Value::Int(0)]).unwrap(),
        Value::Int(0)
    );
}

#[test]
fn test_array_element_failures_are_throwables() {
    let composer = Composer::new();
    let int_array = ClassRef::array_of(ValueType::INT);
    let getter = composer.array_element_getter(&int_array).unwrap();
    let array = Value::new_array(ValueType::INT, 2);

    let err = getter
        .invoke_exact(&[array.clone(), Value::Int(5)])
        .unwrap_err();
    assert_eq!(thrown_class(&err), "ArrayIndexOutOfBoundsException");
    let err = getter.invoke_exact(&[Value::Null, Value::Int(0)]).unwrap_err();
    assert_eq!(thrown_class(&err), "NullPointerException");

    let handler = composer.from_fn(
        "on_bounds",
        &ty(ValueType::INT, vec![ValueType::of(ClassRef::throwable())]),
        |_| Ok(Value::Int(-1)),
    );
    let guarded = composer
        .catch_exception(&getter, &ClassRef::array_index_out_of_bounds_exception(), &handler)
        .unwrap();
    assert_eq!(
        guarded.invoke_exact(&[array.clone(), Value::Int(5)]).unwrap(),
        Value::Int(-1)
    );
    assert_eq!(
        guarded.invoke_exact(&[array, Value::Int(-1)]).unwrap(),
        Value::Int(-1)
    );
    // Not the caught class: propagates.
    assert!(guarded.invoke_exact(&[Value::Null, Value::Int(0)]).is_err());
}

#[test]
fn test_covariant_array_store() {
    let composer = Composer::new();
    let setter = composer
        .array_element_setter(&ClassRef::array_of(ValueType::object()))
        .unwrap();
    let strings = Value::new_array(ValueType::string(), 1);
    setter
        .invoke_exact(&[strings.clone(), Value::Int(0), Value::str("ok")])
        .unwrap();
    let err = setter
        .invoke_exact(&[strings, Value::Int(0), Value::Int(1)])
        .unwrap_err();
    assert_eq!(thrown_class(&err), "ArrayStoreException");
}

#[test]
fn test_array_accessors_need_array_class() {
    let composer = Composer::new();
    assert!(matches!(
        composer.array_element_getter(&ClassRef::string()),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        composer.array_element_setter(&ClassRef::object()),
        Err(Error::TypeMismatch(_))
    ));
}
