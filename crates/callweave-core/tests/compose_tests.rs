use super::*;

fn int_binary(composer: &Composer) -> TypeDescriptor {
    composer
        .method_type(ValueType::INT, vec![ValueType::INT, ValueType::INT])
        .unwrap()
}

fn sub(composer: &Composer) -> CallableValue {
    let ty = int_binary(composer);
    composer.from_fn("sub", &ty, |args| {
        Ok(Value::Int(args[0].try_int()? - args[1].try_int()?))
    })
}

fn cat(composer: &Composer) -> CallableValue {
    let ty = composer
        .method_type(ValueType::string(), vec![ValueType::string(), ValueType::string()])
        .unwrap();
    composer.from_fn("cat", &ty, |args| {
        Ok(Value::from(format!("{}{}", args[0].try_str()?, args[1].try_str()?)))
    })
}

/// `(int, int, int) -> int` computing `a * 100 + b * 10 + c`.
fn digits(composer: &Composer) -> CallableValue {
    let ty = composer
        .method_type(ValueType::INT, vec![ValueType::INT; 3])
        .unwrap();
    composer.from_fn("digits", &ty, |args| {
        Ok(Value::Int(
            args[0].try_int()? * 100 + args[1].try_int()? * 10 + args[2].try_int()?,
        ))
    })
}

fn ints(values: &[i32]) -> Vec<Value> {
    values.iter().copied().map(Value::Int).collect()
}

#[test]
fn test_permute_swaps_arguments() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let swapped = composer
        .permute_arguments(&sub, sub.type_descriptor(), &[1, 0])
        .unwrap();
    assert_eq!(swapped.invoke_exact(&ints(&[1, 100])).unwrap(), Value::Int(99));
}

#[test]
fn test_permute_identity_matches_target() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let same = composer
        .permute_arguments(&digits, digits.type_descriptor(), &[0, 1, 2])
        .unwrap();
    for args in [[1, 2, 3], [0, 0, 0], [-4, 7, 9]] {
        assert_eq!(
            same.invoke_exact(&ints(&args)).unwrap(),
            digits.invoke_exact(&ints(&args)).unwrap()
        );
    }
}

#[test]
fn test_permute_duplicates_and_omits() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let new_type = composer
        .method_type(ValueType::INT, vec![ValueType::INT, ValueType::string(), ValueType::INT])
        .unwrap();
    let permuted = composer
        .permute_arguments(&digits, &new_type, &[2, 0, 0])
        .unwrap();
    let result = permuted
        .invoke_exact(&[Value::Int(4), Value::str("ignored"), Value::Int(7)])
        .unwrap();
    assert_eq!(result, Value::Int(744));
}

#[test]
fn test_permute_validation() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let ty = sub.type_descriptor().clone();

    let short = composer.permute_arguments(&sub, &ty, &[0]).unwrap_err();
    assert!(matches!(short, Error::TypeMismatch(_)));

    let out_of_range = composer.permute_arguments(&sub, &ty, &[0, 2]).unwrap_err();
    assert!(matches!(out_of_range, Error::TypeMismatch(_)));

    let wrong_ret = ty.change_return_type(ValueType::LONG);
    let err = composer.permute_arguments(&sub, &wrong_ret, &[0, 1]).unwrap_err();
    assert!(err.to_string().contains("return types must match"));

    let wrong_param = ty.change_parameter_type(1, ValueType::LONG).unwrap();
    let err = composer.permute_arguments(&sub, &wrong_param, &[1, 0]).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_insert_arguments_splices_values() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let bound = composer
        .insert_arguments(&digits, 1, vec![Value::Int(5)])
        .unwrap();
    assert_eq!(bound.type_descriptor().to_string(), "(int,int)int");
    assert_eq!(bound.invoke_exact(&ints(&[1, 3])).unwrap(), Value::Int(153));

    let all = composer
        .insert_arguments(&digits, 0, ints(&[9, 8, 7]))
        .unwrap();
    assert_eq!(all.invoke_exact(&[]).unwrap(), Value::Int(987));

    let none = composer.insert_arguments(&digits, 3, vec![]).unwrap();
    assert!(none.ptr_eq(&digits));
}

#[test]
fn test_insert_arguments_converts_at_composition() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let widened = composer
        .insert_arguments(&digits, 0, vec![Value::Byte(2)])
        .unwrap();
    assert_eq!(widened.invoke_exact(&ints(&[0, 1])).unwrap(), Value::Int(201));

    let err = composer
        .insert_arguments(&digits, 0, vec![Value::str("x")])
        .unwrap_err();
    assert!(matches!(err, Error::ConversionFailure { .. }));

    let err = composer
        .insert_arguments(&digits, 0, ints(&[1, 2, 3, 4]))
        .unwrap_err();
    assert_eq!(err.to_string(), "type mismatch: too many values to insert");

    let err = composer
        .insert_arguments(&digits, 2, ints(&[1, 2]))
        .unwrap_err();
    assert!(matches!(err, Error::Index { index: 2, .. }));
}

#[test]
fn test_bind_to_requires_leading_reference() {
    let composer = Composer::new();
    let cat = cat(&composer);
    let hello = composer.bind_to(&cat, Value::str("hello ")).unwrap();
    assert_eq!(
        hello.invoke_exact(&[Value::str("world")]).unwrap(),
        Value::str("hello world")
    );

    let err = composer.bind_to(&sub(&composer), Value::Int(1)).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));

    let err = composer.bind_to(&cat, Value::Int(1)).unwrap_err();
    assert!(matches!(err, Error::ConversionFailure { .. }));
}

#[test]
fn test_drop_arguments_scenario() {
    let composer = Composer::new();
    let cat = cat(&composer);
    let dropped = composer
        .drop_arguments(&cat, 1, &[ValueType::INT, ValueType::BOOLEAN])
        .unwrap();
    assert_eq!(dropped.type_descriptor().to_string(), "(String,int,boolean,String)String");
    let result = dropped
        .invoke_exact(&[Value::str("x"), Value::Int(12), Value::Boolean(true), Value::str("z")])
        .unwrap();
    assert_eq!(result, Value::str("xz"));

    // Dropped values never reach the target.
    let other = dropped
        .invoke_exact(&[Value::str("x"), Value::Int(-5), Value::Boolean(false), Value::str("z")])
        .unwrap();
    assert_eq!(other, result);
}

#[test]
fn test_drop_arguments_edges() {
    let composer = Composer::new();
    let cat = cat(&composer);
    assert!(composer.drop_arguments(&cat, 0, &[]).unwrap().ptr_eq(&cat));
    let trailing = composer.drop_arguments(&cat, 2, &[ValueType::LONG]).unwrap();
    assert_eq!(trailing.type_descriptor().to_string(), "(String,String,long)String");
    assert!(matches!(
        composer.drop_arguments(&cat, 3, &[ValueType::LONG]),
        Err(Error::Index { .. })
    ));
}

#[test]
fn test_as_type_widens_and_rejects_narrowing() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let to_long = sub.type_descriptor().change_return_type(ValueType::LONG);
    let widened = composer.as_type(&sub, &to_long).unwrap();
    assert_eq!(widened.invoke_exact(&ints(&[5, 3])).unwrap(), Value::Long(2));

    let from_shorts = composer
        .method_type(ValueType::INT, vec![ValueType::SHORT, ValueType::SHORT])
        .unwrap();
    let adapted = composer.as_type(&sub, &from_shorts).unwrap();
    assert_eq!(
        adapted.invoke_exact(&[Value::Short(5), Value::Short(7)]).unwrap(),
        Value::Int(-2)
    );

    let to_short = sub.type_descriptor().change_return_type(ValueType::SHORT);
    assert!(matches!(
        composer.as_type(&sub, &to_short),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn test_as_type_boxing_and_casts() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let generic = TypeDescriptor::generic_method_type(2).unwrap();
    let boxed = composer.as_type(&sub, &generic).unwrap();
    assert_eq!(boxed.invoke_exact(&ints(&[10, 4])).unwrap(), Value::Int(6));

    let err = boxed.invoke_exact(&[Value::str("10"), Value::Int(4)]).unwrap_err();
    assert!(matches!(err, Error::ConversionFailure { .. }));
    let err = boxed.invoke_exact(&[Value::Null, Value::Int(4)]).unwrap_err();
    assert!(matches!(err, Error::ConversionFailure { .. }));

    let same = composer.as_type(&sub, sub.type_descriptor()).unwrap();
    assert!(same.ptr_eq(&sub));
}

#[test]
fn test_explicit_cast_arguments() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let narrowed = composer
        .method_type(ValueType::BYTE, vec![ValueType::LONG, ValueType::BOOLEAN])
        .unwrap();
    let cast = composer.explicit_cast_arguments(&sub, &narrowed).unwrap();
    // 300 - 1 = 299 -> byte 43.
    assert_eq!(
        cast.invoke_exact(&[Value::Long(300), Value::Boolean(true)]).unwrap(),
        Value::Byte(43)
    );

    let to_bool = sub.type_descriptor().change_return_type(ValueType::BOOLEAN);
    let parity = composer.explicit_cast_arguments(&sub, &to_bool).unwrap();
    assert_eq!(parity.invoke_exact(&ints(&[5, 2])).unwrap(), Value::Boolean(true));
    assert_eq!(parity.invoke_exact(&ints(&[5, 3])).unwrap(), Value::Boolean(false));

    let from_objects = TypeDescriptor::generic_method_type(2).unwrap();
    let unboxing = composer.explicit_cast_arguments(&sub, &from_objects).unwrap();
    assert_eq!(
        unboxing.invoke_exact(&[Value::Null, Value::Int(3)]).unwrap(),
        Value::Int(-3)
    );

    let wrong_arity = TypeDescriptor::generic_method_type(1).unwrap();
    assert!(matches!(
        composer.explicit_cast_arguments(&sub, &wrong_arity),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn test_void_return_conversions() {
    let composer = Composer::new();
    let sub = sub(&composer);
    let discard = sub.type_descriptor().change_return_type(ValueType::VOID);
    let discarding = composer.as_type(&sub, &discard).unwrap();
    assert_eq!(discarding.invoke_exact(&ints(&[1, 2])).unwrap(), Value::Void);

    let noop_ty = composer.method_type(ValueType::VOID, vec![]).unwrap();
    let noop = composer.from_fn("noop", &noop_ty, |_| Ok(Value::Void));
    let zero_ty = noop_ty.change_return_type(ValueType::INT);
    let zero = composer.explicit_cast_arguments(&noop, &zero_ty).unwrap();
    assert_eq!(zero.invoke_exact(&[]).unwrap(), Value::Int(0));
}

#[test]
fn test_constant_and_identity() {
    let composer = Composer::new();
    let seven = composer.constant(ValueType::LONG, Value::Int(7)).unwrap();
    assert_eq!(seven.type_descriptor().to_string(), "()long");
    assert_eq!(seven.invoke_exact(&[]).unwrap(), Value::Long(7));

    let err = composer.constant(ValueType::INT, Value::str("x")).unwrap_err();
    assert!(matches!(err, Error::ConversionFailure { .. }));
    assert!(matches!(
        composer.constant(ValueType::VOID, Value::Void),
        Err(Error::TypeMismatch(_))
    ));

    let id = composer.identity(ValueType::string()).unwrap();
    assert_eq!(id.type_descriptor().to_string(), "(String)String");
    assert_eq!(id.invoke_exact(&[Value::str("s")]).unwrap(), Value::str("s"));
    assert!(composer.identity(ValueType::VOID).is_err());
}

#[test]
fn test_guard_with_test_dispatches_on_prefix() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let reversed = composer
        .permute_arguments(&digits, digits.type_descriptor(), &[2, 1, 0])
        .unwrap();
    let test_ty = composer.method_type(ValueType::BOOLEAN, vec![ValueType::INT]).unwrap();
    let positive = composer.from_fn("positive", &test_ty, |args| {
        Ok(Value::Boolean(args[0].try_int()? > 0))
    });
    let guarded = composer.guard_with_test(&positive, &digits, &reversed).unwrap();
    assert_eq!(guarded.invoke_exact(&ints(&[1, 2, 3])).unwrap(), Value::Int(123));
    assert_eq!(guarded.invoke_exact(&ints(&[0, 2, 3])).unwrap(), Value::Int(320));
}

#[test]
fn test_guard_with_test_validation() {
    let composer = Composer::new();
    let digits = digits(&composer);
    let sub = sub(&composer);
    let test_ty = composer.method_type(ValueType::BOOLEAN, vec![ValueType::INT]).unwrap();
    let test = composer.from_fn("t", &test_ty, |_| Ok(Value::Boolean(true)));

    let err = composer.guard_with_test(&test, &digits, &sub).unwrap_err();
    assert!(err.to_string().contains("target and fallback types must match"));

    let not_bool = composer.identity(ValueType::INT).unwrap();
    assert!(composer.guard_with_test(&not_bool, &sub, &sub).is_err());

    let string_test_ty = composer
        .method_type(ValueType::BOOLEAN, vec![ValueType::string()])
        .unwrap();
    let string_test = composer.from_fn("s", &string_test_ty, |_| Ok(Value::Boolean(true)));
    assert!(composer.guard_with_test(&string_test, &sub, &sub).is_err());

    let too_long_ty = composer
        .method_type(ValueType::BOOLEAN, vec![ValueType::INT; 3])
        .unwrap();
    let too_long = composer.from_fn("l", &too_long_ty, |_| Ok(Value::Boolean(true)));
    assert!(composer.guard_with_test(&too_long, &sub, &sub).is_err());

    // A test over all parameters is allowed.
    let full_ty = composer
        .method_type(ValueType::BOOLEAN, vec![ValueType::INT; 2])
        .unwrap();
    let full = composer.from_fn("f", &full_ty, |_| Ok(Value::Boolean(false)));
    let guarded = composer.guard_with_test(&full, &sub, &sub).unwrap();
    assert_eq!(guarded.invoke_exact(&ints(&[3, 1])).unwrap(), Value::Int(2));
}

fn failing(composer: &Composer, class: ClassRef) -> CallableValue {
    let ty = composer
        .method_type(ValueType::string(), vec![ValueType::string(), ValueType::INT])
        .unwrap();
    composer.from_fn("failing", &ty, move |args| {
        if args[1].try_int()? < 0 {
            return Err(Error::thrown(class.clone(), "negative"));
        }
        Ok(args[0].clone())
    })
}

#[test]
fn test_catch_exception_invokes_handler_on_match() {
    let composer = Composer::new();
    let target = failing(&composer, ClassRef::illegal_argument_exception());
    let handler_ty = composer
        .method_type(
            ValueType::string(),
            vec![ValueType::of(ClassRef::runtime_exception()), ValueType::string()],
        )
        .unwrap();
    let handler = composer.from_fn("handler", &handler_ty, |args| {
        let message = args[0].as_object().and_then(|o| o.message()).unwrap_or("");
        Ok(Value::from(format!("{}:{message}", args[1].try_str()?)))
    });
    let guarded = composer
        .catch_exception(&target, &ClassRef::illegal_argument_exception(), &handler)
        .unwrap();

    assert_eq!(
        guarded.invoke_exact(&[Value::str("ok"), Value::Int(1)]).unwrap(),
        Value::str("ok")
    );
    assert_eq!(
        guarded.invoke_exact(&[Value::str("bad"), Value::Int(-1)]).unwrap(),
        Value::str("bad:negative")
    );
}

#[test]
fn test_catch_exception_propagates_other_failures() {
    let composer = Composer::new();
    let target = failing(&composer, ClassRef::illegal_state_exception());
    let handler_ty = composer
        .method_type(
            ValueType::string(),
            vec![ValueType::of(ClassRef::illegal_argument_exception())],
        )
        .unwrap();
    let handler = composer.from_fn("handler", &handler_ty, |_| {
        panic!("handler must not run")
    });
    let guarded = composer
        .catch_exception(&target, &ClassRef::illegal_argument_exception(), &handler)
        .unwrap();
    let err = guarded
        .invoke_exact(&[Value::str("bad"), Value::Int(-1)])
        .unwrap_err();
    let thrown = err.as_throwable().unwrap();
    assert_eq!(thrown.runtime_class(), Some(ClassRef::illegal_state_exception()));
}

#[test]
fn test_catch_exception_sees_cast_failures() {
    let composer = Composer::new();
    let id = composer.identity(ValueType::string()).unwrap();
    let generic = TypeDescriptor::generic_method_type(1).unwrap();
    let unchecked = composer.as_type(&id, &generic).unwrap();
    let handler_ty = composer
        .method_type(
            ValueType::object(),
            vec![ValueType::of(ClassRef::class_cast_exception())],
        )
        .unwrap();
    let handler = composer.from_fn("fallback", &handler_ty, |_| Ok(Value::str("recovered")));
    let guarded = composer
        .catch_exception(&unchecked, &ClassRef::class_cast_exception(), &handler)
        .unwrap();
    assert_eq!(guarded.invoke_exact(&[Value::Int(1)]).unwrap(), Value::str("recovered"));
    assert_eq!(guarded.invoke_exact(&[Value::str("s")]).unwrap(), Value::str("s"));
}

#[test]
fn test_catch_exception_validation() {
    let composer = Composer::new();
    let target = failing(&composer, ClassRef::illegal_argument_exception());
    let handler_ty = composer
        .method_type(
            ValueType::string(),
            vec![ValueType::of(ClassRef::illegal_argument_exception())],
        )
        .unwrap();
    let handler = composer.from_fn("h", &handler_ty, |_| Ok(Value::str("")));

    let err = composer
        .catch_exception(&target, &ClassRef::string(), &handler)
        .unwrap_err();
    assert!(err.to_string().contains("not a throwable"));

    // Handler parameter narrower than the caught type.
    let err = composer
        .catch_exception(&target, &ClassRef::runtime_exception(), &handler)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));

    let wrong_ret = composer
        .method_type(
            ValueType::INT,
            vec![ValueType::of(ClassRef::illegal_argument_exception())],
        )
        .unwrap();
    let wrong = composer.from_fn("w", &wrong_ret, |_| Ok(Value::Int(0)));
    assert!(composer
        .catch_exception(&target, &ClassRef::illegal_argument_exception(), &wrong)
        .is_err());
}

#[test]
fn test_throw_exception() {
    let composer = Composer::new();
    let thrower = composer
        .throw_exception(ValueType::INT, &ClassRef::illegal_state_exception())
        .unwrap();
    assert_eq!(thrower.type_descriptor().to_string(), "(IllegalStateException)int");

    let ex = Value::exception(ClassRef::illegal_state_exception(), "boom");
    match thrower.invoke_exact(&[ex.clone()]) {
        Err(Error::Thrown(thrown)) => assert_eq!(thrown, ex),
        other => panic!("expected a thrown value, got {other:?}"),
    }

    let err = thrower.invoke_exact(&[Value::Null]).unwrap_err();
    assert_eq!(
        err.as_throwable().unwrap().runtime_class(),
        Some(ClassRef::null_pointer_exception())
    );

    assert!(matches!(
        composer.throw_exception(ValueType::INT, &ClassRef::string()),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn test_invoke_converts_and_counts() {
    let composer = Composer::new();
    let sub = sub(&composer);
    assert_eq!(
        sub.invoke(&[Value::Short(9), Value::Byte(4)]).unwrap(),
        Value::Int(5)
    );
    assert!(matches!(
        sub.invoke(&[Value::Long(9), Value::Int(4)]),
        Err(Error::ConversionFailure { .. })
    ));
    assert!(matches!(
        sub.invoke(&ints(&[1])),
        Err(Error::WrongArgumentCount { expected: 2, found: 1 })
    ));
    assert!(matches!(
        sub.invoke_exact(&ints(&[1, 2, 3])),
        Err(Error::WrongArgumentCount { expected: 2, found: 3 })
    ));
    assert_eq!(sub.invoke_with_arguments(ints(&[3, 1])).unwrap(), Value::Int(2));
}

#[test]
fn test_invoke_exact_rejects_unconverted_arguments() {
    let composer = Composer::new();
    let longs = composer.from_fn(
        "negl",
        &composer
            .method_type(ValueType::LONG, vec![ValueType::LONG])
            .unwrap(),
        |args| Ok(Value::Long(-args[0].try_long()?)),
    );
    assert!(matches!(
        longs.invoke_exact(&[Value::Int(4)]),
        Err(Error::ConversionFailure { .. })
    ));
    assert_eq!(longs.invoke(&[Value::Int(4)]).unwrap(), Value::Long(-4));
    assert_eq!(longs.invoke_exact(&[Value::Long(4)]).unwrap(), Value::Long(-4));
}

#[test]
fn test_results_are_interned() {
    let composer = Composer::new();
    let interned = sub(&composer);
    let a = composer.insert_arguments(&interned, 0, vec![Value::Int(1)]).unwrap();
    let b = composer.insert_arguments(&interned, 1, vec![Value::Int(2)]).unwrap();
    assert!(a.type_descriptor().ptr_eq(b.type_descriptor()));

    let uninterned = Composer::with_config(ComposerConfig {
        intern_types: false,
        ..ComposerConfig::default()
    });
    let sub = sub(&uninterned);
    let a = uninterned.insert_arguments(&sub, 0, vec![Value::Int(1)]).unwrap();
    let b = uninterned.insert_arguments(&sub, 1, vec![Value::Int(2)]).unwrap();
    assert!(!a.type_descriptor().ptr_eq(b.type_descriptor()));
    assert_eq!(a.type_descriptor(), b.type_descriptor());
    assert!(uninterned.types().is_empty());
}
