//! Built-in composition scenarios.
//!
//! Each scenario composes a small pipeline on a fresh `Composer` and checks
//! the rendered result of one invocation.

use std::io::Write;

use anyhow::Result;
use callweave::{
    ClassRef, Composer, ComposerConfig, Error, TypeDescriptor, Value, ValueType,
};
use colored::Colorize;
use tracing::debug;

pub struct Scenario {
    pub name: &'static str,
    pub expected: &'static str,
    /// Only meaningful with `dynamic_shapes` on.
    pub needs_dynamic_shapes: bool,
    run: fn(&Composer) -> callweave::Result<Value>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub fn all() -> &'static [Scenario] {
    &SCENARIOS
}

static SCENARIOS: [Scenario; 13] = [
    scenario("permute_swap", "99", permute_swap),
    scenario("filter_first", "Xy", filter_first),
    scenario("filter_both", "XY", filter_both),
    scenario("filter_skip_null", "xY", filter_skip_null),
    scenario("drop_middle", "xz", drop_middle),
    scenario("fold_prefix", "734", fold_prefix),
    scenario("collect_tail", "33", collect_tail),
    scenario("guard_sign", "neg", guard_sign),
    scenario("catch_out_of_bounds", "-1", catch_out_of_bounds),
    scenario("spread_tail", "6", spread_tail),
    scenario("varargs_format", "a[1,2]", varargs_format),
    scenario("shared_value_shape", "1 shape, 1000 instances", shared_value_shape),
    Scenario {
        name: "wide_filter",
        expected: "229",
        needs_dynamic_shapes: true,
        run: wide_filter,
    },
];

const fn scenario(
    name: &'static str,
    expected: &'static str,
    run: fn(&Composer) -> callweave::Result<Value>,
) -> Scenario {
    Scenario {
        name,
        expected,
        needs_dynamic_shapes: false,
        run,
    }
}

/// Run every scenario whose name contains `filter`, one fresh composer each.
pub fn run_all(config: &ComposerConfig, filter: Option<&str>, out: &mut dyn Write) -> Result<Summary> {
    let mut summary = Summary::default();
    for scenario in SCENARIOS
        .iter()
        .filter(|s| filter.is_none_or(|f| s.name.contains(f)))
    {
        if scenario.needs_dynamic_shapes && !config.dynamic_shapes {
            writeln!(out, "{} {} (needs --dynamic-shapes)", "SKIP".yellow(), scenario.name)?;
            summary.skipped += 1;
            continue;
        }
        let composer = Composer::with_config(config.clone());
        let outcome = (scenario.run)(&composer);
        debug!(scenario = scenario.name, ok = outcome.is_ok(), "scenarios::run_all");
        match outcome {
            Ok(value) if value.to_string() == scenario.expected => {
                writeln!(out, "{} {}", "PASS".green(), scenario.name)?;
                summary.passed += 1;
            }
            Ok(value) => {
                writeln!(
                    out,
                    "{} {}: expected {}, got {}",
                    "FAIL".red(),
                    scenario.name,
                    scenario.expected,
                    value.describe()
                )?;
                summary.failed += 1;
            }
            Err(err) => {
                writeln!(out, "{} {}: {err}", "FAIL".red(), scenario.name)?;
                summary.failed += 1;
            }
        }
    }
    writeln!(
        out,
        "{} passed, {} failed, {} skipped",
        summary.passed, summary.failed, summary.skipped
    )?;
    Ok(summary)
}

// =============================================================================
// Building blocks
// =============================================================================

fn method(composer: &Composer, ret: ValueType, params: Vec<ValueType>) -> callweave::Result<TypeDescriptor> {
    composer.method_type(ret, params)
}

fn cat(composer: &Composer) -> callweave::Result<callweave::CallableValue> {
    let ty = method(composer, ValueType::string(), vec![ValueType::string(); 2])?;
    Ok(composer.from_fn("cat", &ty, |args| {
        Ok(Value::str(&format!("{}{}", args[0].try_str()?, args[1].try_str()?)))
    }))
}

fn upcase(composer: &Composer) -> callweave::Result<callweave::CallableValue> {
    let ty = method(composer, ValueType::string(), vec![ValueType::string()])?;
    Ok(composer.from_fn("upcase", &ty, |args| {
        Ok(Value::str(&args[0].try_str()?.to_uppercase()))
    }))
}

fn int_sum(composer: &Composer, name: &str, arity: usize) -> callweave::Result<callweave::CallableValue> {
    let ty = method(composer, ValueType::INT, vec![ValueType::INT; arity])?;
    Ok(composer.from_fn(name, &ty, |args| {
        let mut sum = 0i32;
        for arg in args {
            sum = sum.wrapping_add(arg.try_int()?);
        }
        Ok(Value::Int(sum))
    }))
}

// =============================================================================
// Scenarios
// =============================================================================

fn permute_swap(composer: &Composer) -> callweave::Result<Value> {
    let ty = method(composer, ValueType::INT, vec![ValueType::INT; 2])?;
    let sub = composer.from_fn("sub", &ty, |args| {
        Ok(Value::Int(args[0].try_int()? - args[1].try_int()?))
    });
    let swapped = composer.permute_arguments(&sub, &ty, &[1, 0])?;
    swapped.invoke_exact(&[Value::Int(1), Value::Int(100)])
}

fn filter_first(composer: &Composer) -> callweave::Result<Value> {
    let filtered = composer.filter_arguments(&cat(composer)?, 0, &[Some(upcase(composer)?)])?;
    filtered.invoke_exact(&[Value::str("x"), Value::str("y")])
}

fn filter_both(composer: &Composer) -> callweave::Result<Value> {
    let up = upcase(composer)?;
    let filtered = composer.filter_arguments(&cat(composer)?, 0, &[Some(up.clone()), Some(up)])?;
    filtered.invoke_exact(&[Value::str("x"), Value::str("y")])
}

fn filter_skip_null(composer: &Composer) -> callweave::Result<Value> {
    let filtered = composer.filter_arguments(&cat(composer)?, 0, &[None, Some(upcase(composer)?)])?;
    filtered.invoke_exact(&[Value::str("x"), Value::str("y")])
}

fn drop_middle(composer: &Composer) -> callweave::Result<Value> {
    let dropped =
        composer.drop_arguments(&cat(composer)?, 1, &[ValueType::INT, ValueType::BOOLEAN])?;
    dropped.invoke_exact(&[
        Value::str("x"),
        Value::Int(12),
        Value::Boolean(true),
        Value::str("z"),
    ])
}

fn fold_prefix(composer: &Composer) -> callweave::Result<Value> {
    let ty = method(composer, ValueType::INT, vec![ValueType::INT; 3])?;
    let digits = composer.from_fn("digits", &ty, |args| {
        Ok(Value::Int(
            args[0].try_int()? * 100 + args[1].try_int()? * 10 + args[2].try_int()?,
        ))
    });
    let folded = composer.fold_arguments(&digits, &int_sum(composer, "sum", 2)?)?;
    folded.invoke_exact(&[Value::Int(3), Value::Int(4)])
}

fn collect_tail(composer: &Composer) -> callweave::Result<Value> {
    let ty = method(composer, ValueType::INT, vec![ValueType::INT; 2])?;
    let weighted = composer.from_fn("weighted", &ty, |args| {
        Ok(Value::Int(args[0].try_int()? + 2 * args[1].try_int()?))
    });
    let collected = composer.collect_arguments(&weighted, 1, &int_sum(composer, "sum3", 3)?)?;
    // 5 + 2 * (1 + 2 + 11)
    collected.invoke_exact(&[Value::Int(5), Value::Int(1), Value::Int(2), Value::Int(11)])
}

fn guard_sign(composer: &Composer) -> callweave::Result<Value> {
    let test_ty = method(composer, ValueType::BOOLEAN, vec![ValueType::INT])?;
    let positive = composer.from_fn("positive", &test_ty, |args| {
        Ok(Value::Boolean(args[0].try_int()? > 0))
    });
    let ty = method(composer, ValueType::string(), vec![ValueType::INT])?;
    let pos = composer.from_fn("pos", &ty, |_| Ok(Value::str("pos")));
    let neg = composer.from_fn("neg", &ty, |_| Ok(Value::str("neg")));
    let guarded = composer.guard_with_test(&positive, &pos, &neg)?;
    guarded.invoke_exact(&[Value::Int(-5)])
}

fn catch_out_of_bounds(composer: &Composer) -> callweave::Result<Value> {
    let getter = composer.array_element_getter(&ClassRef::array_of(ValueType::INT))?;
    let handler_ty = method(
        composer,
        ValueType::INT,
        vec![ValueType::of(ClassRef::array_index_out_of_bounds_exception())],
    )?;
    let handler = composer.from_fn("on_bounds", &handler_ty, |_| Ok(Value::Int(-1)));
    let caught = composer.catch_exception(
        &getter,
        &ClassRef::array_index_out_of_bounds_exception(),
        &handler,
    )?;
    caught.invoke_exact(&[Value::new_array(ValueType::INT, 2), Value::Int(2)])
}

fn spread_tail(composer: &Composer) -> callweave::Result<Value> {
    let spread = composer.as_spreader(
        &int_sum(composer, "sum3", 3)?,
        &ValueType::array_of(ValueType::INT),
        2,
    )?;
    spread.invoke_exact(&[
        Value::Int(1),
        Value::array(ValueType::INT, vec![Value::Int(2), Value::Int(3)]),
    ])
}

fn varargs_format(composer: &Composer) -> callweave::Result<Value> {
    let ty = method(
        composer,
        ValueType::string(),
        vec![ValueType::string(), ValueType::object_array()],
    )?;
    let format = composer.from_fn("format", &ty, |args| {
        let parts: Vec<String> = args[1]
            .try_array()?
            .to_vec()
            .iter()
            .map(ToString::to_string)
            .collect();
        Ok(Value::str(&format!("{}[{}]", args[0].try_str()?, parts.join(","))))
    });
    let varargs = composer.as_varargs_collector(&format, &ValueType::object_array())?;
    varargs.invoke(&[Value::str("a"), Value::Int(1), Value::Int(2)])
}

fn shared_value_shape(composer: &Composer) -> callweave::Result<Value> {
    let filter = composer.identity(ValueType::object())?;
    let ty = method(composer, ValueType::object(), vec![ValueType::object(); 2])?;
    for i in 0..1000 {
        let target = composer.from_fn("pick", &ty, |args| Ok(args[1].clone()));
        let adapted = composer.filter_argument(&target, 1, &filter)?;
        if adapted.invoke_exact(&[Value::Null, Value::Int(i)])? != Value::Int(i) {
            return Err(Error::thrown(
                ClassRef::illegal_state_exception(),
                format!("adapter {i} returned the wrong value"),
            ));
        }
    }
    let stats = composer.shapes().stats();
    let noun = if stats.shapes == 1 { "shape" } else { "shapes" };
    Ok(Value::str(&format!(
        "{} {noun}, {} instances",
        stats.shapes, stats.instances
    )))
}

fn wide_filter(composer: &Composer) -> callweave::Result<Value> {
    let arity = callweave::MAX_STATIC_SHAPE_ARITY + 1;
    let ty = method(composer, ValueType::INT, vec![ValueType::INT; arity])?;
    let weighted = composer.from_fn("weighted", &ty, |args| {
        let mut sum = 0;
        for (i, arg) in args.iter().enumerate() {
            sum += (i as i32 + 1) * arg.try_int()?;
        }
        Ok(Value::Int(sum))
    });
    let negate_ty = method(composer, ValueType::INT, vec![ValueType::INT])?;
    let negate = composer.from_fn("negate", &negate_ty, |args| Ok(Value::Int(-args[0].try_int()?)));
    let filtered = composer.filter_argument(&weighted, 0, &negate)?;
    filtered.invoke_exact(&vec![Value::Int(1); arity])
}
