use crate::atomize::{AtomizeMode, atomize_optional, atomize_value};
use crate::engine::EvaluationContext;
use crate::error::Error;
use crate::node::XdmNode;
use crate::promote::{PromotionContext, promote};
use crate::types::{XdmItem, XdmValue};

/// The string form of one argument: empty is `""`, more than one item is
/// a cardinality error, anyURI and untyped promote through the string
/// context.
fn string_arg<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<String, Error> {
    match atomize_optional(value, AtomizeMode::Lenient)? {
        None => Ok(String::new()),
        Some(atom) => {
            Ok(promote(&atom, PromotionContext::StringContext, None)?.to_string_value())
        }
    }
}

fn context_string<'a, N: XdmNode<'a> + 'a>(
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<String, Error> {
    match &ctx.context_item {
        Some(XdmItem::Node(n)) => Ok(n.string_value()),
        Some(XdmItem::Atomic(a)) => Ok(a.to_string_value()),
        Some(other) => Err(Error::type_error(format!(
            "cannot convert {} to a string",
            other.type_name()
        ))),
        None => Err(Error::NoContextItem),
    }
}

pub fn fn_string<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    let s = match args.as_slice() {
        [] => context_string(ctx)?,
        [value] => string_arg(value)?,
        _ => return Err(Error::function("string", "expected 0 or 1 arguments")),
    };
    Ok(XdmValue::from_string(s))
}

pub fn fn_concat<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    if args.len() < 2 {
        return Err(Error::function("concat", "expected at least 2 arguments"));
    }
    let mut out = String::new();
    for arg in &args {
        out.push_str(&string_arg(arg)?);
    }
    Ok(XdmValue::from_string(out))
}

pub fn fn_string_length<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    let s = match args.as_slice() {
        [] => context_string(ctx)?,
        [value] => string_arg(value)?,
        _ => {
            return Err(Error::function(
                "string-length",
                "expected 0 or 1 arguments",
            ));
        }
    };
    Ok(XdmValue::from_integer(s.chars().count() as i64))
}

/// 1-based character positions; fractional positions round half up,
/// NaN bounds select nothing.
pub fn fn_substring<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    if args.len() != 2 && args.len() != 3 {
        return Err(Error::function("substring", "expected 2 or 3 arguments"));
    }
    let source = string_arg(&args[0])?;
    let start = number_arg(&args[1])?;
    let length = match args.get(2) {
        Some(value) => Some(number_arg(value)?),
        None => None,
    };

    let start = round_position(start);
    let end = match length {
        Some(len) => {
            let end = start + round_position(len);
            if end.is_nan() {
                return Ok(XdmValue::from_string(String::new()));
            }
            end
        }
        None => f64::INFINITY,
    };
    if start.is_nan() {
        return Ok(XdmValue::from_string(String::new()));
    }

    let result: String = source
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    Ok(XdmValue::from_string(result))
}

fn number_arg<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<f64, Error> {
    Ok(atomize_optional(value, AtomizeMode::Lenient)?
        .map(|a| a.to_double())
        .unwrap_or(f64::NAN))
}

fn round_position(d: f64) -> f64 {
    if d.is_finite() { (d + 0.5).floor() } else { d }
}

pub fn fn_contains<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    let (haystack, needle) = two_strings("contains", &args)?;
    Ok(XdmValue::from_bool(haystack.contains(&needle)))
}

pub fn fn_starts_with<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let (haystack, needle) = two_strings("starts-with", &args)?;
    Ok(XdmValue::from_bool(haystack.starts_with(&needle)))
}

pub fn fn_ends_with<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let (haystack, needle) = two_strings("ends-with", &args)?;
    Ok(XdmValue::from_bool(haystack.ends_with(&needle)))
}

fn two_strings<'a, N: XdmNode<'a> + 'a>(
    function: &str,
    args: &[XdmValue<N>],
) -> Result<(String, String), Error> {
    let [first, second] = args else {
        return Err(Error::function(function, "expected 2 arguments"));
    };
    Ok((string_arg(first)?, string_arg(second)?))
}

pub fn fn_upper_case<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [value] = args.as_slice() else {
        return Err(Error::function("upper-case", "expected 1 argument"));
    };
    Ok(XdmValue::from_string(string_arg(value)?.to_uppercase()))
}

pub fn fn_lower_case<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    let [value] = args.as_slice() else {
        return Err(Error::function("lower-case", "expected 1 argument"));
    };
    Ok(XdmValue::from_string(string_arg(value)?.to_lowercase()))
}

pub fn fn_normalize_space<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    let s = match args.as_slice() {
        [] => context_string(ctx)?,
        [value] => string_arg(value)?,
        _ => {
            return Err(Error::function(
                "normalize-space",
                "expected 0 or 1 arguments",
            ));
        }
    };
    Ok(XdmValue::from_string(
        s.split_whitespace().collect::<Vec<_>>().join(" "),
    ))
}

pub fn fn_string_join<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
) -> Result<XdmValue<N>, Error> {
    if args.is_empty() || args.len() > 2 {
        return Err(Error::function("string-join", "expected 1 or 2 arguments"));
    }
    let separator = match args.get(1) {
        Some(sep) => string_arg(sep)?,
        None => String::new(),
    };
    let parts: Vec<String> = atomize_value(&args[0], AtomizeMode::Lenient)?
        .iter()
        .map(|a| a.to_string_value())
        .collect();
    Ok(XdmValue::from_string(parts.join(&separator)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AtomicValue;
    use std::collections::HashMap;

    type Value = XdmValue<crate::node::tests::MockNode<'static>>;

    #[test]
    fn test_string_of_empty_is_empty_string() {
        let variables = HashMap::new();
        let ctx = EvaluationContext::new(None, None, &variables);
        assert_eq!(
            fn_string(vec![Value::empty()], &ctx).unwrap(),
            Value::from_string("")
        );
        // With no argument and no context item, there is nothing to
        // stringify.
        assert!(fn_string(vec![], &ctx).is_err());
    }

    #[test]
    fn test_concat() {
        let result = fn_concat(vec![
            Value::from_string("a"),
            Value::from_integer(1),
            Value::empty(),
            Value::from_string("b"),
        ])
        .unwrap();
        assert_eq!(result, Value::from_string("a1b"));
        assert!(fn_concat(vec![Value::from_string("only")]).is_err());
    }

    #[test]
    fn test_substring_positions() {
        let sub = |s: &str, start: f64| {
            fn_substring(vec![
                Value::from_string(s),
                Value::from_double(start),
            ])
            .unwrap()
            .to_string_value()
        };
        assert_eq!(sub("motor car", 6.0), " car");
        assert_eq!(
            fn_substring(vec![
                Value::from_string("metadata"),
                Value::from_double(4.0),
                Value::from_double(3.0),
            ])
            .unwrap()
            .to_string_value(),
            "ada"
        );
        // Fractional start and length both round.
        assert_eq!(
            fn_substring(vec![
                Value::from_string("12345"),
                Value::from_double(1.5),
                Value::from_double(2.6),
            ])
            .unwrap()
            .to_string_value(),
            "234"
        );
        assert_eq!(
            fn_substring(vec![
                Value::from_string("12345"),
                Value::from_double(f64::NAN),
            ])
            .unwrap()
            .to_string_value(),
            ""
        );
    }

    #[test]
    fn test_contains_family() {
        let args = |a: &str, b: &str| vec![Value::from_string(a), Value::from_string(b)];
        assert!(fn_contains(args("haystack", "stack")).unwrap().effective_boolean_value());
        assert!(fn_starts_with(args("haystack", "hay")).unwrap().effective_boolean_value());
        assert!(fn_ends_with(args("haystack", "stack")).unwrap().effective_boolean_value());
        assert!(!fn_contains(args("haystack", "needle")).unwrap().effective_boolean_value());
    }

    #[test]
    fn test_normalize_space() {
        let variables = HashMap::new();
        let ctx = EvaluationContext::new(None, None, &variables);
        assert_eq!(
            fn_normalize_space(vec![Value::from_string("  a\t b \n c ")], &ctx).unwrap(),
            Value::from_string("a b c")
        );
    }

    #[test]
    fn test_string_join() {
        let seq = Value::from_items(vec![
            XdmItem::Atomic(AtomicValue::Integer(1)),
            XdmItem::Atomic(AtomicValue::Integer(2)),
            XdmItem::Atomic(AtomicValue::Integer(3)),
        ]);
        assert_eq!(
            fn_string_join(vec![seq, Value::from_string("-")]).unwrap(),
            Value::from_string("1-2-3")
        );
        assert_eq!(
            fn_string_join(vec![Value::empty()]).unwrap(),
            Value::from_string("")
        );
    }
}
