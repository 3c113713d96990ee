use rust_decimal::Decimal;

use crate::atomize::{AtomizeMode, atomize_optional, atomize_value};
use crate::engine::EvaluationContext;
use crate::error::Error;
use crate::node::XdmNode;
use crate::promote::{PromotionContext, promote};
use crate::types::{AtomicValue, XdmValue};

/// `number()`: the 1.0-style coercion that never fails — anything
/// unparseable, and the empty sequence, becomes NaN.
pub fn fn_number<'a, N: XdmNode<'a> + 'a>(
    args: Vec<XdmValue<N>>,
    ctx: &EvaluationContext<'a, '_, N>,
) -> Result<XdmValue<N>, Error> {
    if args.len() > 1 {
        return Err(Error::function("number", "expected 0 or 1 arguments"));
    }
    let value = match args.into_iter().next() {
        Some(v) => v,
        None => match &ctx.context_item {
            Some(item) => XdmValue::from_item(item.clone()),
            None => return Err(Error::NoContextItem),
        },
    };
    let atoms = atomize_value(&value, AtomizeMode::Lenient)?;
    let result = match atoms.as_slice() {
        [] => f64::NAN,
        [atom] => atom.to_double(),
        _ => {
            return Err(Error::Cardinality {
                expected: "at most one atomic value".to_string(),
                actual: atoms.len(),
            });
        }
    };
    Ok(XdmValue::from_double(result))
}

pub fn fn_abs<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    apply_numeric("abs", args, |atom| {
        Ok(match atom {
            AtomicValue::Integer(i) => AtomicValue::Integer(
                i.checked_abs()
                    .ok_or_else(|| Error::dynamic("integer overflow"))?,
            ),
            AtomicValue::Decimal(d) => AtomicValue::Decimal(d.abs()),
            AtomicValue::Float(f) => AtomicValue::Float(f.abs()),
            AtomicValue::Double(d) => AtomicValue::Double(d.abs()),
            other => return Err(non_numeric("abs", &other)),
        })
    })
}

pub fn fn_floor<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    apply_numeric("floor", args, |atom| {
        Ok(match atom {
            AtomicValue::Integer(i) => AtomicValue::Integer(i),
            AtomicValue::Decimal(d) => AtomicValue::Decimal(d.floor()),
            AtomicValue::Float(f) => AtomicValue::Float(f.floor()),
            AtomicValue::Double(d) => AtomicValue::Double(d.floor()),
            other => return Err(non_numeric("floor", &other)),
        })
    })
}

pub fn fn_ceiling<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    apply_numeric("ceiling", args, |atom| {
        Ok(match atom {
            AtomicValue::Integer(i) => AtomicValue::Integer(i),
            AtomicValue::Decimal(d) => AtomicValue::Decimal(d.ceil()),
            AtomicValue::Float(f) => AtomicValue::Float(f.ceil()),
            AtomicValue::Double(d) => AtomicValue::Double(d.ceil()),
            other => return Err(non_numeric("ceiling", &other)),
        })
    })
}

/// Rounds half toward positive infinity: `round(-2.5)` is `-2`.
pub fn fn_round<'a, N: XdmNode<'a> + 'a>(args: Vec<XdmValue<N>>) -> Result<XdmValue<N>, Error> {
    apply_numeric("round", args, |atom| {
        Ok(match atom {
            AtomicValue::Integer(i) => AtomicValue::Integer(i),
            AtomicValue::Decimal(d) => {
                let half = Decimal::new(5, 1);
                AtomicValue::Decimal(
                    d.checked_add(half)
                        .ok_or_else(|| Error::dynamic("decimal overflow"))?
                        .floor(),
                )
            }
            AtomicValue::Float(f) => AtomicValue::Float(round_half_up(f as f64) as f32),
            AtomicValue::Double(d) => AtomicValue::Double(round_half_up(d)),
            other => return Err(non_numeric("round", &other)),
        })
    })
}

fn round_half_up(d: f64) -> f64 {
    if d.is_finite() { (d + 0.5).floor() } else { d }
}

fn non_numeric(function: &str, atom: &AtomicValue) -> Error {
    Error::function(
        function,
        format!("expected a numeric argument, got {}", atom.type_name()),
    )
}

/// Shared shape of the single-argument numeric functions: the empty
/// sequence passes through, untyped input promotes to double first.
fn apply_numeric<'a, N, F>(
    function: &str,
    args: Vec<XdmValue<N>>,
    op: F,
) -> Result<XdmValue<N>, Error>
where
    N: XdmNode<'a> + 'a,
    F: FnOnce(AtomicValue) -> Result<AtomicValue, Error>,
{
    let [value] = args.as_slice() else {
        return Err(Error::function(function, "expected 1 argument"));
    };
    let Some(atom) = atomize_optional(value, AtomizeMode::Lenient)? else {
        return Ok(XdmValue::empty());
    };
    let atom = promote(&atom, PromotionContext::Arithmetic, None)?;
    Ok(XdmValue::from_atomic(op(atom)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    type Value = XdmValue<crate::node::tests::MockNode<'static>>;

    #[test]
    fn test_number_coercions() {
        let variables = HashMap::new();
        let ctx = EvaluationContext::new(None, None, &variables);
        let result = fn_number(vec![Value::from_string("3.5")], &ctx).unwrap();
        assert_eq!(result, Value::from_double(3.5));
        let result = fn_number(vec![Value::from_string("pear")], &ctx).unwrap();
        assert!(matches!(
            result.items()[0],
            crate::types::XdmItem::Atomic(AtomicValue::Double(d)) if d.is_nan()
        ));
        let result = fn_number(vec![Value::empty()], &ctx).unwrap();
        assert!(matches!(
            result.items()[0],
            crate::types::XdmItem::Atomic(AtomicValue::Double(d)) if d.is_nan()
        ));
    }

    #[test]
    fn test_abs_preserves_type() {
        assert_eq!(
            fn_abs(vec![Value::from_integer(-5)]).unwrap(),
            Value::from_integer(5)
        );
        assert_eq!(
            fn_abs(vec![Value::from_double(-5.5)]).unwrap(),
            Value::from_double(5.5)
        );
    }

    #[test]
    fn test_empty_passes_through() {
        assert!(fn_abs(vec![Value::empty()]).unwrap().is_empty());
        assert!(fn_round(vec![Value::empty()]).unwrap().is_empty());
    }

    #[test]
    fn test_round_half_toward_positive_infinity() {
        assert_eq!(
            fn_round(vec![Value::from_double(2.5)]).unwrap(),
            Value::from_double(3.0)
        );
        assert_eq!(
            fn_round(vec![Value::from_double(-2.5)]).unwrap(),
            Value::from_double(-2.0)
        );
        assert_eq!(
            fn_round(vec![Value::from_atomic(AtomicValue::Decimal(Decimal::new(
                -25, 1
            )))])
            .unwrap(),
            Value::from_atomic(AtomicValue::Decimal(Decimal::from(-2)))
        );
    }

    #[test]
    fn test_floor_and_ceiling() {
        assert_eq!(
            fn_floor(vec![Value::from_double(1.7)]).unwrap(),
            Value::from_double(1.0)
        );
        assert_eq!(
            fn_ceiling(vec![Value::from_double(1.2)]).unwrap(),
            Value::from_double(2.0)
        );
        assert!(fn_floor(vec![Value::from_bool(true)]).is_err());
    }
}
