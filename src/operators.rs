//! Binary and unary operator evaluation over sequences.
//!
//! The XPath-1.0-compatibility pre-pass lives here: under the
//! compatibility flag arithmetic coerces its operands with the 1.0
//! `number()` rules (first item, empty sequence becomes NaN) before the
//! promotion engine ever sees them.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::atomize::{AtomizeMode, atomize_optional, atomize_value};
use crate::error::Error;
use crate::node::XdmNode;
use crate::promote::{PromotionContext, common_numeric_type, promote, promote_numeric};
use crate::types::registry::AtomicType;
use crate::types::{AtomicValue, XdmItem, XdmValue};

pub fn evaluate_binary<'a, N: XdmNode<'a> + 'a>(
    op: BinaryOperator,
    left: XdmValue<N>,
    right: XdmValue<N>,
    compat: bool,
) -> Result<XdmValue<N>, Error> {
    match op {
        BinaryOperator::Or => Ok(XdmValue::from_bool(
            left.effective_boolean_value() || right.effective_boolean_value(),
        )),
        BinaryOperator::And => Ok(XdmValue::from_bool(
            left.effective_boolean_value() && right.effective_boolean_value(),
        )),
        BinaryOperator::Equals => general_comparison(left, right, |ord| ord == Ordering::Equal),
        BinaryOperator::NotEquals => general_comparison(left, right, |ord| ord != Ordering::Equal),
        BinaryOperator::LessThan => general_comparison(left, right, |ord| ord == Ordering::Less),
        BinaryOperator::LessThanOrEqual => {
            general_comparison(left, right, |ord| ord != Ordering::Greater)
        }
        BinaryOperator::GreaterThan => {
            general_comparison(left, right, |ord| ord == Ordering::Greater)
        }
        BinaryOperator::GreaterThanOrEqual => {
            general_comparison(left, right, |ord| ord != Ordering::Less)
        }
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Modulo => arithmetic(op, left, right, compat),
        BinaryOperator::Union => union(left, right),
    }
}

pub fn evaluate_unary<'a, N: XdmNode<'a> + 'a>(
    op: UnaryOperator,
    value: XdmValue<N>,
    compat: bool,
) -> Result<XdmValue<N>, Error> {
    if compat {
        let d = compat_number(&value)?;
        let d = match op {
            UnaryOperator::Minus => -d,
            UnaryOperator::Plus => d,
        };
        return Ok(XdmValue::from_double(d));
    }

    let Some(atom) = atomize_optional(&value, AtomizeMode::Lenient)? else {
        return Ok(XdmValue::empty());
    };
    let atom = promote(&atom, PromotionContext::Arithmetic, None)?;
    let negated = match (op, atom) {
        (UnaryOperator::Plus, atom) => {
            if !atom.is_numeric() {
                return Err(Error::type_error("unary + requires a numeric operand"));
            }
            atom
        }
        (UnaryOperator::Minus, AtomicValue::Integer(i)) => AtomicValue::Integer(
            i.checked_neg()
                .ok_or_else(|| Error::dynamic("integer overflow"))?,
        ),
        (UnaryOperator::Minus, AtomicValue::Decimal(d)) => AtomicValue::Decimal(-d),
        (UnaryOperator::Minus, AtomicValue::Float(f)) => AtomicValue::Float(-f),
        (UnaryOperator::Minus, AtomicValue::Double(d)) => AtomicValue::Double(-d),
        (UnaryOperator::Minus, _) => {
            return Err(Error::type_error("unary - requires a numeric operand"));
        }
    };
    Ok(XdmValue::from_atomic(negated))
}

/// General comparison: existential over the two atomized sequences, with
/// comparison-context promotion applied per pair.
fn general_comparison<'a, N, F>(
    left: XdmValue<N>,
    right: XdmValue<N>,
    predicate: F,
) -> Result<XdmValue<N>, Error>
where
    N: XdmNode<'a> + 'a,
    F: Fn(Ordering) -> bool,
{
    let left_atoms = atomize_value(&left, AtomizeMode::Lenient)?;
    let right_atoms = atomize_value(&right, AtomizeMode::Lenient)?;

    for l in &left_atoms {
        for r in &right_atoms {
            let lp = promote(l, PromotionContext::Comparison, Some(r))?;
            let rp = promote(r, PromotionContext::Comparison, Some(l))?;
            if let Some(ord) = lp.partial_cmp(&rp)
                && predicate(ord)
            {
                return Ok(XdmValue::from_bool(true));
            }
        }
    }
    Ok(XdmValue::from_bool(false))
}

fn arithmetic<'a, N: XdmNode<'a> + 'a>(
    op: BinaryOperator,
    left: XdmValue<N>,
    right: XdmValue<N>,
    compat: bool,
) -> Result<XdmValue<N>, Error> {
    if compat {
        let l = compat_number(&left)?;
        let r = compat_number(&right)?;
        return Ok(XdmValue::from_double(apply_double(op, l, r)));
    }

    let left_atoms = atomize_value(&left, AtomizeMode::Lenient)?;
    let right_atoms = atomize_value(&right, AtomizeMode::Lenient)?;
    // An empty operand propagates the empty sequence.
    if left_atoms.is_empty() || right_atoms.is_empty() {
        return Ok(XdmValue::empty());
    }
    if left_atoms.len() > 1 || right_atoms.len() > 1 {
        return Err(Error::Cardinality {
            expected: "singleton arithmetic operands".to_string(),
            actual: left_atoms.len().max(right_atoms.len()),
        });
    }

    let l = promote(&left_atoms[0], PromotionContext::Arithmetic, None)?;
    let r = promote(&right_atoms[0], PromotionContext::Arithmetic, None)?;
    let common = common_numeric_type(l.atomic_type(), r.atomic_type()).ok_or_else(|| {
        Error::type_error(format!(
            "arithmetic requires numeric operands, got {} and {}",
            l.type_name(),
            r.type_name()
        ))
    })?;

    // Integer division produces a decimal.
    if common == AtomicType::Integer && op == BinaryOperator::Divide {
        let a = Decimal::from(int_of(&l));
        let b = Decimal::from(int_of(&r));
        if b.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let q = a
            .checked_div(b)
            .ok_or_else(|| Error::dynamic("decimal overflow"))?;
        return Ok(XdmValue::from_atomic(AtomicValue::Decimal(q)));
    }

    let result = match common {
        AtomicType::Integer => apply_integer(op, int_of(&l), int_of(&r))?,
        AtomicType::Decimal => {
            let a = decimal_of(&promote_numeric(&l, AtomicType::Decimal)?)?;
            let b = decimal_of(&promote_numeric(&r, AtomicType::Decimal)?)?;
            apply_decimal(op, a, b)?
        }
        AtomicType::Float => {
            AtomicValue::Float(apply_double(op, l.to_double(), r.to_double()) as f32)
        }
        _ => AtomicValue::Double(apply_double(op, l.to_double(), r.to_double())),
    };
    Ok(XdmValue::from_atomic(result))
}

fn int_of(value: &AtomicValue) -> i64 {
    match value {
        AtomicValue::Integer(i) => *i,
        _ => 0,
    }
}

fn decimal_of(value: &AtomicValue) -> Result<Decimal, Error> {
    match value {
        AtomicValue::Decimal(d) => Ok(*d),
        AtomicValue::Integer(i) => Ok(Decimal::from(*i)),
        other => Err(Error::type_error(format!(
            "expected a decimal, got {}",
            other.type_name()
        ))),
    }
}

fn apply_integer(op: BinaryOperator, a: i64, b: i64) -> Result<AtomicValue, Error> {
    let overflow = || Error::dynamic("integer overflow");
    let result = match op {
        BinaryOperator::Plus => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOperator::Minus => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOperator::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOperator::Modulo => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            a.checked_rem(b).ok_or_else(overflow)?
        }
        _ => return Err(Error::type_error("not an integer operator")),
    };
    Ok(AtomicValue::Integer(result))
}

fn apply_decimal(op: BinaryOperator, a: Decimal, b: Decimal) -> Result<AtomicValue, Error> {
    let overflow = || Error::dynamic("decimal overflow");
    let result = match op {
        BinaryOperator::Plus => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOperator::Minus => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOperator::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOperator::Divide => {
            if b.is_zero() {
                return Err(Error::DivisionByZero);
            }
            a.checked_div(b).ok_or_else(overflow)?
        }
        BinaryOperator::Modulo => {
            if b.is_zero() {
                return Err(Error::DivisionByZero);
            }
            a.checked_rem(b).ok_or_else(overflow)?
        }
        _ => return Err(Error::type_error("not a decimal operator")),
    };
    Ok(AtomicValue::Decimal(result))
}

/// Float and double arithmetic follow IEEE semantics: division by zero
/// yields an infinity, not an error.
fn apply_double(op: BinaryOperator, a: f64, b: f64) -> f64 {
    match op {
        BinaryOperator::Plus => a + b,
        BinaryOperator::Minus => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo => a % b,
        _ => f64::NAN,
    }
}

/// The XPath 1.0 `number()` coercion: first item, string form, NaN on
/// anything unparseable or on the empty sequence.
fn compat_number<'a, N: XdmNode<'a> + 'a>(value: &XdmValue<N>) -> Result<f64, Error> {
    let atoms = atomize_value(value, AtomizeMode::Lenient)?;
    Ok(atoms.first().map(AtomicValue::to_double).unwrap_or(f64::NAN))
}

/// Node-set union: document order, duplicates dropped.
fn union<'a, N: XdmNode<'a> + 'a>(
    left: XdmValue<N>,
    right: XdmValue<N>,
) -> Result<XdmValue<N>, Error> {
    let mut nodes = Vec::with_capacity(left.len() + right.len());
    for item in left.items().iter().chain(right.items()) {
        match item {
            XdmItem::Node(n) => nodes.push(*n),
            other => {
                return Err(Error::type_error(format!(
                    "union requires node operands, got {}",
                    other.type_name()
                )));
            }
        }
    }
    nodes.sort();
    nodes.dedup();
    Ok(XdmValue::from_nodes(nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    type Value = XdmValue<crate::node::tests::MockNode<'static>>;

    fn int(i: i64) -> Value {
        XdmValue::from_integer(i)
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let result = evaluate_binary(BinaryOperator::Plus, int(2), int(3), false).unwrap();
        assert_eq!(result, XdmValue::from_atomic(AtomicValue::Integer(5)));
    }

    #[test]
    fn test_integer_division_yields_decimal() {
        let result = evaluate_binary(BinaryOperator::Divide, int(7), int(2), false).unwrap();
        assert_eq!(
            result,
            XdmValue::from_atomic(AtomicValue::Decimal(Decimal::new(35, 1)))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate_binary(BinaryOperator::Divide, int(1), int(0), false),
            Err(Error::DivisionByZero)
        );
        // IEEE semantics for doubles.
        let result = evaluate_binary(
            BinaryOperator::Divide,
            XdmValue::<crate::node::tests::MockNode<'static>>::from_double(1.0),
            XdmValue::from_double(0.0),
            false,
        )
        .unwrap();
        assert_eq!(result, XdmValue::from_double(f64::INFINITY));
    }

    #[test]
    fn test_empty_sequence_arithmetic_both_modes() {
        let empty = Value::empty();
        // 2.0 semantics: empty propagates.
        let result =
            evaluate_binary(BinaryOperator::Plus, empty.clone(), int(1), false).unwrap();
        assert!(result.is_empty());
        // 1.0 compatibility: empty coerces to NaN.
        let result = evaluate_binary(BinaryOperator::Plus, empty, int(1), true).unwrap();
        assert!(matches!(
            result.items()[0],
            XdmItem::Atomic(AtomicValue::Double(d)) if d.is_nan()
        ));
    }

    #[test]
    fn test_untyped_operand_is_a_dynamic_error_without_compat() {
        let untyped: Value = XdmValue::from_atomic(AtomicValue::UntypedAtomic("pear".into()));
        assert!(evaluate_binary(BinaryOperator::Plus, untyped.clone(), int(1), false).is_err());
        // Compatibility mode silently yields NaN instead.
        let result = evaluate_binary(BinaryOperator::Plus, untyped, int(1), true).unwrap();
        assert!(matches!(
            result.items()[0],
            XdmItem::Atomic(AtomicValue::Double(d)) if d.is_nan()
        ));
    }

    #[test]
    fn test_general_comparison_is_existential() {
        let seq: Value = XdmValue::from_items(vec![
            XdmItem::Atomic(AtomicValue::Integer(1)),
            XdmItem::Atomic(AtomicValue::Integer(5)),
        ]);
        let result =
            evaluate_binary(BinaryOperator::GreaterThan, seq.clone(), int(3), false).unwrap();
        assert!(result.effective_boolean_value());
        let result = evaluate_binary(BinaryOperator::GreaterThan, seq, int(9), false).unwrap();
        assert!(!result.effective_boolean_value());
    }

    #[test]
    fn test_comparison_promotes_untyped_against_numeric() {
        let untyped: Value = XdmValue::from_atomic(AtomicValue::UntypedAtomic("07".into()));
        let result = evaluate_binary(BinaryOperator::Equals, untyped, int(7), false).unwrap();
        assert!(result.effective_boolean_value());
    }

    #[test]
    fn test_unary_minus_preserves_type() {
        let result = evaluate_unary(UnaryOperator::Minus, int(5), false).unwrap();
        assert_eq!(result, XdmValue::from_atomic(AtomicValue::Integer(-5)));
        let result = evaluate_unary(UnaryOperator::Minus, Value::empty(), false).unwrap();
        assert!(result.is_empty());
        let result = evaluate_unary(UnaryOperator::Minus, Value::empty(), true).unwrap();
        assert!(matches!(
            result.items()[0],
            XdmItem::Atomic(AtomicValue::Double(d)) if d.is_nan()
        ));
    }

    #[test]
    fn test_mixed_numeric_types_promote_upward() {
        let result = evaluate_binary(
            BinaryOperator::Plus,
            int(1),
            XdmValue::from_double(0.5),
            false,
        )
        .unwrap();
        assert_eq!(result, XdmValue::from_double(1.5));
    }
}
