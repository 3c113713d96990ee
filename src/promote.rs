//! Type promotion: implicit conversion of atomic values between
//! semantically related types, parameterized by the operation context.
//!
//! XPath-1.0-compatibility coercions are deliberately not a promotion
//! context; they are applied as a pre-pass by the operator layer before
//! promotion runs.

use crate::error::Error;
use crate::types::AtomicValue;
use crate::types::registry::AtomicType;

/// The evaluation context a value is promoted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionContext {
    Arithmetic,
    Comparison,
    StringContext,
    BooleanContext,
}

/// Position of a type in the numeric hierarchy
/// `integer < decimal < float < double`. `None` for non-numeric types.
pub fn numeric_level(t: AtomicType) -> Option<u8> {
    if t.derives_from(AtomicType::Integer) {
        Some(0)
    } else if t.derives_from(AtomicType::Decimal) {
        Some(1)
    } else if t == AtomicType::Float {
        Some(2)
    } else if t == AtomicType::Double {
        Some(3)
    } else {
        None
    }
}

/// The common type two numeric operands promote to: the higher of the two
/// hierarchy levels.
pub fn common_numeric_type(a: AtomicType, b: AtomicType) -> Option<AtomicType> {
    let level = numeric_level(a)?.max(numeric_level(b)?);
    Some(match level {
        0 => AtomicType::Integer,
        1 => AtomicType::Decimal,
        2 => AtomicType::Float,
        _ => AtomicType::Double,
    })
}

/// Promotes one value for the given context. `other` is the other
/// operand's value where the rules depend on it (comparison context).
pub fn promote(
    value: &AtomicValue,
    context: PromotionContext,
    other: Option<&AtomicValue>,
) -> Result<AtomicValue, Error> {
    match context {
        PromotionContext::Arithmetic => match value {
            // Untyped values must parse as numbers; failure is a dynamic
            // error, not a silent NaN.
            AtomicValue::UntypedAtomic(_) => AtomicType::Double.cast(value),
            other => Ok(other.clone()),
        },
        PromotionContext::Comparison => match value {
            AtomicValue::UntypedAtomic(s) => {
                if other.is_some_and(AtomicValue::is_numeric) {
                    AtomicType::Double.cast(value)
                } else {
                    Ok(AtomicValue::String(s.clone()))
                }
            }
            other => Ok(other.clone()),
        },
        PromotionContext::StringContext => match value {
            AtomicValue::UntypedAtomic(s) => Ok(AtomicValue::String(s.clone())),
            // anyURI promotes to string only here.
            AtomicValue::AnyUri(s) => Ok(AtomicValue::String(s.clone())),
            other => Ok(other.clone()),
        },
        PromotionContext::BooleanContext => match value {
            AtomicValue::UntypedAtomic(s) => Ok(AtomicValue::String(s.clone())),
            other => Ok(other.clone()),
        },
    }
}

/// Promotes a numeric value upward to `target`. Demotion is refused: a
/// higher type is never implicitly narrowed.
pub fn promote_numeric(value: &AtomicValue, target: AtomicType) -> Result<AtomicValue, Error> {
    let from = value.atomic_type();
    let (Some(from_level), Some(target_level)) = (numeric_level(from), numeric_level(target))
    else {
        return Err(Error::type_error(format!(
            "cannot promote {} to {}",
            from.qualified_name(),
            target.qualified_name()
        )));
    };
    if from_level > target_level {
        return Err(Error::type_error(format!(
            "cannot demote {} to {}",
            from.qualified_name(),
            target.qualified_name()
        )));
    }
    if from_level == target_level {
        return Ok(value.clone());
    }
    target.cast(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_hierarchy_levels() {
        assert_eq!(numeric_level(AtomicType::Integer), Some(0));
        assert_eq!(numeric_level(AtomicType::Byte), Some(0));
        assert_eq!(numeric_level(AtomicType::Decimal), Some(1));
        assert_eq!(numeric_level(AtomicType::Float), Some(2));
        assert_eq!(numeric_level(AtomicType::Double), Some(3));
        assert_eq!(numeric_level(AtomicType::String), None);
    }

    #[test]
    fn test_common_type_picks_higher() {
        assert_eq!(
            common_numeric_type(AtomicType::Integer, AtomicType::Double),
            Some(AtomicType::Double)
        );
        assert_eq!(
            common_numeric_type(AtomicType::Integer, AtomicType::Decimal),
            Some(AtomicType::Decimal)
        );
        assert_eq!(
            common_numeric_type(AtomicType::Long, AtomicType::Integer),
            Some(AtomicType::Integer)
        );
        assert_eq!(
            common_numeric_type(AtomicType::Decimal, AtomicType::Float),
            Some(AtomicType::Float)
        );
        assert_eq!(common_numeric_type(AtomicType::String, AtomicType::Integer), None);
    }

    #[test]
    fn test_arithmetic_untyped_parses_as_double() {
        let promoted = promote(
            &AtomicValue::UntypedAtomic("3.5".into()),
            PromotionContext::Arithmetic,
            None,
        )
        .unwrap();
        assert_eq!(promoted, AtomicValue::Double(3.5));

        assert!(
            promote(
                &AtomicValue::UntypedAtomic("pear".into()),
                PromotionContext::Arithmetic,
                None,
            )
            .is_err()
        );
    }

    #[test]
    fn test_comparison_untyped_follows_other_operand() {
        let numeric_other = AtomicValue::Integer(7);
        let promoted = promote(
            &AtomicValue::UntypedAtomic("7".into()),
            PromotionContext::Comparison,
            Some(&numeric_other),
        )
        .unwrap();
        assert_eq!(promoted, AtomicValue::Double(7.0));

        let string_other = AtomicValue::String("7".into());
        let promoted = promote(
            &AtomicValue::UntypedAtomic("7".into()),
            PromotionContext::Comparison,
            Some(&string_other),
        )
        .unwrap();
        assert_eq!(promoted, AtomicValue::String("7".into()));
    }

    #[test]
    fn test_any_uri_promotes_only_in_string_context() {
        let uri = AtomicValue::AnyUri("http://example.com/".into());
        assert_eq!(
            promote(&uri, PromotionContext::StringContext, None).unwrap(),
            AtomicValue::String("http://example.com/".into())
        );
        assert_eq!(
            promote(&uri, PromotionContext::Comparison, None).unwrap(),
            uri
        );
    }

    #[test]
    fn test_numeric_promotion_is_upward_only() {
        assert_eq!(
            promote_numeric(&AtomicValue::Integer(2), AtomicType::Double).unwrap(),
            AtomicValue::Double(2.0)
        );
        assert_eq!(
            promote_numeric(&AtomicValue::Integer(2), AtomicType::Decimal).unwrap(),
            AtomicValue::Decimal(Decimal::from(2))
        );
        assert!(promote_numeric(&AtomicValue::Double(2.0), AtomicType::Integer).is_err());
        assert!(promote_numeric(&AtomicValue::String("2".into()), AtomicType::Double).is_err());
    }
}
