use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::registry::AtomicType;

/// A single atomic value together with its dynamic type.
///
/// Calendar, duration and binary values keep their lexical form; the
/// registry validates it at construction (cast) time.
#[derive(Debug, Clone)]
pub enum AtomicValue {
    String(String),
    UntypedAtomic(String),
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    Date(String),
    DateTime(String),
    Time(String),
    Duration(String),
    YearMonthDuration(String),
    DayTimeDuration(String),
    GYearMonth(String),
    GYear(String),
    GMonthDay(String),
    GDay(String),
    GMonth(String),
    AnyUri(String),
    QName {
        prefix: Option<String>,
        local: String,
        namespace: Option<String>,
    },
    HexBinary(String),
    Base64Binary(String),
}

impl AtomicValue {
    /// The dynamic type of this value in the atomic type registry.
    pub fn atomic_type(&self) -> AtomicType {
        match self {
            AtomicValue::String(_) => AtomicType::String,
            AtomicValue::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            AtomicValue::Boolean(_) => AtomicType::Boolean,
            AtomicValue::Integer(_) => AtomicType::Integer,
            AtomicValue::Decimal(_) => AtomicType::Decimal,
            AtomicValue::Float(_) => AtomicType::Float,
            AtomicValue::Double(_) => AtomicType::Double,
            AtomicValue::Date(_) => AtomicType::Date,
            AtomicValue::DateTime(_) => AtomicType::DateTime,
            AtomicValue::Time(_) => AtomicType::Time,
            AtomicValue::Duration(_) => AtomicType::Duration,
            AtomicValue::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            AtomicValue::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            AtomicValue::GYearMonth(_) => AtomicType::GYearMonth,
            AtomicValue::GYear(_) => AtomicType::GYear,
            AtomicValue::GMonthDay(_) => AtomicType::GMonthDay,
            AtomicValue::GDay(_) => AtomicType::GDay,
            AtomicValue::GMonth(_) => AtomicType::GMonth,
            AtomicValue::AnyUri(_) => AtomicType::AnyUri,
            AtomicValue::QName { .. } => AtomicType::QName,
            AtomicValue::HexBinary(_) => AtomicType::HexBinary,
            AtomicValue::Base64Binary(_) => AtomicType::Base64Binary,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.atomic_type().qualified_name()
    }

    pub fn to_string_value(&self) -> String {
        match self {
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
            AtomicValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            AtomicValue::Integer(i) => i.to_string(),
            AtomicValue::Decimal(d) => d.to_string(),
            AtomicValue::Float(f) => format_double(*f as f64),
            AtomicValue::Double(d) => format_double(*d),
            AtomicValue::Date(s)
            | AtomicValue::DateTime(s)
            | AtomicValue::Time(s)
            | AtomicValue::Duration(s)
            | AtomicValue::YearMonthDuration(s)
            | AtomicValue::DayTimeDuration(s)
            | AtomicValue::GYearMonth(s)
            | AtomicValue::GYear(s)
            | AtomicValue::GMonthDay(s)
            | AtomicValue::GDay(s)
            | AtomicValue::GMonth(s)
            | AtomicValue::AnyUri(s)
            | AtomicValue::HexBinary(s)
            | AtomicValue::Base64Binary(s) => s.clone(),
            AtomicValue::QName { prefix, local, .. } => match prefix {
                Some(p) => format!("{}:{}", p, local),
                None => local.clone(),
            },
        }
    }

    /// Effective boolean value of a singleton.
    pub fn to_boolean(&self) -> bool {
        match self {
            AtomicValue::Boolean(b) => *b,
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) | AtomicValue::AnyUri(s) => {
                !s.is_empty()
            }
            AtomicValue::Integer(i) => *i != 0,
            AtomicValue::Decimal(d) => !d.is_zero(),
            AtomicValue::Float(f) => *f != 0.0 && !f.is_nan(),
            AtomicValue::Double(d) => *d != 0.0 && !d.is_nan(),
            _ => true,
        }
    }

    pub fn to_double(&self) -> f64 {
        match self {
            AtomicValue::Double(d) => *d,
            AtomicValue::Float(f) => *f as f64,
            AtomicValue::Integer(i) => *i as f64,
            AtomicValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => parse_double(s),
            AtomicValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn to_integer(&self) -> Option<i64> {
        match self {
            AtomicValue::Integer(i) => Some(*i),
            AtomicValue::Float(f) => {
                if f.is_finite() {
                    Some(f.trunc() as i64)
                } else {
                    None
                }
            }
            AtomicValue::Double(d) => {
                if d.is_finite() {
                    Some(d.trunc() as i64)
                } else {
                    None
                }
            }
            AtomicValue::Decimal(d) => d.trunc().to_i64(),
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.trim().parse().ok(),
            AtomicValue::Boolean(b) => Some(if *b { 1 } else { 0 }),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AtomicValue::Integer(_)
                | AtomicValue::Decimal(_)
                | AtomicValue::Float(_)
                | AtomicValue::Double(_)
        )
    }

    pub fn is_nan(&self) -> bool {
        match self {
            AtomicValue::Float(f) => f.is_nan(),
            AtomicValue::Double(d) => d.is_nan(),
            _ => false,
        }
    }
}

/// Parses the XPath lexical forms of a double, including `INF`, `-INF`
/// and `NaN`.
pub fn parse_double(s: &str) -> f64 {
    match s.trim() {
        "INF" | "+INF" => f64::INFINITY,
        "-INF" => f64::NEG_INFINITY,
        "NaN" => f64::NAN,
        other => other.parse().unwrap_or(f64::NAN),
    }
}

/// Renders a double the way XPath serializes it: `NaN`, `INF`, `-INF`,
/// `-0`, and no trailing `.0` on integral values.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else if d == 0.0 && d.is_sign_negative() {
        "-0".to_string()
    } else {
        d.to_string()
    }
}

impl PartialEq for AtomicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a == b,
            (AtomicValue::QName { local: l1, namespace: n1, .. },
             AtomicValue::QName { local: l2, namespace: n2, .. }) => l1 == l2 && n1 == n2,
            _ => {
                if self.is_numeric() && other.is_numeric() {
                    match (self, other) {
                        (AtomicValue::Integer(a), AtomicValue::Integer(b)) => a == b,
                        (AtomicValue::Decimal(a), AtomicValue::Decimal(b)) => a == b,
                        _ => {
                            let (a, b) = (self.to_double(), other.to_double());
                            a == b || (a.is_nan() && b.is_nan())
                        }
                    }
                } else if self.is_numeric() || other.is_numeric() {
                    false
                } else {
                    // Strings, untyped atomics, URIs and lexical values
                    // compare by their string form within the same kin.
                    self.comparison_class() == other.comparison_class()
                        && self.to_string_value() == other.to_string_value()
                }
            }
        }
    }
}

impl Eq for AtomicValue {}

impl AtomicValue {
    /// Groups types whose values are mutually comparable by string form.
    fn comparison_class(&self) -> u8 {
        match self {
            AtomicValue::String(_) | AtomicValue::UntypedAtomic(_) | AtomicValue::AnyUri(_) => 0,
            AtomicValue::Boolean(_) => 1,
            AtomicValue::Date(_) => 2,
            AtomicValue::DateTime(_) => 3,
            AtomicValue::Time(_) => 4,
            AtomicValue::Duration(_)
            | AtomicValue::YearMonthDuration(_)
            | AtomicValue::DayTimeDuration(_) => 5,
            AtomicValue::GYearMonth(_)
            | AtomicValue::GYear(_)
            | AtomicValue::GMonthDay(_)
            | AtomicValue::GDay(_)
            | AtomicValue::GMonth(_) => 6,
            AtomicValue::QName { .. } => 7,
            AtomicValue::HexBinary(_) => 8,
            AtomicValue::Base64Binary(_) => 9,
            _ => 10,
        }
    }
}

impl Hash for AtomicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Numeric variants that compare equal must hash equal, so all
        // numerics hash through their double form.
        if self.is_numeric() {
            0u8.hash(state);
            self.to_double().to_bits().hash(state);
            return;
        }
        self.comparison_class().hash(state);
        match self {
            AtomicValue::Boolean(b) => b.hash(state),
            AtomicValue::QName {
                local, namespace, ..
            } => {
                local.hash(state);
                namespace.hash(state);
            }
            other => other.to_string_value().hash(state),
        }
    }
}

impl PartialOrd for AtomicValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.is_numeric() && other.is_numeric() {
            return match (self, other) {
                (AtomicValue::Integer(a), AtomicValue::Integer(b)) => a.partial_cmp(b),
                (AtomicValue::Decimal(a), AtomicValue::Decimal(b)) => a.partial_cmp(b),
                _ => self.to_double().partial_cmp(&other.to_double()),
            };
        }
        match (self, other) {
            (AtomicValue::Boolean(a), AtomicValue::Boolean(b)) => a.partial_cmp(b),
            _ if self.comparison_class() == other.comparison_class() => {
                self.to_string_value().partial_cmp(&other.to_string_value())
            }
            _ => None,
        }
    }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

impl From<String> for AtomicValue {
    fn from(s: String) -> Self {
        AtomicValue::String(s)
    }
}

impl From<&str> for AtomicValue {
    fn from(s: &str) -> Self {
        AtomicValue::String(s.to_string())
    }
}

impl From<bool> for AtomicValue {
    fn from(b: bool) -> Self {
        AtomicValue::Boolean(b)
    }
}

impl From<i64> for AtomicValue {
    fn from(i: i64) -> Self {
        AtomicValue::Integer(i)
    }
}

impl From<i32> for AtomicValue {
    fn from(i: i32) -> Self {
        AtomicValue::Integer(i as i64)
    }
}

impl From<f64> for AtomicValue {
    fn from(d: f64) -> Self {
        AtomicValue::Double(d)
    }
}
