//! The built-in atomic type registry.
//!
//! The registry is a closed, process-wide set: every built-in type is a
//! variant of [`AtomicType`], the base-type chain is a pure function, and
//! nothing can be mutated after startup. Lookup goes through
//! [`AtomicType::by_name`].

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::LazyLock;

use crate::error::Error;
use crate::types::atomic::AtomicValue;

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?\d+$").expect("BUG: invalid INTEGER_RE regex literal")
});

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("BUG: invalid DECIMAL_RE regex literal")
});

static DOUBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
        .expect("BUG: invalid DOUBLE_RE regex literal")
});

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$",
    )
    .expect("BUG: invalid DATETIME_RE regex literal")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid DATE_RE regex literal")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid TIME_RE regex literal")
});

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("BUG: invalid DURATION_RE regex literal")
});

static YEAR_MONTH_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?$")
        .expect("BUG: invalid YEAR_MONTH_DURATION_RE regex literal")
});

static DAY_TIME_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$")
        .expect("BUG: invalid DAY_TIME_DURATION_RE regex literal")
});

static G_YEAR_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{4,}-(\d{2})(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid G_YEAR_MONTH_RE regex literal")
});

static G_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").expect("BUG: invalid G_YEAR_RE regex literal")
});

static G_MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid G_MONTH_DAY_RE regex literal")
});

static G_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("BUG: invalid G_DAY_RE regex literal")
});

static G_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^--(\d{2})(Z|[+-]\d{2}:\d{2})?$").expect("BUG: invalid G_MONTH_RE regex literal")
});

static HEX_BINARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2})*$").expect("BUG: invalid HEX_BINARY_RE regex literal")
});

static BASE64_BINARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+/\s]*={0,2}$").expect("BUG: invalid BASE64_BINARY_RE regex literal")
});

static NCNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("BUG: invalid NCNAME_RE regex literal")
});

static LANGUAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$")
        .expect("BUG: invalid LANGUAGE_RE regex literal")
});

/// Every built-in atomic type. The variants form a tree rooted at
/// `anyAtomicType` through [`AtomicType::base_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    AnyAtomicType,
    UntypedAtomic,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NCName,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    Long,
    Int,
    Short,
    Byte,
    NonNegativeInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    PositiveInteger,
    Float,
    Double,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    DateTime,
    Date,
    Time,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    AnyUri,
    QName,
    HexBinary,
    Base64Binary,
}

impl AtomicType {
    /// Looks a type up by its local name in the `xs` namespace.
    pub fn by_name(local: &str) -> Option<Self> {
        Some(match local {
            "anyAtomicType" => Self::AnyAtomicType,
            "untypedAtomic" => Self::UntypedAtomic,
            "string" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" => Self::Token,
            "language" => Self::Language,
            "Name" => Self::Name,
            "NCName" => Self::NCName,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "integer" => Self::Integer,
            "nonPositiveInteger" => Self::NonPositiveInteger,
            "negativeInteger" => Self::NegativeInteger,
            "long" => Self::Long,
            "int" => Self::Int,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "nonNegativeInteger" => Self::NonNegativeInteger,
            "unsignedLong" => Self::UnsignedLong,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedByte" => Self::UnsignedByte,
            "positiveInteger" => Self::PositiveInteger,
            "float" => Self::Float,
            "double" => Self::Double,
            "duration" => Self::Duration,
            "yearMonthDuration" => Self::YearMonthDuration,
            "dayTimeDuration" => Self::DayTimeDuration,
            "dateTime" => Self::DateTime,
            "date" => Self::Date,
            "time" => Self::Time,
            "gYearMonth" => Self::GYearMonth,
            "gYear" => Self::GYear,
            "gMonthDay" => Self::GMonthDay,
            "gDay" => Self::GDay,
            "gMonth" => Self::GMonth,
            "anyURI" => Self::AnyUri,
            "QName" => Self::QName,
            "hexBinary" => Self::HexBinary,
            "base64Binary" => Self::Base64Binary,
            _ => return None,
        })
    }

    pub fn local_name(self) -> &'static str {
        match self {
            Self::AnyAtomicType => "anyAtomicType",
            Self::UntypedAtomic => "untypedAtomic",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NCName => "NCName",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::PositiveInteger => "positiveInteger",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::YearMonthDuration => "yearMonthDuration",
            Self::DayTimeDuration => "dayTimeDuration",
            Self::DateTime => "dateTime",
            Self::Date => "date",
            Self::Time => "time",
            Self::GYearMonth => "gYearMonth",
            Self::GYear => "gYear",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::GMonth => "gMonth",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
        }
    }

    pub fn qualified_name(self) -> &'static str {
        match self {
            Self::AnyAtomicType => "xs:anyAtomicType",
            Self::UntypedAtomic => "xs:untypedAtomic",
            Self::String => "xs:string",
            Self::NormalizedString => "xs:normalizedString",
            Self::Token => "xs:token",
            Self::Language => "xs:language",
            Self::Name => "xs:Name",
            Self::NCName => "xs:NCName",
            Self::Boolean => "xs:boolean",
            Self::Decimal => "xs:decimal",
            Self::Integer => "xs:integer",
            Self::NonPositiveInteger => "xs:nonPositiveInteger",
            Self::NegativeInteger => "xs:negativeInteger",
            Self::Long => "xs:long",
            Self::Int => "xs:int",
            Self::Short => "xs:short",
            Self::Byte => "xs:byte",
            Self::NonNegativeInteger => "xs:nonNegativeInteger",
            Self::UnsignedLong => "xs:unsignedLong",
            Self::UnsignedInt => "xs:unsignedInt",
            Self::UnsignedShort => "xs:unsignedShort",
            Self::UnsignedByte => "xs:unsignedByte",
            Self::PositiveInteger => "xs:positiveInteger",
            Self::Float => "xs:float",
            Self::Double => "xs:double",
            Self::Duration => "xs:duration",
            Self::YearMonthDuration => "xs:yearMonthDuration",
            Self::DayTimeDuration => "xs:dayTimeDuration",
            Self::DateTime => "xs:dateTime",
            Self::Date => "xs:date",
            Self::Time => "xs:time",
            Self::GYearMonth => "xs:gYearMonth",
            Self::GYear => "xs:gYear",
            Self::GMonthDay => "xs:gMonthDay",
            Self::GDay => "xs:gDay",
            Self::GMonth => "xs:gMonth",
            Self::AnyUri => "xs:anyURI",
            Self::QName => "xs:QName",
            Self::HexBinary => "xs:hexBinary",
            Self::Base64Binary => "xs:base64Binary",
        }
    }

    /// The immediate base type. `None` only for the root `anyAtomicType`.
    pub fn base_type(self) -> Option<Self> {
        Some(match self {
            Self::AnyAtomicType => return None,
            Self::NormalizedString => Self::String,
            Self::Token => Self::NormalizedString,
            Self::Language | Self::Name => Self::Token,
            Self::NCName => Self::Name,
            Self::Integer => Self::Decimal,
            Self::NonPositiveInteger | Self::Long | Self::NonNegativeInteger => Self::Integer,
            Self::NegativeInteger => Self::NonPositiveInteger,
            Self::Int => Self::Long,
            Self::Short => Self::Int,
            Self::Byte => Self::Short,
            Self::UnsignedLong | Self::PositiveInteger => Self::NonNegativeInteger,
            Self::UnsignedInt => Self::UnsignedLong,
            Self::UnsignedShort => Self::UnsignedInt,
            Self::UnsignedByte => Self::UnsignedShort,
            Self::YearMonthDuration | Self::DayTimeDuration => Self::Duration,
            _ => Self::AnyAtomicType,
        })
    }

    /// The primitive ancestor: the last type on the base chain before
    /// `anyAtomicType`.
    pub fn primitive(self) -> Self {
        let mut current = self;
        while let Some(base) = current.base_type() {
            if base == Self::AnyAtomicType {
                return current;
            }
            current = base;
        }
        current
    }

    /// Whether `self` is `ancestor` or derives from it through the base
    /// chain.
    pub fn derives_from(self, ancestor: Self) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t == ancestor {
                return true;
            }
            current = t.base_type();
        }
        false
    }

    pub fn is_numeric(self) -> bool {
        self.derives_from(Self::Decimal)
            || matches!(self, Self::Float | Self::Double)
    }

    /// Value bounds of the integer-derived bounded types.
    fn integer_bounds(self) -> Option<(Option<i64>, Option<i64>)> {
        match self {
            Self::NonPositiveInteger => Some((None, Some(0))),
            Self::NegativeInteger => Some((None, Some(-1))),
            Self::Long => Some((Some(i64::MIN), Some(i64::MAX))),
            Self::Int => Some((Some(i32::MIN as i64), Some(i32::MAX as i64))),
            Self::Short => Some((Some(i16::MIN as i64), Some(i16::MAX as i64))),
            Self::Byte => Some((Some(i8::MIN as i64), Some(i8::MAX as i64))),
            Self::NonNegativeInteger => Some((Some(0), None)),
            Self::UnsignedLong => Some((Some(0), None)),
            Self::UnsignedInt => Some((Some(0), Some(u32::MAX as i64))),
            Self::UnsignedShort => Some((Some(0), Some(u16::MAX as i64))),
            Self::UnsignedByte => Some((Some(0), Some(u8::MAX as i64))),
            Self::PositiveInteger => Some((Some(1), None)),
            _ => None,
        }
    }

    /// Checks whether a lexical form conforms to this type, without
    /// producing a value.
    pub fn validate(self, lexical: &str) -> bool {
        let s = lexical.trim();
        match self {
            Self::AnyAtomicType | Self::UntypedAtomic | Self::String => true,
            Self::NormalizedString => !s.contains(['\t', '\n', '\r']),
            Self::Token => {
                !s.contains(['\t', '\n', '\r'])
                    && !s.starts_with(' ')
                    && !s.ends_with(' ')
                    && !s.contains("  ")
            }
            Self::Language => LANGUAGE_RE.is_match(s),
            Self::Name => {
                s.split(':').count() <= 2 && s.split(':').all(|p| NCNAME_RE.is_match(p))
            }
            Self::NCName => NCNAME_RE.is_match(s),
            Self::Boolean => matches!(s, "true" | "false" | "1" | "0"),
            Self::Decimal => DECIMAL_RE.is_match(s),
            Self::Integer => INTEGER_RE.is_match(s),
            Self::NonPositiveInteger
            | Self::NegativeInteger
            | Self::Long
            | Self::Int
            | Self::Short
            | Self::Byte
            | Self::NonNegativeInteger
            | Self::UnsignedLong
            | Self::UnsignedInt
            | Self::UnsignedShort
            | Self::UnsignedByte
            | Self::PositiveInteger => {
                INTEGER_RE.is_match(s)
                    && s.parse::<i64>().ok().is_some_and(|i| {
                        let (min, max) = self.integer_bounds().unwrap_or((None, None));
                        min.is_none_or(|m| i >= m) && max.is_none_or(|m| i <= m)
                    })
            }
            Self::Float | Self::Double => {
                matches!(s, "INF" | "-INF" | "+INF" | "NaN") || DOUBLE_RE.is_match(s)
            }
            Self::Duration => validate_duration(s),
            Self::YearMonthDuration => {
                YEAR_MONTH_DURATION_RE
                    .captures(s)
                    .is_some_and(|c| c.get(2).is_some() || c.get(3).is_some())
            }
            Self::DayTimeDuration => {
                DAY_TIME_DURATION_RE.captures(s).is_some_and(|c| {
                    (2..=5).any(|i| c.get(i).is_some()) && !s.ends_with('T')
                })
            }
            Self::DateTime => validate_date_time(s),
            Self::Date => DATE_RE.captures(s).is_some_and(|c| {
                in_range(&c, 2, 1, 12) && in_range(&c, 3, 1, 31)
            }),
            Self::Time => validate_time(s),
            Self::GYearMonth => G_YEAR_MONTH_RE
                .captures(s)
                .is_some_and(|c| in_range(&c, 1, 1, 12)),
            Self::GYear => G_YEAR_RE.is_match(s),
            Self::GMonthDay => G_MONTH_DAY_RE
                .captures(s)
                .is_some_and(|c| in_range(&c, 1, 1, 12) && in_range(&c, 2, 1, 31)),
            Self::GDay => G_DAY_RE.captures(s).is_some_and(|c| in_range(&c, 1, 1, 31)),
            Self::GMonth => G_MONTH_RE
                .captures(s)
                .is_some_and(|c| in_range(&c, 1, 1, 12)),
            Self::AnyUri => !s.contains(['<', '>', '"', ' ']),
            Self::QName => {
                let mut parts = s.split(':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(local), None, _) => NCNAME_RE.is_match(local),
                    (Some(prefix), Some(local), None) => {
                        NCNAME_RE.is_match(prefix) && NCNAME_RE.is_match(local)
                    }
                    _ => false,
                }
            }
            Self::HexBinary => HEX_BINARY_RE.is_match(s),
            Self::Base64Binary => {
                let stripped: String = s.chars().filter(|c| !c.is_whitespace()).collect();
                stripped.len() % 4 == 0 && BASE64_BINARY_RE.is_match(&stripped)
            }
        }
    }

    /// Casts a value to this type, producing a new typed value or a cast
    /// error. Derived types route through their base type first.
    pub fn cast(self, value: &AtomicValue) -> Result<AtomicValue, Error> {
        let from = value.type_name();
        match self {
            Self::AnyAtomicType => Err(Error::cast(
                from,
                self.qualified_name(),
                "cast target unsupported",
            )),
            Self::String => Ok(AtomicValue::String(value.to_string_value())),
            Self::UntypedAtomic => Ok(AtomicValue::UntypedAtomic(value.to_string_value())),
            Self::NormalizedString | Self::Token | Self::Language | Self::Name | Self::NCName => {
                // Derived strings cast through xs:string, then validate.
                let AtomicValue::String(s) = Self::String.cast(value)? else {
                    unreachable!("string cast yields a string");
                };
                let s = whitespace_process(self, &s);
                if self.validate(&s) {
                    Ok(AtomicValue::String(s))
                } else {
                    Err(Error::cast(from, self.qualified_name(), "invalid lexical form"))
                }
            }
            Self::Boolean => cast_boolean(value),
            Self::Decimal => cast_decimal(value),
            Self::Integer => cast_integer(value, None),
            Self::NonPositiveInteger
            | Self::NegativeInteger
            | Self::Long
            | Self::Int
            | Self::Short
            | Self::Byte
            | Self::NonNegativeInteger
            | Self::UnsignedLong
            | Self::UnsignedInt
            | Self::UnsignedShort
            | Self::UnsignedByte
            | Self::PositiveInteger => cast_integer(value, Some(self)),
            Self::Float => cast_float(value).map(AtomicValue::Float),
            Self::Double => cast_double(value).map(AtomicValue::Double),
            Self::Duration | Self::YearMonthDuration | Self::DayTimeDuration => {
                cast_duration(self, value)
            }
            Self::DateTime => cast_date_time(value),
            Self::Date => cast_date(value),
            Self::Time => cast_time(value),
            Self::GYearMonth | Self::GYear | Self::GMonthDay | Self::GDay | Self::GMonth => {
                cast_lexical(self, value, |t, s| match t {
                    Self::GYearMonth => AtomicValue::GYearMonth(s),
                    Self::GYear => AtomicValue::GYear(s),
                    Self::GMonthDay => AtomicValue::GMonthDay(s),
                    Self::GDay => AtomicValue::GDay(s),
                    _ => AtomicValue::GMonth(s),
                })
            }
            Self::AnyUri => match value {
                AtomicValue::AnyUri(_) => Ok(value.clone()),
                AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
                    let s = s.trim().to_string();
                    if self.validate(&s) {
                        Ok(AtomicValue::AnyUri(s))
                    } else {
                        Err(Error::cast(from, self.qualified_name(), "invalid URI"))
                    }
                }
                _ => Err(Error::cast(from, self.qualified_name(), "cast target unsupported")),
            },
            Self::QName => cast_qname(value),
            Self::HexBinary => cast_lexical(self, value, |_, s| AtomicValue::HexBinary(s)),
            Self::Base64Binary => cast_lexical(self, value, |_, s| AtomicValue::Base64Binary(s)),
        }
    }
}

fn in_range(caps: &regex::Captures<'_>, group: usize, min: u32, max: u32) -> bool {
    caps.get(group)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .is_some_and(|v| (min..=max).contains(&v))
}

fn validate_date_time(s: &str) -> bool {
    DATETIME_RE.captures(s).is_some_and(|c| {
        in_range(&c, 2, 1, 12)
            && in_range(&c, 3, 1, 31)
            && in_range(&c, 4, 0, 23)
            && in_range(&c, 5, 0, 59)
            && c.get(6)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .is_some_and(|sec| (0.0..60.0).contains(&sec))
    })
}

fn validate_time(s: &str) -> bool {
    TIME_RE.captures(s).is_some_and(|c| {
        in_range(&c, 1, 0, 23)
            && in_range(&c, 2, 0, 59)
            && c.get(3)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .is_some_and(|sec| (0.0..60.0).contains(&sec))
    })
}

/// A duration needs at least one designator after `P`/`PT`; a bare `P` or
/// a trailing `T` is invalid.
fn validate_duration(s: &str) -> bool {
    let Some(caps) = DURATION_RE.captures(s) else {
        return false;
    };
    let has_component = (2..=7).any(|i| caps.get(i).is_some());
    let time_without_fields =
        s.contains('T') && (5..=7).all(|i| caps.get(i).is_none());
    has_component && !time_without_fields
}

fn whitespace_process(target: AtomicType, s: &str) -> String {
    match target {
        AtomicType::NormalizedString => s.replace(['\t', '\n', '\r'], " "),
        // token and below collapse runs of whitespace and trim.
        _ => s.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn cast_boolean(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    let b = match value {
        AtomicValue::Boolean(b) => *b,
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => match s.trim() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(Error::cast(
                    from,
                    "xs:boolean",
                    format!("'{}' is not a boolean literal", other),
                ));
            }
        },
        AtomicValue::Integer(0) => false,
        AtomicValue::Integer(1) => true,
        v if v.is_numeric() => {
            let d = v.to_double();
            if d == 0.0 {
                false
            } else if d == 1.0 {
                true
            } else {
                return Err(Error::cast(
                    from,
                    "xs:boolean",
                    "only 0 and 1 cast to boolean",
                ));
            }
        }
        _ => return Err(Error::cast(from, "xs:boolean", "cast target unsupported")),
    };
    Ok(AtomicValue::Boolean(b))
}

fn cast_decimal(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    let invalid = |reason: &str| Error::cast(from, "xs:decimal", reason);
    let d = match value {
        AtomicValue::Decimal(d) => *d,
        AtomicValue::Integer(i) => Decimal::from(*i),
        AtomicValue::Boolean(b) => Decimal::from(u8::from(*b)),
        AtomicValue::Float(f) => {
            if !f.is_finite() {
                return Err(invalid("infinity and NaN have no decimal form"));
            }
            Decimal::try_from(*f as f64).map_err(|_| invalid("out of decimal range"))?
        }
        AtomicValue::Double(d) => {
            if !d.is_finite() {
                return Err(invalid("infinity and NaN have no decimal form"));
            }
            Decimal::try_from(*d).map_err(|_| invalid("out of decimal range"))?
        }
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if !DECIMAL_RE.is_match(s) {
                return Err(invalid("invalid decimal literal"));
            }
            s.parse().map_err(|_| invalid("out of decimal range"))?
        }
        _ => return Err(invalid("cast target unsupported")),
    };
    Ok(AtomicValue::Decimal(d))
}

/// Integer and its bounded derivatives cast through xs:decimal, truncate,
/// then range-check.
fn cast_integer(value: &AtomicValue, bounded: Option<AtomicType>) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    let target = bounded.unwrap_or(AtomicType::Integer);
    let AtomicValue::Decimal(d) = AtomicType::Decimal.cast(value)? else {
        unreachable!("decimal cast yields a decimal");
    };
    let i = d
        .trunc()
        .to_i64()
        .ok_or_else(|| Error::cast(from, target.qualified_name(), "out of integer range"))?;
    if let Some((min, max)) = target.integer_bounds() {
        if min.is_some_and(|m| i < m) || max.is_some_and(|m| i > m) {
            return Err(Error::cast(
                from,
                target.qualified_name(),
                format!("{} out of range", i),
            ));
        }
    }
    Ok(AtomicValue::Integer(i))
}

fn cast_float(value: &AtomicValue) -> Result<f32, Error> {
    cast_double(value).map(|d| d as f32)
}

fn cast_double(value: &AtomicValue) -> Result<f64, Error> {
    let from = value.type_name();
    match value {
        AtomicValue::Double(d) => Ok(*d),
        AtomicValue::Float(f) => Ok(*f as f64),
        AtomicValue::Integer(i) => Ok(*i as f64),
        AtomicValue::Decimal(d) => Ok(d.to_f64().unwrap_or(f64::NAN)),
        AtomicValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => match s.trim() {
            "INF" | "+INF" => Ok(f64::INFINITY),
            "-INF" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => {
                if DOUBLE_RE.is_match(other) {
                    other.parse().map_err(|_| {
                        Error::cast(from, "xs:double", "out of double range")
                    })
                } else {
                    Err(Error::cast(
                        from,
                        "xs:double",
                        format!("'{}' is not a numeric literal", other),
                    ))
                }
            }
        },
        _ => Err(Error::cast(from, "xs:double", "cast target unsupported")),
    }
}

fn cast_duration(target: AtomicType, value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    let lexical = match value {
        AtomicValue::Duration(s)
        | AtomicValue::YearMonthDuration(s)
        | AtomicValue::DayTimeDuration(s) => s.clone(),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.trim().to_string(),
        _ => {
            return Err(Error::cast(
                from,
                target.qualified_name(),
                "cast target unsupported",
            ));
        }
    };
    if !target.validate(&lexical) {
        return Err(Error::cast(
            from,
            target.qualified_name(),
            "invalid duration",
        ));
    }
    Ok(match target {
        AtomicType::YearMonthDuration => AtomicValue::YearMonthDuration(lexical),
        AtomicType::DayTimeDuration => AtomicValue::DayTimeDuration(lexical),
        _ => AtomicValue::Duration(lexical),
    })
}

fn cast_date_time(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    match value {
        AtomicValue::DateTime(s) => Ok(AtomicValue::DateTime(s.clone())),
        // A date becomes midnight of that day, keeping the timezone.
        AtomicValue::Date(s) => {
            let (date, tz) = split_timezone(s);
            Ok(AtomicValue::DateTime(format!("{}T00:00:00{}", date, tz)))
        }
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if validate_date_time(s) {
                Ok(AtomicValue::DateTime(s.to_string()))
            } else {
                Err(Error::cast(from, "xs:dateTime", "invalid dateTime"))
            }
        }
        _ => Err(Error::cast(from, "xs:dateTime", "cast target unsupported")),
    }
}

/// xs:date casts through xs:dateTime and truncates the time part.
fn cast_date(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    match value {
        AtomicValue::Date(s) => Ok(AtomicValue::Date(s.clone())),
        AtomicValue::DateTime(_) => truncate_to_date(value),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if !AtomicType::Date.validate(s) {
                return Err(Error::cast(from, "xs:date", "invalid date"));
            }
            let (date, tz) = split_timezone(s);
            let midnight = AtomicValue::String(format!("{}T00:00:00{}", date, tz));
            truncate_to_date(&cast_date_time(&midnight)?)
        }
        _ => Err(Error::cast(from, "xs:date", "cast target unsupported")),
    }
}

fn truncate_to_date(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let AtomicValue::DateTime(s) = value else {
        return Err(Error::cast(value.type_name(), "xs:date", "invalid dateTime"));
    };
    let Some((date_part, rest)) = s.split_once('T') else {
        return Err(Error::cast("xs:dateTime", "xs:date", "invalid dateTime"));
    };
    let (_, tz) = split_timezone(rest);
    Ok(AtomicValue::Date(format!("{}{}", date_part, tz)))
}

fn cast_time(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    match value {
        AtomicValue::Time(s) => Ok(AtomicValue::Time(s.clone())),
        AtomicValue::DateTime(s) => {
            let time = s.split_once('T').map(|(_, t)| t).unwrap_or(s);
            Ok(AtomicValue::Time(time.to_string()))
        }
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if validate_time(s) {
                Ok(AtomicValue::Time(s.to_string()))
            } else {
                Err(Error::cast(from, "xs:time", "invalid time"))
            }
        }
        _ => Err(Error::cast(from, "xs:time", "cast target unsupported")),
    }
}

fn cast_qname(value: &AtomicValue) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    match value {
        AtomicValue::QName { .. } => Ok(value.clone()),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if !AtomicType::QName.validate(s) {
                return Err(Error::cast(from, "xs:QName", "invalid QName"));
            }
            let (prefix, local) = match s.split_once(':') {
                Some((p, l)) => (Some(p.to_string()), l.to_string()),
                None => (None, s.to_string()),
            };
            Ok(AtomicValue::QName {
                prefix,
                local,
                namespace: None,
            })
        }
        _ => Err(Error::cast(from, "xs:QName", "cast target unsupported")),
    }
}

/// Shared path for the lexical passthrough types (gregorians, binaries):
/// same-type passthrough, or validate a string form.
fn cast_lexical(
    target: AtomicType,
    value: &AtomicValue,
    build: fn(AtomicType, String) -> AtomicValue,
) -> Result<AtomicValue, Error> {
    let from = value.type_name();
    if value.atomic_type() == target {
        return Ok(value.clone());
    }
    match value {
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => {
            let s = s.trim();
            if target.validate(s) {
                Ok(build(target, s.to_string()))
            } else {
                Err(Error::cast(from, target.qualified_name(), "invalid lexical form"))
            }
        }
        _ => Err(Error::cast(
            from,
            target.qualified_name(),
            "cast target unsupported",
        )),
    }
}

/// Splits a trailing `Z`/`±HH:MM` timezone from a lexical calendar value.
fn split_timezone(s: &str) -> (&str, &str) {
    if let Some(stripped) = s.strip_suffix('Z') {
        return (stripped, "Z");
    }
    if s.len() > 6 {
        let (head, tail) = s.split_at(s.len() - 6);
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            return (head, tail);
        }
    }
    (s, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_chain_terminates_at_root() {
        for t in [
            AtomicType::Byte,
            AtomicType::NCName,
            AtomicType::DayTimeDuration,
            AtomicType::PositiveInteger,
            AtomicType::Double,
        ] {
            let mut current = t;
            let mut hops = 0;
            while let Some(base) = current.base_type() {
                current = base;
                hops += 1;
                assert!(hops < 16, "base chain of {:?} does not terminate", t);
            }
            assert_eq!(current, AtomicType::AnyAtomicType);
        }
    }

    #[test]
    fn test_primitives() {
        assert_eq!(AtomicType::Byte.primitive(), AtomicType::Decimal);
        assert_eq!(AtomicType::NCName.primitive(), AtomicType::String);
        assert_eq!(AtomicType::Double.primitive(), AtomicType::Double);
        assert_eq!(
            AtomicType::DayTimeDuration.primitive(),
            AtomicType::Duration
        );
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(AtomicType::by_name("string"), Some(AtomicType::String));
        assert_eq!(AtomicType::by_name("anyURI"), Some(AtomicType::AnyUri));
        assert_eq!(AtomicType::by_name("fictitious"), None);
    }

    #[test]
    fn test_boolean_cast_spellings() {
        for ok in ["true", "1"] {
            assert_eq!(
                AtomicType::Boolean.cast(&AtomicValue::String(ok.into())),
                Ok(AtomicValue::Boolean(true))
            );
        }
        for ok in ["false", "0"] {
            assert_eq!(
                AtomicType::Boolean.cast(&AtomicValue::String(ok.into())),
                Ok(AtomicValue::Boolean(false))
            );
        }
        for bad in ["TRUE", "True", "yes", ""] {
            assert!(AtomicType::Boolean.cast(&AtomicValue::String(bad.into())).is_err());
        }
        assert!(AtomicType::Boolean.cast(&AtomicValue::Integer(2)).is_err());
        assert_eq!(
            AtomicType::Boolean.cast(&AtomicValue::Double(1.0)),
            Ok(AtomicValue::Boolean(true))
        );
        assert!(AtomicType::Boolean.cast(&AtomicValue::Double(f64::NAN)).is_err());
    }

    #[test]
    fn test_double_cast_special_literals() {
        assert_eq!(
            AtomicType::Double.cast(&AtomicValue::String("INF".into())),
            Ok(AtomicValue::Double(f64::INFINITY))
        );
        assert_eq!(
            AtomicType::Double.cast(&AtomicValue::String("-INF".into())),
            Ok(AtomicValue::Double(f64::NEG_INFINITY))
        );
        let nan = AtomicType::Double.cast(&AtomicValue::String("NaN".into()));
        assert!(matches!(nan, Ok(AtomicValue::Double(d)) if d.is_nan()));
        assert!(
            AtomicType::Double
                .cast(&AtomicValue::String("not-a-number".into()))
                .is_err()
        );
    }

    #[test]
    fn test_decimal_rejects_inf_and_nan() {
        assert!(AtomicType::Decimal.cast(&AtomicValue::Double(f64::INFINITY)).is_err());
        assert!(AtomicType::Decimal.cast(&AtomicValue::Double(f64::NAN)).is_err());
        assert!(AtomicType::Decimal.cast(&AtomicValue::String("INF".into())).is_err());
        assert!(AtomicType::Integer.cast(&AtomicValue::String("NaN".into())).is_err());
    }

    #[test]
    fn test_integer_cast_failures() {
        assert!(
            AtomicType::Integer
                .cast(&AtomicValue::String("not-a-number".into()))
                .is_err()
        );
        assert_eq!(
            AtomicType::Integer.cast(&AtomicValue::String("42".into())),
            Ok(AtomicValue::Integer(42))
        );
        assert_eq!(
            AtomicType::Integer.cast(&AtomicValue::Decimal(Decimal::new(37, 1))),
            Ok(AtomicValue::Integer(3))
        );
    }

    #[test]
    fn test_bounded_integer_ranges() {
        assert_eq!(
            AtomicType::Byte.cast(&AtomicValue::Integer(127)),
            Ok(AtomicValue::Integer(127))
        );
        assert!(AtomicType::Byte.cast(&AtomicValue::Integer(128)).is_err());
        assert!(AtomicType::NonNegativeInteger.cast(&AtomicValue::Integer(-1)).is_err());
        assert!(AtomicType::PositiveInteger.cast(&AtomicValue::Integer(0)).is_err());
        assert_eq!(
            AtomicType::UnsignedByte.cast(&AtomicValue::String("255".into())),
            Ok(AtomicValue::Integer(255))
        );
    }

    #[test]
    fn test_duration_requires_designator() {
        assert!(!AtomicType::Duration.validate("P"));
        assert!(!AtomicType::Duration.validate("-P"));
        assert!(!AtomicType::Duration.validate("PT"));
        assert!(!AtomicType::Duration.validate("P1DT"));
        assert!(AtomicType::Duration.validate("P1D"));
        assert!(AtomicType::Duration.validate("PT1H"));
        assert!(AtomicType::Duration.validate("P1DT5H"));
        assert!(AtomicType::Duration.validate("PT5M"));
        assert!(AtomicType::Duration.validate("-P2Y6M"));
        assert!(AtomicType::DayTimeDuration.validate("PT1.5S"));
        assert!(!AtomicType::DayTimeDuration.validate("P1Y"));
        assert!(AtomicType::YearMonthDuration.validate("P1Y2M"));
        assert!(!AtomicType::YearMonthDuration.validate("P1D"));
    }

    #[test]
    fn test_time_ranges() {
        assert!(AtomicType::Time.validate("23:59:59"));
        assert!(AtomicType::Time.validate("00:00:00Z"));
        assert!(AtomicType::Time.validate("13:20:00+05:30"));
        assert!(AtomicType::Time.validate("12:30:59.999"));
        assert!(!AtomicType::Time.validate("24:00:00"));
        assert!(!AtomicType::Time.validate("12:60:00"));
        assert!(!AtomicType::Time.validate("12:00:60"));
    }

    #[test]
    fn test_date_through_date_time() {
        assert_eq!(
            AtomicType::Date.cast(&AtomicValue::DateTime("2020-01-15T13:45:00Z".into())),
            Ok(AtomicValue::Date("2020-01-15Z".into()))
        );
        assert_eq!(
            AtomicType::Date.cast(&AtomicValue::String("2020-01-15".into())),
            Ok(AtomicValue::Date("2020-01-15".into()))
        );
        assert_eq!(
            AtomicType::DateTime.cast(&AtomicValue::Date("2020-01-15".into())),
            Ok(AtomicValue::DateTime("2020-01-15T00:00:00".into()))
        );
        assert!(AtomicType::Date.cast(&AtomicValue::String("2020-13-01".into())).is_err());
    }

    #[test]
    fn test_derived_string_whitespace() {
        assert_eq!(
            AtomicType::Token.cast(&AtomicValue::String("  a  b ".into())),
            Ok(AtomicValue::String("a b".into()))
        );
        assert!(AtomicType::NCName.cast(&AtomicValue::String("has space".into())).is_err());
        assert!(AtomicType::Language.cast(&AtomicValue::String("en-US".into())).is_ok());
        assert!(AtomicType::Language.cast(&AtomicValue::String("12".into())).is_err());
    }

    #[test]
    fn test_binary_validation() {
        assert!(AtomicType::HexBinary.validate("0FB7"));
        assert!(!AtomicType::HexBinary.validate("0FB"));
        assert!(AtomicType::Base64Binary.validate("AAEC"));
        assert!(!AtomicType::Base64Binary.validate("A!"));
    }
}
