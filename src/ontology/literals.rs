//! Typed literal values.
//!
//! Lexical forms are mapped onto the value spaces the validators and the
//! reasoner compare: numbers (with their OWL value-space family), booleans,
//! temporal values and text. Datatypes outside the supported set are kept as
//! uninterpreted text and never rejected.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use oxrdf::Literal;

use super::vocab::{owl, rdf, rdfs, xsd};

/// Literal whose lexical form is outside its datatype's lexical space.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("\"{lexical}\" is not a valid {datatype}")]
pub struct LiteralError {
    pub lexical: String,
    pub datatype: String,
}

/// Disjoint numeric value spaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumericFamily {
    /// `owl:real`: decimals and every integer type.
    Real,
    Float,
    Double,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Number {
        family: NumericFamily,
        value: f64,
        integral: bool,
    },
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    LocalDateTime(NaiveDateTime),
    Time(NaiveTime),
    Text {
        datatype: String,
        value: String,
        language: Option<String>,
    },
}

/// Integer subtypes with their inclusive bounds.
const INTEGER_TYPES: &[(&str, Option<f64>, Option<f64>)] = &[
    (xsd::INTEGER, None, None),
    (xsd::LONG, Some(-9_223_372_036_854_775_808.0), Some(9_223_372_036_854_775_807.0)),
    (xsd::INT, Some(-2_147_483_648.0), Some(2_147_483_647.0)),
    (xsd::SHORT, Some(-32_768.0), Some(32_767.0)),
    (xsd::BYTE, Some(-128.0), Some(127.0)),
    (xsd::NON_NEGATIVE_INTEGER, Some(0.0), None),
    (xsd::POSITIVE_INTEGER, Some(1.0), None),
    (xsd::NON_POSITIVE_INTEGER, None, Some(0.0)),
    (xsd::NEGATIVE_INTEGER, None, Some(-1.0)),
    (xsd::UNSIGNED_LONG, Some(0.0), Some(18_446_744_073_709_551_615.0)),
    (xsd::UNSIGNED_INT, Some(0.0), Some(4_294_967_295.0)),
    (xsd::UNSIGNED_SHORT, Some(0.0), Some(65_535.0)),
    (xsd::UNSIGNED_BYTE, Some(0.0), Some(255.0)),
];

const STRING_TYPES: &[&str] = &[
    xsd::STRING,
    xsd::NORMALIZED_STRING,
    xsd::TOKEN,
    xsd::LANGUAGE,
    xsd::NAME,
    xsd::NCNAME,
];

fn is_integer_lexical(lexical: &str) -> bool {
    let digits = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_decimal_lexical(lexical: &str) -> bool {
    let unsigned = lexical.strip_prefix(['+', '-']).unwrap_or(lexical);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    (!whole.is_empty() || !fraction.is_empty())
        && whole.bytes().all(|byte| byte.is_ascii_digit())
        && fraction.bytes().all(|byte| byte.is_ascii_digit())
}

fn is_float_lexical(lexical: &str) -> bool {
    if matches!(lexical, "INF" | "+INF" | "-INF" | "NaN") {
        return true;
    }
    let (mantissa, exponent) = lexical
        .split_once(['e', 'E'])
        .map_or((lexical, None), |(mantissa, exponent)| (mantissa, Some(exponent)));
    is_decimal_lexical(mantissa) && exponent.map_or(true, is_integer_lexical)
}

/// Returns `true` if `datatype` is one of the integer types.
#[must_use]
pub fn is_integer_type(datatype: &str) -> bool {
    INTEGER_TYPES.iter().any(|(iri, _, _)| *iri == datatype)
}

/// Returns `true` for datatypes whose values are checked by [`parse`].
#[must_use]
pub fn is_supported(datatype: &str) -> bool {
    is_integer_type(datatype)
        || STRING_TYPES.contains(&datatype)
        || [
            xsd::DECIMAL,
            xsd::FLOAT,
            xsd::DOUBLE,
            xsd::BOOLEAN,
            xsd::DATE,
            xsd::DATE_TIME,
            xsd::DATE_TIME_STAMP,
            xsd::TIME,
            xsd::ANY_URI,
            rdf::LANG_STRING,
            rdf::PLAIN_LITERAL,
            rdfs::LITERAL,
            owl::REAL,
            owl::RATIONAL,
        ]
        .contains(&datatype)
}

/// Maps a lexical form of `datatype` to its value.
///
/// # Errors
///
/// Returns [`LiteralError`] when the lexical form is not valid for a
/// supported datatype.
pub fn parse(datatype: &str, lexical: &str) -> Result<DataValue, LiteralError> {
    let invalid = || LiteralError {
        lexical: lexical.to_string(),
        datatype: datatype.to_string(),
    };
    let trimmed = lexical.trim();

    if let Some((_, minimum, maximum)) = INTEGER_TYPES.iter().find(|(iri, _, _)| *iri == datatype)
    {
        if !is_integer_lexical(trimmed) {
            return Err(invalid());
        }
        let value: f64 = trimmed.parse().map_err(|_| invalid())?;
        if minimum.is_some_and(|min| value < min) || maximum.is_some_and(|max| value > max) {
            return Err(invalid());
        }
        return Ok(DataValue::Number {
            family: NumericFamily::Real,
            value,
            integral: true,
        });
    }

    match datatype {
        xsd::DECIMAL => {
            if !is_decimal_lexical(trimmed) {
                return Err(invalid());
            }
            let value: f64 = trimmed.parse().map_err(|_| invalid())?;
            Ok(DataValue::Number {
                family: NumericFamily::Real,
                value,
                integral: value.fract() == 0.0,
            })
        }
        xsd::FLOAT | xsd::DOUBLE => {
            if !is_float_lexical(trimmed) {
                return Err(invalid());
            }
            let value = match trimmed {
                "INF" | "+INF" => f64::INFINITY,
                "-INF" => f64::NEG_INFINITY,
                "NaN" => f64::NAN,
                other => other.parse().map_err(|_| invalid())?,
            };
            let family = if datatype == xsd::FLOAT {
                NumericFamily::Float
            } else {
                NumericFamily::Double
            };
            Ok(DataValue::Number {
                family,
                value,
                integral: value.fract() == 0.0,
            })
        }
        xsd::BOOLEAN => match trimmed {
            "true" | "1" => Ok(DataValue::Boolean(true)),
            "false" | "0" => Ok(DataValue::Boolean(false)),
            _ => Err(invalid()),
        },
        xsd::DATE => parse_date(trimmed).map(DataValue::Date).ok_or_else(invalid),
        xsd::DATE_TIME | xsd::DATE_TIME_STAMP => {
            if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
                return Ok(DataValue::DateTime(value));
            }
            if datatype == xsd::DATE_TIME_STAMP {
                return Err(invalid());
            }
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .map(DataValue::LocalDateTime)
                .map_err(|_| invalid())
        }
        xsd::TIME => {
            let local = strip_timezone(trimmed);
            NaiveTime::parse_from_str(local, "%H:%M:%S%.f")
                .map(DataValue::Time)
                .map_err(|_| invalid())
        }
        owl::REAL | owl::RATIONAL => Err(invalid()),
        _ => Ok(DataValue::Text {
            datatype: datatype.to_string(),
            value: lexical.to_string(),
            language: None,
        }),
    }
}

/// Maps an RDF literal to its value.
///
/// # Errors
///
/// See [`parse`].
pub fn from_literal(literal: &Literal) -> Result<DataValue, LiteralError> {
    if let Some(language) = literal.language() {
        return Ok(DataValue::Text {
            datatype: rdf::LANG_STRING.to_string(),
            value: literal.value().to_string(),
            language: Some(language.to_ascii_lowercase()),
        });
    }
    parse(literal.datatype().as_str(), literal.value())
}

fn strip_timezone(lexical: &str) -> &str {
    if let Some(stripped) = lexical.strip_suffix('Z') {
        return stripped;
    }
    let bytes = lexical.as_bytes();
    if bytes.len() > 6 && matches!(bytes[bytes.len() - 6], b'+' | b'-') && bytes[bytes.len() - 3] == b':'
    {
        return &lexical[..lexical.len() - 6];
    }
    lexical
}

fn parse_date(lexical: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(strip_timezone(lexical), "%Y-%m-%d").ok()
}

/// Returns `true` when literals typed `actual` are acceptable where
/// `expected` is declared (same type or a derived one).
#[must_use]
pub fn conforms(actual: &str, expected: &str) -> bool {
    if actual == expected || expected == rdfs::LITERAL {
        return true;
    }
    match expected {
        xsd::INTEGER => is_integer_type(actual),
        xsd::DECIMAL | owl::REAL | owl::RATIONAL => {
            actual == xsd::DECIMAL || is_integer_type(actual)
        }
        xsd::STRING => STRING_TYPES.contains(&actual),
        xsd::DATE_TIME => actual == xsd::DATE_TIME_STAMP,
        rdf::PLAIN_LITERAL => actual == xsd::STRING || actual == rdf::LANG_STRING,
        _ => false,
    }
}

impl DataValue {
    /// Returns the numeric value, if any.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns `true` if the value lies in the value space of `datatype`.
    #[must_use]
    pub fn belongs_to(&self, datatype: &str) -> bool {
        if datatype == rdfs::LITERAL {
            return true;
        }
        match self {
            Self::Number {
                family: NumericFamily::Real,
                value,
                integral,
            } => {
                if let Some((_, minimum, maximum)) =
                    INTEGER_TYPES.iter().find(|(iri, _, _)| *iri == datatype)
                {
                    return *integral
                        && !minimum.is_some_and(|min| *value < min)
                        && !maximum.is_some_and(|max| *value > max);
                }
                matches!(datatype, xsd::DECIMAL | owl::REAL | owl::RATIONAL)
            }
            Self::Number {
                family: NumericFamily::Float,
                ..
            } => datatype == xsd::FLOAT,
            Self::Number {
                family: NumericFamily::Double,
                ..
            } => datatype == xsd::DOUBLE,
            Self::Boolean(_) => datatype == xsd::BOOLEAN,
            Self::Date(_) => datatype == xsd::DATE,
            Self::DateTime(_) => matches!(datatype, xsd::DATE_TIME | xsd::DATE_TIME_STAMP),
            Self::LocalDateTime(_) => datatype == xsd::DATE_TIME,
            Self::Time(_) => datatype == xsd::TIME,
            Self::Text {
                datatype: own,
                language,
                ..
            } => {
                if language.is_some() {
                    return matches!(datatype, rdf::LANG_STRING | rdf::PLAIN_LITERAL);
                }
                if STRING_TYPES.contains(&own.as_str()) {
                    return conforms(own, datatype) || datatype == rdf::PLAIN_LITERAL;
                }
                own == datatype || !is_supported(datatype)
            }
        }
    }

    /// Orders two values of the same value space.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (
                Self::Number {
                    family: left_family,
                    value: left,
                    ..
                },
                Self::Number {
                    family: right_family,
                    value: right,
                    ..
                },
            ) if left_family == right_family => left.partial_cmp(right),
            (Self::Date(left), Self::Date(right)) => Some(left.cmp(right)),
            (Self::DateTime(left), Self::DateTime(right)) => Some(left.cmp(right)),
            (Self::LocalDateTime(left), Self::LocalDateTime(right)) => Some(left.cmp(right)),
            (Self::Time(left), Self::Time(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    /// Value equality (`"30"^^xsd:int` equals `"30.0"^^xsd:decimal`).
    #[must_use]
    pub fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text { .. }, Self::Text { .. }) | (Self::Boolean(_), Self::Boolean(_)) => {
                self == other
            }
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(xsd::INTEGER, "30", true)]
    #[case(xsd::INTEGER, "thirty", false)]
    #[case(xsd::INTEGER, "3.5", false)]
    #[case(xsd::BYTE, "300", false)]
    #[case(xsd::NON_NEGATIVE_INTEGER, "-1", false)]
    #[case(xsd::DECIMAL, "-1.25", true)]
    #[case(xsd::DOUBLE, "1e10", true)]
    #[case(xsd::FLOAT, "INF", true)]
    #[case(xsd::BOOLEAN, "yes", false)]
    #[case(xsd::DATE, "2024-02-30", false)]
    #[case(xsd::DATE, "2024-02-28Z", true)]
    #[case(xsd::DATE_TIME, "2024-02-28T10:00:00+02:00", true)]
    #[case(xsd::DATE_TIME, "2024-02-28T10:00:00", true)]
    #[case(xsd::TIME, "10:00:00Z", true)]
    #[case("https://example.org/custom", "anything", true)]
    fn checks_lexical_forms(#[case] datatype: &str, #[case] lexical: &str, #[case] ok: bool) {
        assert_eq!(parse(datatype, lexical).is_ok(), ok, "{lexical} as {datatype}");
    }

    #[test]
    fn numeric_families_are_disjoint() {
        let integer = parse(xsd::INTEGER, "30").expect("integer");
        let decimal = parse(xsd::DECIMAL, "30.0").expect("decimal");
        let float = parse(xsd::FLOAT, "30").expect("float");
        assert!(integer.same_value(&decimal));
        assert!(!integer.same_value(&float));
        assert!(integer.belongs_to(xsd::DECIMAL));
        assert!(integer.belongs_to(xsd::BYTE));
        assert!(!float.belongs_to(xsd::DECIMAL));
        assert!(!decimal.belongs_to(xsd::STRING));
    }

    #[test]
    fn derived_types_conform() {
        assert!(conforms(xsd::INT, xsd::INTEGER));
        assert!(conforms(xsd::INTEGER, xsd::DECIMAL));
        assert!(!conforms(xsd::DECIMAL, xsd::INTEGER));
        assert!(!conforms(xsd::STRING, xsd::INTEGER));
        assert!(conforms(xsd::TOKEN, xsd::STRING));
    }
}
