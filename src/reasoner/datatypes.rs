//! Value-space checks for data ranges.
//!
//! Literal values are tested directly. For values the tableau has not fixed
//! yet, satisfiability is decided over a finite set of witness candidates; when
//! no sensible witnesses can be produced the range is assumed satisfiable.

use std::cmp::Ordering;

use regex::Regex;

use super::axioms::{DataRange, LiteralKey};
use crate::ontology::{
    literals::{self, DataValue, NumericFamily},
    vocab::{owl, rdf, xsd},
};

const LENGTH: &str = "http://www.w3.org/2001/XMLSchema#length";
const MIN_LENGTH: &str = "http://www.w3.org/2001/XMLSchema#minLength";
const MAX_LENGTH: &str = "http://www.w3.org/2001/XMLSchema#maxLength";

/// Returns `true` if `value` lies in `range`.
#[must_use]
pub fn admits(range: &DataRange, value: &DataValue) -> bool {
    match range {
        DataRange::Any => true,
        DataRange::Datatype(datatype) => in_datatype(value, datatype),
        DataRange::Not(inner) => !admits(inner, value),
        DataRange::OneOf(members) => members
            .iter()
            .any(|member| member.value().is_ok_and(|member| member.same_value(value))),
        DataRange::Restricted { base, facets } => {
            in_datatype(value, base)
                && facets
                    .iter()
                    .all(|(facet, bound)| facet_holds(facet, bound, value))
        }
        DataRange::And(parts) => parts.iter().all(|part| admits(part, value)),
        DataRange::Or(parts) => parts.iter().any(|part| admits(part, value)),
    }
}

fn in_datatype(value: &DataValue, datatype: &str) -> bool {
    if !literals::is_supported(datatype) {
        return true;
    }
    match value {
        DataValue::Text {
            datatype: own,
            language: None,
            ..
        } if !literals::is_supported(own) => true,
        _ => value.belongs_to(datatype),
    }
}

fn facet_holds(facet: &str, bound: &LiteralKey, value: &DataValue) -> bool {
    match facet {
        xsd::MIN_INCLUSIVE | xsd::MAX_INCLUSIVE | xsd::MIN_EXCLUSIVE | xsd::MAX_EXCLUSIVE => {
            let Ok(bound) = bound.value() else {
                return true;
            };
            let Some(ordering) = compare_numbers(value, &bound).or_else(|| value.compare(&bound))
            else {
                return false;
            };
            match facet {
                xsd::MIN_INCLUSIVE => ordering != Ordering::Less,
                xsd::MAX_INCLUSIVE => ordering != Ordering::Greater,
                xsd::MIN_EXCLUSIVE => ordering == Ordering::Greater,
                _ => ordering == Ordering::Less,
            }
        }
        xsd::PATTERN => match (value, Regex::new(&format!("^(?:{})$", bound.lexical))) {
            (DataValue::Text { value, .. }, Ok(pattern)) => pattern.is_match(value),
            _ => true,
        },
        LENGTH | MIN_LENGTH | MAX_LENGTH => {
            let (DataValue::Text { value, .. }, Ok(limit)) = (value, bound.lexical.trim().parse::<usize>())
            else {
                return true;
            };
            let length = value.chars().count();
            match facet {
                LENGTH => length == limit,
                MIN_LENGTH => length >= limit,
                _ => length <= limit,
            }
        }
        _ => true,
    }
}

/// Bounds written in another numeric family still constrain the value.
fn compare_numbers(value: &DataValue, bound: &DataValue) -> Option<Ordering> {
    match (value, bound) {
        (DataValue::Number { value, .. }, DataValue::Number { value: bound, .. }) => {
            value.partial_cmp(bound)
        }
        _ => None,
    }
}

/// Returns `true` if some value lies in every range.
#[must_use]
pub fn satisfiable(ranges: &[&DataRange]) -> bool {
    let Some(candidates) = candidates(ranges) else {
        return true;
    };
    candidates
        .iter()
        .any(|candidate| ranges.iter().all(|range| admits(range, candidate)))
}

fn candidates(ranges: &[&DataRange]) -> Option<Vec<DataValue>> {
    for range in ranges {
        if let DataRange::OneOf(members) = range {
            return Some(members.iter().filter_map(|member| member.value().ok()).collect());
        }
    }

    let mut bases = Vec::new();
    let mut bounds = Vec::new();
    let mut listed = Vec::new();
    for range in ranges {
        if !collect(range, &mut bases, &mut bounds, &mut listed) {
            return None;
        }
    }

    let mut values = listed;
    if bases.is_empty() {
        bases = vec![xsd::STRING.to_string(), xsd::INTEGER.to_string(), xsd::BOOLEAN.to_string()];
    }
    for base in &bases {
        if !witnesses(base, &bounds, &mut values) {
            return None;
        }
    }
    Some(values)
}

/// Walks the positive structure of a range. Returns `false` when witnesses
/// cannot be generated reliably.
fn collect(
    range: &DataRange,
    bases: &mut Vec<String>,
    bounds: &mut Vec<f64>,
    listed: &mut Vec<DataValue>,
) -> bool {
    match range {
        DataRange::Any => true,
        DataRange::Datatype(datatype) => {
            bases.push(datatype.clone());
            true
        }
        DataRange::Restricted { base, facets } => {
            bases.push(base.clone());
            for (facet, bound) in facets {
                match facet.as_str() {
                    xsd::MIN_INCLUSIVE | xsd::MAX_INCLUSIVE | xsd::MIN_EXCLUSIVE
                    | xsd::MAX_EXCLUSIVE => match bound.value().ok().and_then(|v| v.as_f64()) {
                        Some(bound) => bounds.push(bound),
                        None => return false,
                    },
                    _ => return false,
                }
            }
            true
        }
        DataRange::OneOf(members) => {
            listed.extend(members.iter().filter_map(|member| member.value().ok()));
            true
        }
        DataRange::Not(inner) => {
            if let DataRange::OneOf(members) = inner.as_ref() {
                listed.extend(members.iter().filter_map(|member| member.value().ok()));
            }
            true
        }
        DataRange::And(parts) | DataRange::Or(parts) => parts
            .iter()
            .all(|part| collect(part, bases, bounds, listed)),
    }
}

fn witnesses(base: &str, bounds: &[f64], values: &mut Vec<DataValue>) -> bool {
    if !literals::is_supported(base) {
        return false;
    }
    let family = match base {
        xsd::FLOAT => Some(NumericFamily::Float),
        xsd::DOUBLE => Some(NumericFamily::Double),
        xsd::DECIMAL | owl::REAL | owl::RATIONAL => Some(NumericFamily::Real),
        other if literals::is_integer_type(other) => Some(NumericFamily::Real),
        _ => None,
    };
    if let Some(family) = family {
        let mut points = vec![0.0, 1.0, -1.0, 2.0, 42.0, 1_000_000.0, -1_000_000.0];
        for bound in bounds {
            points.extend([*bound, bound + 1.0, bound - 1.0, bound.floor(), bound.ceil()]);
            for other in bounds {
                points.push((bound + other) / 2.0);
            }
        }
        values.extend(points.into_iter().map(|value| DataValue::Number {
            family,
            value,
            integral: value.fract() == 0.0,
        }));
        return true;
    }
    match base {
        xsd::BOOLEAN => values.extend([DataValue::Boolean(true), DataValue::Boolean(false)]),
        rdf::LANG_STRING | rdf::PLAIN_LITERAL => {
            for value in ["a", "b"] {
                values.push(DataValue::Text {
                    datatype: rdf::LANG_STRING.to_string(),
                    value: value.to_string(),
                    language: Some("en".to_string()),
                });
            }
            if base == rdf::PLAIN_LITERAL {
                values.push(text(xsd::STRING, "a"));
            }
        }
        xsd::DATE | xsd::DATE_TIME | xsd::DATE_TIME_STAMP | xsd::TIME => {
            if !bounds.is_empty() {
                return false;
            }
            let lexical = match base {
                xsd::DATE => "2000-01-01",
                xsd::TIME => "12:00:00",
                _ => "2000-01-01T00:00:00Z",
            };
            match literals::parse(base, lexical) {
                Ok(value) => values.push(value),
                Err(_) => return false,
            }
        }
        _ => {
            for value in ["a", "b", "c"] {
                values.push(text(base, value));
            }
        }
    }
    true
}

fn text(datatype: &str, value: &str) -> DataValue {
    DataValue::Text {
        datatype: datatype.to_string(),
        value: value.to_string(),
        language: None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn key(lexical: &str, datatype: &str) -> LiteralKey {
        LiteralKey {
            lexical: lexical.to_string(),
            datatype: datatype.to_string(),
            language: None,
        }
    }

    fn age_range() -> DataRange {
        DataRange::Restricted {
            base: xsd::INTEGER.to_string(),
            facets: vec![
                (xsd::MIN_INCLUSIVE.to_string(), key("0", xsd::INTEGER)),
                (xsd::MAX_INCLUSIVE.to_string(), key("120", xsd::INTEGER)),
            ],
        }
    }

    #[rstest]
    #[case("30", xsd::INTEGER, true)]
    #[case("330", xsd::INTEGER, false)]
    #[case("-1", xsd::INTEGER, false)]
    #[case("30.5", xsd::DECIMAL, false)]
    #[case("thirty", xsd::STRING, false)]
    fn bounded_integers(#[case] lexical: &str, #[case] datatype: &str, #[case] expected: bool) {
        let value = key(lexical, datatype).value().expect("well typed");
        assert_eq!(admits(&age_range(), &value), expected);
    }

    #[test]
    fn unknown_datatypes_admit_everything() {
        let value = key("x", "https://example.org/custom").value().expect("value");
        assert!(admits(&DataRange::Datatype(xsd::INTEGER.to_string()), &value));
        let number = key("1", xsd::INTEGER).value().expect("value");
        assert!(admits(
            &DataRange::Datatype("https://example.org/custom".to_string()),
            &number
        ));
    }

    #[test]
    fn detects_empty_intersections() {
        let integer = DataRange::Datatype(xsd::INTEGER.to_string());
        let string = DataRange::Datatype(xsd::STRING.to_string());
        assert!(!satisfiable(&[&integer, &string]));
        assert!(satisfiable(&[&integer, &age_range()]));

        let empty = DataRange::Restricted {
            base: xsd::INTEGER.to_string(),
            facets: vec![
                (xsd::MIN_EXCLUSIVE.to_string(), key("0", xsd::INTEGER)),
                (xsd::MAX_EXCLUSIVE.to_string(), key("1", xsd::INTEGER)),
            ],
        };
        assert!(!satisfiable(&[&empty]));
        assert!(!satisfiable(&[&DataRange::Any.negate()]));
    }

    #[test]
    fn enumerations_constrain_witnesses() {
        let colours = DataRange::OneOf(vec![key("red", xsd::STRING), key("blue", xsd::STRING)]);
        let not_red = DataRange::OneOf(vec![key("red", xsd::STRING)]).negate();
        assert!(satisfiable(&[&colours, &not_red]));
        let not_blue = DataRange::OneOf(vec![key("blue", xsd::STRING)]).negate();
        assert!(!satisfiable(&[&colours, &not_red, &not_blue]));
    }
}
