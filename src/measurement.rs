use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Text an operator types to mark a limit or reading as not applicable.
pub const NOT_APPLICABLE: &str = "-";

/// A numeric form field that may also be blank or explicitly not applicable.
///
/// On the wire a blank field is `""`, a not-applicable field is `"-"` and a
/// reading is a plain JSON number.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Measurement {
    #[default]
    Unset,
    NotApplicable,
    Value(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{0}' is not a whole number")]
    NotACount(String),
    #[error("value {0} is not finite")]
    NotFinite(f64),
}

impl Measurement {
    /// Parse operator input: blank, `-`, or a finite decimal number.
    pub fn parse(raw: &str) -> Result<Self, MeasurementError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Measurement::Unset);
        }
        if trimmed == NOT_APPLICABLE {
            return Ok(Measurement::NotApplicable);
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| MeasurementError::NotANumber(trimmed.to_string()))?;
        Measurement::from_f64(value)
    }

    /// Parse a non-negative whole-number count such as a unit number.
    pub fn parse_count(raw: &str) -> Result<Self, MeasurementError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Measurement::Unset);
        }
        let count: u64 = trimmed
            .parse()
            .map_err(|_| MeasurementError::NotACount(trimmed.to_string()))?;
        Ok(Measurement::Value(count as f64))
    }

    pub fn from_f64(value: f64) -> Result<Self, MeasurementError> {
        if value.is_finite() {
            Ok(Measurement::Value(value))
        } else {
            Err(MeasurementError::NotFinite(value))
        }
    }

    /// The reading, if there is one.
    pub fn value(&self) -> Option<f64> {
        match self {
            Measurement::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// The reading, or zero when blank or not applicable.
    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    /// The reading when it is present and non-zero.
    pub fn nonzero(&self) -> Option<f64> {
        self.value().filter(|v| *v != 0.0)
    }

    /// True for anything the operator actually filled in, including `-`.
    pub fn is_set(&self) -> bool {
        !matches!(self, Measurement::Unset)
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Measurement::NotApplicable)
    }
}

impl From<f64> for Measurement {
    fn from(value: f64) -> Self {
        Measurement::Value(value)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Unset => Ok(()),
            Measurement::NotApplicable => f.write_str(NOT_APPLICABLE),
            Measurement::Value(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measurement::Unset => serializer.serialize_str(""),
            Measurement::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
            Measurement::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

struct MeasurementVisitor;

impl<'de> Visitor<'de> for MeasurementVisitor {
    type Value = Measurement;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, an empty string or \"-\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Measurement, E> {
        Measurement::from_f64(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Measurement, E> {
        Ok(Measurement::Value(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Measurement, E> {
        Ok(Measurement::Value(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Measurement, E> {
        Measurement::parse(v).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Measurement, E> {
        Ok(Measurement::Unset)
    }

    fn visit_none<E: de::Error>(self) -> Result<Measurement, E> {
        Ok(Measurement::Unset)
    }
}

impl<'de> Deserialize<'de> for Measurement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MeasurementVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blank_dash_and_numbers() {
        assert_eq!(Measurement::parse("").unwrap(), Measurement::Unset);
        assert_eq!(Measurement::parse("   ").unwrap(), Measurement::Unset);
        assert_eq!(Measurement::parse("-").unwrap(), Measurement::NotApplicable);
        assert_eq!(Measurement::parse(" 2.010 ").unwrap(), Measurement::Value(2.01));
        assert_eq!(Measurement::parse("1.").unwrap(), Measurement::Value(1.0));
        assert!(matches!(
            Measurement::parse("abc"),
            Err(MeasurementError::NotANumber(_))
        ));
        assert!(Measurement::parse("inf").is_err());
    }

    #[test]
    fn counts_must_be_whole_and_non_negative() {
        assert_eq!(Measurement::parse_count("42").unwrap(), Measurement::Value(42.0));
        assert_eq!(Measurement::parse_count("").unwrap(), Measurement::Unset);
        assert!(Measurement::parse_count("4.5").is_err());
        assert!(Measurement::parse_count("-3").is_err());
    }

    #[test]
    fn set_and_value_accessors() {
        assert!(!Measurement::Unset.is_set());
        assert!(Measurement::NotApplicable.is_set());
        assert_eq!(Measurement::NotApplicable.value(), None);
        assert_eq!(Measurement::Value(0.0).nonzero(), None);
        assert_eq!(Measurement::Value(3.5).value_or_zero(), 3.5);
    }

    #[test]
    fn json_representation() {
        let values = vec![
            Measurement::Unset,
            Measurement::NotApplicable,
            Measurement::Value(1.25),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["","-",1.25]"#);

        let parsed: Vec<Measurement> = serde_json::from_str(r#"["", "-", 3, "4.5", null]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Measurement::Unset,
                Measurement::NotApplicable,
                Measurement::Value(3.0),
                Measurement::Value(4.5),
                Measurement::Unset,
            ]
        );
        assert!(serde_json::from_str::<Measurement>(r#""x""#).is_err());
    }
}
