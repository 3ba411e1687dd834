//! Typed field values.
//!
//! # Responsibilities
//! - Map declared type names to a closed set of runtime representations
//! - Coerce loosely-typed seed data into typed values
//! - Parse path arguments into index keys
//! - Render values back to JSON
//!
//! # Design Decisions
//! - One enum for every stored value, no per-entity generated types
//! - Values of one field always share a variant, so the total order across
//!   variants only has to be consistent, not meaningful
//! - Floats are ordered with `total_cmp` so they can live in index keys

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as Json;

/// Declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Int,
    Bool,
    Float,
    Timestamp,
}

impl DataType {
    /// The value a declared field takes when a seed row omits it.
    pub fn zero(self) -> Value {
        match self {
            DataType::String => Value::Text(String::new()),
            DataType::Int => Value::Integer(0),
            DataType::Bool => Value::Boolean(false),
            DataType::Float => Value::Float(0.0),
            DataType::Timestamp => Value::Instant(DateTime::<Utc>::default()),
        }
    }

    /// Coerce a JSON seed value into this type.
    pub fn coerce(self, raw: &Json) -> Result<Value, CoercionError> {
        let value = match (self, raw) {
            (DataType::String, Json::String(s)) => Some(Value::Text(s.clone())),
            (DataType::Int, Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral))
                .map(Value::Integer),
            (DataType::Bool, Json::Bool(b)) => Some(Value::Boolean(*b)),
            (DataType::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
            (DataType::Timestamp, Json::String(s)) => parse_instant(s).map(Value::Instant),
            (DataType::Timestamp, Json::Number(n)) => n
                .as_i64()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(Value::Instant),
            _ => None,
        };
        value.ok_or_else(|| CoercionError {
            expected: self,
            found: raw.to_string(),
        })
    }

    /// Parse a path argument (or literal filter field) into this type.
    pub fn parse(self, raw: &str) -> Result<Value, CoercionError> {
        let value = match self {
            DataType::String => Some(Value::Text(raw.to_string())),
            DataType::Int => raw.parse().ok().map(Value::Integer),
            DataType::Bool => raw.parse().ok().map(Value::Boolean),
            DataType::Float => raw.parse().ok().map(Value::Float),
            DataType::Timestamp => parse_instant(raw)
                .or_else(|| {
                    raw.parse::<i64>()
                        .ok()
                        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                })
                .map(Value::Instant),
        };
        value.ok_or_else(|| CoercionError {
            expected: self,
            found: raw.to_string(),
        })
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "int" => Ok(DataType::Int),
            "bool" => Ok(DataType::Bool),
            "float" => Ok(DataType::Float),
            "timestamp" => Ok(DataType::Timestamp),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "string",
            DataType::Int => "int",
            DataType::Bool => "bool",
            DataType::Float => "float",
            DataType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A value that could not be represented as the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub expected: DataType,
    pub found: String,
}

/// A stored field value.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Float(f64),
    Instant(DateTime<Utc>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Text(_) => 0,
            Value::Integer(_) => 1,
            Value::Boolean(_) => 2,
            Value::Float(_) => 3,
            Value::Instant(_) => 4,
        }
    }

    /// Render for the wire. Non-finite floats become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Text(s) => Json::String(s.clone()),
            Value::Integer(i) => Json::from(*i),
            Value::Boolean(b) => Json::Bool(*b),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Instant(t) => Json::String(t.to_rfc3339()),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Instant(a), Value::Instant(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Float(x) => write!(f, "{}", x),
            Value::Instant(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    // JSON decoders hand integers over as floats; only whole numbers qualify.
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names_are_case_insensitive() {
        assert_eq!("INT".parse::<DataType>(), Ok(DataType::Int));
        assert_eq!("Timestamp".parse::<DataType>(), Ok(DataType::Timestamp));
        assert!("decimal".parse::<DataType>().is_err());
    }

    #[test]
    fn test_int_accepts_integral_floats() {
        assert_eq!(DataType::Int.coerce(&json!(30)).unwrap(), Value::Integer(30));
        assert_eq!(DataType::Int.coerce(&json!(30.0)).unwrap(), Value::Integer(30));
        assert!(DataType::Int.coerce(&json!(30.5)).is_err());
        assert!(DataType::Int.coerce(&json!("30")).is_err());

        assert!(DataType::Int.coerce(&json!(9223372036854775808.0)).is_err());
        assert!(DataType::Int.coerce(&json!(9223372036854775808u64)).is_err());
        assert_eq!(
            DataType::Int.coerce(&json!(-9223372036854775808.0)).unwrap(),
            Value::Integer(i64::MIN)
        );
    }

    #[test]
    fn test_float_and_timestamp_coercion() {
        assert_eq!(DataType::Float.coerce(&json!(2)).unwrap(), Value::Float(2.0));

        let from_str = DataType::Timestamp.coerce(&json!("1970-01-01T00:01:00Z")).unwrap();
        let from_secs = DataType::Timestamp.coerce(&json!(60)).unwrap();
        assert_eq!(from_str, from_secs);
        assert!(DataType::Timestamp.coerce(&json!(true)).is_err());
    }

    #[test]
    fn test_bool_rejects_other_shapes() {
        assert_eq!(DataType::Bool.coerce(&json!(true)).unwrap(), Value::Boolean(true));
        let err = DataType::Bool.coerce(&json!(1)).unwrap_err();
        assert_eq!(err.expected, DataType::Bool);
        assert_eq!(err.found, "1");
    }

    #[test]
    fn test_parse_path_arguments() {
        assert_eq!(DataType::Int.parse("42").unwrap(), Value::Integer(42));
        assert_eq!(DataType::String.parse("42").unwrap(), Value::Text("42".into()));
        assert!(DataType::Int.parse("forty-two").is_err());
        assert_eq!(DataType::Bool.parse("false").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn test_ordering_within_a_type() {
        assert!(Value::Integer(-1) < Value::Integer(3));
        assert!(Value::Float(f64::NEG_INFINITY) < Value::Float(0.5));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Integer(7).to_json(), json!(7));
        assert_eq!(Value::Float(f64::NAN).to_json(), Json::Null);
        assert_eq!(DataType::Timestamp.zero().to_json(), json!("1970-01-01T00:00:00+00:00"));
    }
}
