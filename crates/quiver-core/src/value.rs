//! Scalar value domain flowing through record slots and entity properties.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A scalar value: the property and projection domain of the engine.
///
/// Entity references (nodes, relationships) are not values; they travel as
/// record entries holding stable integer handles and are resolved against
/// the graph context when needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent / explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 string
    String(String),
}

/// Rank used for cross-domain ordering: null < bool < numeric < string.
fn domain_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
    }
}

fn float_order(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ord) => ord,
        // NaN sorts after every other numeric; two NaNs tie.
        None => match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => Ordering::Equal,
        },
    }
}

impl Value {
    /// Total order over the whole domain, used by ORDER BY comparators.
    ///
    /// Integers and floats compare by numeric value (`Int(3)` ties with
    /// `Float(3.0)`); every other pairing orders by domain rank first.
    pub fn order(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => float_order(*a as f64, *b),
            (Value::Float(a), Value::Int(b)) => float_order(*a, *b as f64),
            (Value::Float(a), Value::Float(b)) => float_order(*a, *b),
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (a, b) => domain_rank(a).cmp(&domain_rank(b)),
        }
    }

    /// Type tag used in reply emission, matching the wire-level names.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::String(_) => "string",
        }
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view for accumulators: integers widen to `f64`.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// True when both values belong to the same ordering domain
    /// (integers and floats share the numeric domain).
    pub fn same_domain(&self, other: &Value) -> bool {
        domain_rank(self) == domain_rank(other)
    }

    /// Append an injective byte image of this value.
    ///
    /// Used for DISTINCT dedup keys and group composite keys: two values
    /// produce the same image iff they are the same tagged value
    /// (`Int(3)` and `Float(3.0)` are distinct images even though they tie
    /// under [`Value::order`]). Strings are length-prefixed so adjacent
    /// values cannot bleed into each other inside a composite key.
    pub fn write_key_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => out.push(0),
            Value::Bool(b) => {
                out.push(1);
                out.push(u8::from(*b));
            }
            Value::Int(i) => {
                out.push(2);
                out.extend_from_slice(&i.to_ne_bytes());
            }
            Value::Float(f) => {
                out.push(3);
                out.extend_from_slice(&f.to_bits().to_ne_bytes());
            }
            Value::String(s) => {
                out.push(4);
                out.extend_from_slice(&(s.len() as u64).to_ne_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Render as a `serde_json::Value` for reply collection.
    ///
    /// A float that JSON cannot represent (NaN, infinities) maps to null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
