//! Decoding of runtime values into Rust types.

use crate::error::Error;
use criteria_proto::{Record, Value};

/// A Rust type that can be read out of a single [`Value`].
pub trait FromValue: Sized {
    /// Convert a value; `None` when the value has the wrong shape.
    fn from_value(value: &Value) -> Option<Self>;

    /// Name of the expected value type, for error messages.
    fn expected() -> &'static str;
}

/// Decode a value, naming `field` in the error.
pub fn decode<T: FromValue>(value: &Value, field: &str) -> Result<T, Error> {
    T::from_value(value).ok_or_else(|| Error::Decode {
        field: field.to_string(),
        reason: format!("expected {}, found {}", T::expected(), value.type_name()),
    })
}

/// Read a field of a record. A missing field reads as null.
pub fn get_field<T: FromValue>(record: &Record, name: &str) -> Result<T, Error> {
    let value = record.get(name).unwrap_or(&Value::Null);
    decode(value, &format!("{}.{}", record.entity, name))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }

    fn expected() -> &'static str {
        "any value"
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn expected() -> &'static str {
        T::expected()
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn expected() -> &'static str {
        "bool"
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }

    fn expected() -> &'static str {
        "int32"
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn expected() -> &'static str {
        "int64"
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f32()
    }

    fn expected() -> &'static str {
        "float32"
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn expected() -> &'static str {
        "float64"
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn expected() -> &'static str {
        "string"
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bytes().map(<[u8]>::to_vec)
    }

    fn expected() -> &'static str {
        "bytes"
    }
}

impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_uuid().copied()
    }

    fn expected() -> &'static str {
        "uuid"
    }
}

impl FromValue for Vec<String> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn expected() -> &'static str {
        "string[]"
    }
}

impl FromValue for Vec<i64> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int64Array(v) => Some(v.clone()),
            Value::Int32Array(v) => Some(v.iter().map(|i| *i as i64).collect()),
            _ => None,
        }
    }

    fn expected() -> &'static str {
        "int64[]"
    }
}

impl FromValue for Vec<i32> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int32Array(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn expected() -> &'static str {
        "int32[]"
    }
}

impl FromValue for Vec<bool> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::BoolArray(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn expected() -> &'static str {
        "bool[]"
    }
}

impl FromValue for Vec<f64> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float64Array(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn expected() -> &'static str {
        "float64[]"
    }
}
