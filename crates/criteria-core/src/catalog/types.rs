//! Core type definitions for the catalog.

use criteria_proto::Value;
use serde::{Deserialize, Serialize};

/// Scalar data types an attribute can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

/// Field types - flat representation without recursion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// An optional scalar value (nullable).
    OptionalScalar(ScalarType),
    /// An element collection of scalar values.
    ArrayScalar(ScalarType),
    /// An enumeration type, stored as its variant name.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
    /// An optional enumeration.
    OptionalEnum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
}

impl ScalarType {
    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float32 | ScalarType::Float64
        )
    }

    /// Check if values of this type have a total order usable by
    /// `<`, `<=`, `>`, `>=` and ORDER BY.
    pub fn is_orderable(&self) -> bool {
        self.is_numeric() || matches!(self, ScalarType::String | ScalarType::Timestamp)
    }

    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Timestamp => "timestamp",
            ScalarType::Uuid => "uuid",
        }
    }

    /// Check if a non-null value can be stored in or compared with an
    /// attribute of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ScalarType::Bool, Value::Bool(_)) => true,
            (ScalarType::Int32, Value::Int32(_)) => true,
            (ScalarType::Int64, Value::Int32(_) | Value::Int64(_)) => true,
            (ScalarType::Float32, Value::Float32(_) | Value::Int32(_)) => true,
            (
                ScalarType::Float64,
                Value::Float32(_) | Value::Float64(_) | Value::Int32(_) | Value::Int64(_),
            ) => true,
            (ScalarType::String, Value::String(_)) => true,
            (ScalarType::Bytes, Value::Bytes(_)) => true,
            (ScalarType::Timestamp, Value::Timestamp(_) | Value::Int64(_)) => true,
            (ScalarType::Uuid, Value::Uuid(_)) => true,
            _ => false,
        }
    }

    /// Check if two attribute types can be compared with each other.
    pub fn comparable_with(&self, other: &ScalarType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// Check if an array value holds elements of this type.
    pub fn accepts_array(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Bool, Value::BoolArray(_))
                | (ScalarType::Int32, Value::Int32Array(_))
                | (ScalarType::Int64, Value::Int64Array(_) | Value::Int32Array(_))
                | (ScalarType::Float64, Value::Float64Array(_))
                | (ScalarType::String, Value::StringArray(_))
                | (ScalarType::Uuid, Value::UuidArray(_))
        )
    }
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create an optional scalar field type.
    pub fn optional_scalar(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// Create an element-collection field type.
    pub fn array_scalar(scalar: ScalarType) -> Self {
        FieldType::ArrayScalar(scalar)
    }

    /// Create an enum field type.
    pub fn enum_type(name: impl Into<String>, variants: Vec<String>) -> Self {
        FieldType::Enum {
            name: name.into(),
            variants,
        }
    }

    /// Create an optional enum field type.
    pub fn optional_enum(name: impl Into<String>, variants: Vec<String>) -> Self {
        FieldType::OptionalEnum {
            name: name.into(),
            variants,
        }
    }

    /// Nullable form of this type.
    pub fn into_optional(self) -> Self {
        match self {
            FieldType::Scalar(s) => FieldType::OptionalScalar(s),
            FieldType::Enum { name, variants } => FieldType::OptionalEnum { name, variants },
            other => other,
        }
    }

    /// Check if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            FieldType::OptionalScalar(_) | FieldType::OptionalEnum { .. }
        )
    }

    /// Check if this type is an element collection.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::ArrayScalar(_))
    }

    /// Check if LIKE applies to this type.
    pub fn is_text(&self) -> bool {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => *s == ScalarType::String,
            FieldType::Enum { .. } | FieldType::OptionalEnum { .. } => true,
            FieldType::ArrayScalar(_) => false,
        }
    }

    /// Check if ordering comparisons apply to this type.
    pub fn is_orderable(&self) -> bool {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => s.is_orderable(),
            _ => false,
        }
    }

    /// Get the inner scalar type if this is a scalar-based type.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) | FieldType::ArrayScalar(s) => {
                Some(*s)
            }
            _ => None,
        }
    }

    /// Allowed variants if this is an enum type.
    pub fn enum_variants(&self) -> Option<&[String]> {
        match self {
            FieldType::Enum { variants, .. } | FieldType::OptionalEnum { variants, .. } => {
                Some(variants)
            }
            _ => None,
        }
    }

    /// Check if a value fits this type. Null fits only nullable types.
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return self.is_nullable();
        }
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => s.accepts(value),
            FieldType::ArrayScalar(s) => s.accepts_array(value),
            FieldType::Enum { variants, .. } | FieldType::OptionalEnum { variants, .. } => value
                .as_str()
                .map(|v| variants.iter().any(|variant| variant == v))
                .unwrap_or(false),
        }
    }

    /// Check if a single element fits this collection type.
    pub fn accepts_element(&self, value: &Value) -> bool {
        match self {
            FieldType::ArrayScalar(s) => s.accepts(value),
            _ => false,
        }
    }

    /// Check if two attribute types can be compared with each other.
    pub fn comparable_with(&self, other: &FieldType) -> bool {
        match (self.scalar_type(), other.scalar_type()) {
            (Some(a), Some(b)) => !self.is_array() && !other.is_array() && a.comparable_with(&b),
            (None, None) => true,
            (Some(s), None) | (None, Some(s)) => s == ScalarType::String,
        }
    }

    /// Readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldType::Scalar(s) => s.name().to_string(),
            FieldType::OptionalScalar(s) => format!("{}?", s.name()),
            FieldType::ArrayScalar(s) => format!("{}[]", s.name()),
            FieldType::Enum { name, .. } => format!("enum {}", name),
            FieldType::OptionalEnum { name, .. } => format!("enum {}?", name),
        }
    }
}
