//! Attribute value types
//!
//! Typed values exchanged with the service and the name/type/values triples
//! (`SaImmAttrValuesT_2`) they travel in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ImmError, ImmResult};

/// Attribute value type (`SaImmValueTypeT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "SA_INT32_T")]
    Int32,
    #[serde(rename = "SA_UINT32_T")]
    Uint32,
    #[serde(rename = "SA_INT64_T")]
    Int64,
    #[serde(rename = "SA_UINT64_T")]
    Uint64,
    #[serde(rename = "SA_TIME_T")]
    Time,
    #[serde(rename = "SA_NAME_T")]
    Name,
    #[serde(rename = "SA_FLOAT_T")]
    Float,
    #[serde(rename = "SA_DOUBLE_T")]
    Double,
    #[serde(rename = "SA_STRING_T")]
    String,
    #[serde(rename = "SA_ANY_T")]
    Any,
}

impl ValueType {
    /// Every value type, ordered by native code.
    pub const ALL: [ValueType; 10] = [
        ValueType::Int32,
        ValueType::Uint32,
        ValueType::Int64,
        ValueType::Uint64,
        ValueType::Time,
        ValueType::Name,
        ValueType::Float,
        ValueType::Double,
        ValueType::String,
        ValueType::Any,
    ];

    /// Name used in IMM XML, e.g. `"SA_INT32_T"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Int32 => "SA_INT32_T",
            ValueType::Uint32 => "SA_UINT32_T",
            ValueType::Int64 => "SA_INT64_T",
            ValueType::Uint64 => "SA_UINT64_T",
            ValueType::Time => "SA_TIME_T",
            ValueType::Name => "SA_NAME_T",
            ValueType::Float => "SA_FLOAT_T",
            ValueType::Double => "SA_DOUBLE_T",
            ValueType::String => "SA_STRING_T",
            ValueType::Any => "SA_ANY_T",
        }
    }

    /// Check whether the type can name an object (valid for RDN attributes).
    #[must_use]
    pub fn is_naming(self) -> bool {
        matches!(self, ValueType::Name | ValueType::String)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ImmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ImmError::InvalidArgument {
                message: format!("unknown value type '{s}'"),
            })
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImmValue {
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    /// Nanoseconds (`SaTimeT`).
    Time(i64),
    Name(String),
    Float(f32),
    Double(f64),
    String(String),
    Any(Vec<u8>),
}

impl ImmValue {
    /// The type this value belongs to.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            ImmValue::Int32(_) => ValueType::Int32,
            ImmValue::Uint32(_) => ValueType::Uint32,
            ImmValue::Int64(_) => ValueType::Int64,
            ImmValue::Uint64(_) => ValueType::Uint64,
            ImmValue::Time(_) => ValueType::Time,
            ImmValue::Name(_) => ValueType::Name,
            ImmValue::Float(_) => ValueType::Float,
            ImmValue::Double(_) => ValueType::Double,
            ImmValue::String(_) => ValueType::String,
            ImmValue::Any(_) => ValueType::Any,
        }
    }

    /// Borrow the text of a name or string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ImmValue::Name(s) | ImmValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Build a value of `value_type` from its text form (as written in XML).
    ///
    /// # Errors
    ///
    /// [`ImmError::TypeMismatch`] when `text` does not parse as that type.
    pub fn parse(value_type: ValueType, text: &str, attribute: &str) -> ImmResult<Self> {
        let mismatch = || ImmError::TypeMismatch {
            attribute: attribute.to_string(),
            expected: value_type.to_string(),
        };
        Ok(match value_type {
            ValueType::Int32 => ImmValue::Int32(text.parse().map_err(|_| mismatch())?),
            ValueType::Uint32 => ImmValue::Uint32(text.parse().map_err(|_| mismatch())?),
            ValueType::Int64 => ImmValue::Int64(text.parse().map_err(|_| mismatch())?),
            ValueType::Uint64 => ImmValue::Uint64(text.parse().map_err(|_| mismatch())?),
            ValueType::Time => ImmValue::Time(text.parse().map_err(|_| mismatch())?),
            ValueType::Float => ImmValue::Float(text.parse().map_err(|_| mismatch())?),
            ValueType::Double => ImmValue::Double(text.parse().map_err(|_| mismatch())?),
            ValueType::Name => ImmValue::Name(text.to_string()),
            ValueType::String => ImmValue::String(text.to_string()),
            ValueType::Any => ImmValue::Any(hex::decode(text).map_err(|_| mismatch())?),
        })
    }
}

impl fmt::Display for ImmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImmValue::Int32(v) => write!(f, "{v}"),
            ImmValue::Uint32(v) => write!(f, "{v}"),
            ImmValue::Int64(v) | ImmValue::Time(v) => write!(f, "{v}"),
            ImmValue::Uint64(v) => write!(f, "{v}"),
            ImmValue::Float(v) => write!(f, "{v}"),
            ImmValue::Double(v) => write!(f, "{v}"),
            ImmValue::Name(s) | ImmValue::String(s) => f.write_str(s),
            ImmValue::Any(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

/// An attribute name with its type and (possibly empty) value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrValues {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default)]
    pub values: Vec<ImmValue>,
}

impl AttrValues {
    /// Create an attribute with the given values.
    pub fn new(name: impl Into<String>, value_type: ValueType, values: Vec<ImmValue>) -> Self {
        Self {
            name: name.into(),
            value_type,
            values,
        }
    }

    /// Create an attribute with no values (clears it on modify).
    pub fn empty(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, value_type, Vec::new())
    }

    /// Create a single-valued string attribute.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ValueType::String, vec![ImmValue::String(value.into())])
    }

    /// Create a single-valued name attribute.
    pub fn name(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ValueType::Name, vec![ImmValue::Name(value.into())])
    }

    /// Check that every value has the declared type.
    ///
    /// # Errors
    ///
    /// [`ImmError::TypeMismatch`] naming the attribute.
    pub fn check_types(&self) -> ImmResult<()> {
        if self.values.iter().all(|v| v.value_type() == self.value_type) {
            Ok(())
        } else {
            Err(ImmError::TypeMismatch {
                attribute: self.name.clone(),
                expected: self.value_type.to_string(),
            })
        }
    }

    /// First value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&ImmValue> {
        self.values.first()
    }

    /// Check whether the attribute has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
