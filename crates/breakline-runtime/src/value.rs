//! Delegate-visible value types and snapshot capture.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Number;
use smol_str::SmolStr;
use thiserror::Error;

/// A local binding as seen by the instrumentor.
///
/// Scalars and plain collections can be captured by value into a snapshot;
/// anything else is carried as an [`OpaqueValue`] and captured as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Keyed collection, iteration order preserved.
    Map(IndexMap<String, Value>),
    /// A value with no safe by-value representation.
    Opaque(OpaqueValue),
}

/// A binding that cannot be serialized by value.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueValue {
    /// Name of the underlying type, for diagnostics.
    pub type_name: SmolStr,
    /// Optional textual rendering. `None` means the value could not be
    /// rendered at all.
    pub repr: Option<String>,
}

/// Why a value failed the serializability probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Non-finite floats have no JSON representation.
    #[error("non-finite float")]
    NonFinite,
    /// Opaque values are never captured by value.
    #[error("opaque value of type '{0}'")]
    Opaque(SmolStr),
}

impl Value {
    /// Wrap an opaque value with a textual rendering.
    #[must_use]
    pub fn opaque(type_name: impl Into<SmolStr>, repr: impl Into<String>) -> Self {
        Self::Opaque(OpaqueValue {
            type_name: type_name.into(),
            repr: Some(repr.into()),
        })
    }

    /// Wrap an opaque value that cannot be rendered.
    #[must_use]
    pub fn unrenderable(type_name: impl Into<SmolStr>) -> Self {
        Self::Opaque(OpaqueValue {
            type_name: type_name.into(),
            repr: None,
        })
    }

    /// Serializability probe: convert to JSON by value.
    ///
    /// Fails on non-finite floats and on opaque values; collections fail if
    /// any element fails.
    pub fn to_json(&self) -> Result<serde_json::Value, CaptureError> {
        match self {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(value) => Ok(serde_json::Value::Bool(*value)),
            Value::Int(value) => Ok(serde_json::Value::Number(Number::from(*value))),
            Value::Float(value) => Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .ok_or(CaptureError::NonFinite),
            Value::Str(value) => Ok(serde_json::Value::String(value.clone())),
            Value::List(elements) => elements
                .iter()
                .map(Value::to_json)
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
            Value::Map(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), value.to_json()?)))
                .collect::<Result<serde_json::Map<_, _>, _>>()
                .map(serde_json::Value::Object),
            Value::Opaque(opaque) => Err(CaptureError::Opaque(opaque.type_name.clone())),
        }
    }

    /// Capture this binding for a snapshot. Never fails: values that do not
    /// pass the probe are captured as their textual rendering.
    #[must_use]
    pub fn capture(&self) -> serde_json::Value {
        match self.to_json() {
            Ok(value) => value,
            Err(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::List(elements) => {
                write!(f, "[")?;
                for (idx, element) in elements.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Opaque(opaque) => match &opaque.repr {
                Some(repr) => write!(f, "{repr}"),
                None => write!(f, "<unrepresentable>"),
            },
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Capture a set of bindings into snapshot form, preserving order.
#[must_use]
pub fn capture_bindings(bindings: &IndexMap<SmolStr, Value>) -> IndexMap<String, serde_json::Value> {
    bindings
        .iter()
        .map(|(name, value)| (name.to_string(), value.capture()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_capture_by_value() {
        assert_eq!(Value::Int(7).capture(), json!(7));
        assert_eq!(Value::Bool(true).capture(), json!(true));
        assert_eq!(Value::Str("ok".into()).capture(), json!("ok"));
        assert_eq!(Value::Null.capture(), json!(null));
    }

    #[test]
    fn collections_capture_by_value_when_representable() {
        let value = Value::List(vec![Value::Int(1), Value::Str("two".into())]);
        assert_eq!(value.capture(), json!([1, "two"]));

        let mut entries = IndexMap::new();
        entries.insert("result".to_string(), Value::Int(19));
        assert_eq!(Value::Map(entries).capture(), json!({"result": 19}));
    }

    #[test]
    fn non_finite_floats_fail_the_probe_and_fall_back_to_text() {
        let value = Value::Float(f64::NAN);
        assert_eq!(value.to_json(), Err(CaptureError::NonFinite));
        assert_eq!(value.capture(), json!("NaN"));
    }

    #[test]
    fn opaque_values_capture_as_their_rendering() {
        let value = Value::opaque("Connection", "Connection(host=db)");
        assert_eq!(value.capture(), json!("Connection(host=db)"));
    }

    #[test]
    fn unrenderable_values_capture_as_the_sentinel() {
        let value = Value::unrenderable("RawHandle");
        assert_eq!(value.capture(), json!("<unrepresentable>"));
    }

    #[test]
    fn collection_with_an_opaque_element_falls_back_whole() {
        let value = Value::List(vec![Value::Int(1), Value::unrenderable("Fd")]);
        assert_eq!(value.capture(), json!("[1, <unrepresentable>]"));
    }
}
