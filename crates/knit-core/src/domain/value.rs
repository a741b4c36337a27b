//! Values flowing along links.
//!
//! Constants produce scalar values from literals; blocks usually produce
//! `Value::Object`, a shared handle to a live component.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::typed::component::Instance;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    Uri(Url),
    Decimal(Decimal),
    Vector(Vec<Value>),
    Object(Instance),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Uri(_) => "uri",
            Value::Decimal(_) => "decimal",
            Value::Vector(_) => "vector",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

/// Declared type of a parameter or constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Any,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Str,
    Uri,
    Decimal,
}

impl ValueType {
    /// Resolve a constant's `factory` name.
    pub fn from_literal_name(name: &str) -> Option<Self> {
        let ty = match name {
            "boolean" | "bool" => ValueType::Bool,
            "byte" | "i8" => ValueType::Byte,
            "short" | "i16" => ValueType::Short,
            "int" | "i32" => ValueType::Int,
            "long" | "i64" => ValueType::Long,
            "float" | "f32" => ValueType::Float,
            "double" | "f64" => ValueType::Double,
            "char" => ValueType::Char,
            "string" | "str" => ValueType::Str,
            "uri" | "url" => ValueType::Uri,
            "decimal" => ValueType::Decimal,
            _ => return None,
        };
        Some(ty)
    }

    /// Value an unwired slot of this type receives.
    pub fn zero(self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Byte => Value::Byte(0),
            ValueType::Short => Value::Short(0),
            ValueType::Int => Value::Int(0),
            ValueType::Long => Value::Long(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Double => Value::Double(0.0),
            ValueType::Char => Value::Char('\0'),
            ValueType::Any | ValueType::Str | ValueType::Uri | ValueType::Decimal => Value::Null,
        }
    }

    /// Parse `raw` as a literal of this type.
    pub fn parse_literal(self, raw: &str) -> Result<Value, LiteralError> {
        let fail = |reason: String| LiteralError {
            ty: self,
            raw: raw.to_string(),
            reason,
        };
        let value = match self {
            ValueType::Bool => match raw {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(fail("expected `true` or `false`".into())),
            },
            ValueType::Byte => Value::Byte(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Short => Value::Short(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Int => Value::Int(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Long => Value::Long(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Float => Value::Float(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Double => Value::Double(raw.parse().map_err(|e| fail(format!("{e}")))?),
            ValueType::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(fail("expected exactly one character".into())),
                }
            }
            ValueType::Str => Value::Str(raw.to_string()),
            ValueType::Uri => Value::Uri(Url::parse(raw).map_err(|e| fail(format!("{e}")))?),
            ValueType::Decimal => {
                Value::Decimal(Decimal::from_str(raw).map_err(|e| fail(format!("{e}")))?)
            }
            ValueType::Any => return Err(fail("no literal form".into())),
        };
        Ok(value)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Any => "any",
            ValueType::Bool => "bool",
            ValueType::Byte => "byte",
            ValueType::Short => "short",
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::Char => "char",
            ValueType::Str => "string",
            ValueType::Uri => "uri",
            ValueType::Decimal => "decimal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {raw:?} as {ty}: {reason}")]
pub struct LiteralError {
    pub ty: ValueType,
    pub raw: String,
    pub reason: String,
}

/// A value did not have the shape a factory asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueError {
    pub expected: &'static str,
    pub found: &'static str,
}

/// Typed extraction out of a `Value`.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

macro_rules! from_value_variant {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v.clone()),
                    other => Err(ValueError {
                        expected: $name,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

from_value_variant!(bool, Bool, "bool");
from_value_variant!(i8, Byte, "byte");
from_value_variant!(i16, Short, "short");
from_value_variant!(f32, Float, "float");
from_value_variant!(f64, Double, "double");
from_value_variant!(char, Char, "char");
from_value_variant!(String, Str, "string");
from_value_variant!(Url, Uri, "uri");
from_value_variant!(Decimal, Decimal, "decimal");
from_value_variant!(Vec<Value>, Vector, "vector");
from_value_variant!(Instance, Object, "object");

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Byte(v) => Ok(i32::from(*v)),
            Value::Short(v) => Ok(i32::from(*v)),
            Value::Int(v) => Ok(*v),
            other => Err(ValueError {
                expected: "int",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Byte(v) => Ok(i64::from(*v)),
            Value::Short(v) => Ok(i64::from(*v)),
            Value::Int(v) => Ok(i64::from(*v)),
            Value::Long(v) => Ok(*v),
            other => Err(ValueError {
                expected: "long",
                found: other.kind(),
            }),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", "45", Value::Int(45))]
    #[case("long", "234", Value::Long(234))]
    #[case("i16", "-3", Value::Short(-3))]
    #[case("boolean", "true", Value::Bool(true))]
    #[case("char", "x", Value::Char('x'))]
    #[case("string", " padded ", Value::Str(" padded ".into()))]
    #[case("double", "2.5", Value::Double(2.5))]
    fn literals_parse_by_type_name(#[case] name: &str, #[case] raw: &str, #[case] expected: Value) {
        let ty = ValueType::from_literal_name(name).unwrap();
        assert_eq!(ty.parse_literal(raw).unwrap(), expected);
    }

    #[test]
    fn uri_and_decimal_literals() {
        let uri = ValueType::Uri.parse_literal("http://localhost:80").unwrap();
        assert_eq!(uri, Value::Uri(Url::parse("http://localhost:80").unwrap()));

        let dec = ValueType::Decimal.parse_literal("1.2").unwrap();
        assert_eq!(dec, Value::Decimal(Decimal::from_str("1.2").unwrap()));
    }

    #[rstest]
    #[case(ValueType::Int, "4x")]
    #[case(ValueType::Byte, "300")]
    #[case(ValueType::Bool, "yes")]
    #[case(ValueType::Char, "ab")]
    #[case(ValueType::Uri, "not a uri")]
    fn malformed_literals_keep_raw_text(#[case] ty: ValueType, #[case] raw: &str) {
        let err = ty.parse_literal(raw).unwrap_err();
        assert_eq!(err.raw, raw);
        assert!(err.to_string().contains(raw));
    }

    #[test]
    fn unknown_literal_name() {
        assert_eq!(ValueType::from_literal_name("java.lang.Thread"), None);
    }

    #[test]
    fn zero_values() {
        assert_eq!(ValueType::Int.zero(), Value::Int(0));
        assert_eq!(ValueType::Bool.zero(), Value::Bool(false));
        assert_eq!(ValueType::Any.zero(), Value::Null);
        assert_eq!(ValueType::Decimal.zero(), Value::Null);
    }

    #[test]
    fn from_value_widens_integers_and_handles_null() {
        assert_eq!(i64::from_value(&Value::Int(7)).unwrap(), 7);
        assert_eq!(Option::<i32>::from_value(&Value::Null).unwrap(), None);
        let err = String::from_value(&Value::Int(1)).unwrap_err();
        assert_eq!(err.found, "int");
    }
}
