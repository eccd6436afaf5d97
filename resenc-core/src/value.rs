//! Typed attribute values.
//!
//! An [`AttributeValue`] is a closed sum over the value kinds a resource can expose:
//! null, integers, doubles, booleans, strings, nested attribute sets, and homogeneous
//! sequences of those up to [`MAX_SEQUENCE_DEPTH`] levels.

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeStore;
use crate::error::{ResencError, ResencResult};

/// Deepest sequence nesting an attribute value may carry.
pub const MAX_SEQUENCE_DEPTH: usize = 3;

/// Element kind of a value, ignoring sequence nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKind {
    Null,
    Int,
    Double,
    Bool,
    String,
    Attributes,
}

impl std::fmt::Display for BaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int => write!(f, "int"),
            Self::Double => write!(f, "double"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
            Self::Attributes => write!(f, "attributes"),
        }
    }
}

/// Full shape of a value: element kind plus sequence depth (0 for scalars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueKind {
    pub base: BaseKind,
    pub depth: usize,
}

impl ValueKind {
    pub const fn scalar(base: BaseKind) -> Self {
        Self { base, depth: 0 }
    }

    pub const fn sequence(base: BaseKind, depth: usize) -> Self {
        Self { base, depth }
    }

    pub fn is_sequence(&self) -> bool {
        self.depth > 0
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        for _ in 0..self.depth {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Homogeneous sequence of `T`, one to three levels deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sequence<T> {
    Flat(Vec<T>),
    Nested(Vec<Vec<T>>),
    Deep(Vec<Vec<Vec<T>>>),
}

impl<T> Sequence<T> {
    pub fn depth(&self) -> usize {
        match self {
            Self::Flat(_) => 1,
            Self::Nested(_) => 2,
            Self::Deep(_) => 3,
        }
    }

    /// Number of elements at the outermost level.
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(v) => v.len(),
            Self::Nested(v) => v.len(),
            Self::Deep(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single attribute value.
///
/// The kind of a value never changes in place; replacing a value with one of another
/// kind is a store-level operation that the acceptance policy may refuse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    #[default]
    Null,
    Int(i64),
    Double(#[serde(with = "double_repr")] f64),
    Bool(bool),
    String(String),
    Attributes(AttributeStore),
    IntSeq(Sequence<i64>),
    DoubleSeq(#[serde(with = "double_repr::seq")] Sequence<f64>),
    BoolSeq(Sequence<bool>),
    StringSeq(Sequence<String>),
    AttributesSeq(Sequence<AttributeStore>),
}

impl AttributeValue {
    /// Shape of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::scalar(BaseKind::Null),
            Self::Int(_) => ValueKind::scalar(BaseKind::Int),
            Self::Double(_) => ValueKind::scalar(BaseKind::Double),
            Self::Bool(_) => ValueKind::scalar(BaseKind::Bool),
            Self::String(_) => ValueKind::scalar(BaseKind::String),
            Self::Attributes(_) => ValueKind::scalar(BaseKind::Attributes),
            Self::IntSeq(s) => ValueKind::sequence(BaseKind::Int, s.depth()),
            Self::DoubleSeq(s) => ValueKind::sequence(BaseKind::Double, s.depth()),
            Self::BoolSeq(s) => ValueKind::sequence(BaseKind::Bool, s.depth()),
            Self::StringSeq(s) => ValueKind::sequence(BaseKind::String, s.depth()),
            Self::AttributesSeq(s) => ValueKind::sequence(BaseKind::Attributes, s.depth()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value holds a `T`.
    pub fn is<T: AttributeType>(&self) -> bool {
        T::extract(self).is_some()
    }

    /// Borrow the value as `T`, failing with `KindMismatch` if it holds another kind.
    pub fn get<T: AttributeType>(&self) -> ResencResult<&T> {
        T::extract(self).ok_or_else(|| ResencError::KindMismatch {
            expected: T::KIND,
            actual: self.kind(),
        })
    }

    /// Mutably borrow the value as `T`.
    pub fn get_mut<T: AttributeType>(&mut self) -> ResencResult<&mut T> {
        let actual = self.kind();
        T::extract_mut(self).ok_or(ResencError::KindMismatch {
            expected: T::KIND,
            actual,
        })
    }

    pub fn as_int(&self) -> ResencResult<i64> {
        self.get::<i64>().copied()
    }

    pub fn as_double(&self) -> ResencResult<f64> {
        self.get::<f64>().copied()
    }

    pub fn as_bool(&self) -> ResencResult<bool> {
        self.get::<bool>().copied()
    }

    pub fn as_str(&self) -> ResencResult<&str> {
        self.get::<String>().map(String::as_str)
    }

    pub fn as_attributes(&self) -> ResencResult<&AttributeStore> {
        self.get::<AttributeStore>()
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::Attributes(_) => write!(f, "Attributes"),
            Self::IntSeq(_)
            | Self::DoubleSeq(_)
            | Self::BoolSeq(_)
            | Self::StringSeq(_)
            | Self::AttributesSeq(_) => write!(f, "Vector"),
        }
    }
}

/// Rust types that map one-to-one onto an [`AttributeValue`] kind.
pub trait AttributeType: Sized {
    const KIND: ValueKind;

    fn extract(value: &AttributeValue) -> Option<&Self>;

    fn extract_mut(value: &mut AttributeValue) -> Option<&mut Self>;

    fn into_value(self) -> AttributeValue;
}

macro_rules! scalar_attribute_type {
    ($ty:ty, $base:ident, $variant:ident) => {
        impl AttributeType for $ty {
            const KIND: ValueKind = ValueKind::scalar(BaseKind::$base);

            fn extract(value: &AttributeValue) -> Option<&Self> {
                match value {
                    AttributeValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn extract_mut(value: &mut AttributeValue) -> Option<&mut Self> {
                match value {
                    AttributeValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> AttributeValue {
                AttributeValue::$variant(self)
            }
        }

        impl From<$ty> for AttributeValue {
            fn from(v: $ty) -> Self {
                v.into_value()
            }
        }
    };
}

macro_rules! sequence_attribute_type {
    (@level $ty:ty, $base:ident, $variant:ident, $shape:ident, $depth:expr) => {
        impl AttributeType for $ty {
            const KIND: ValueKind = ValueKind::sequence(BaseKind::$base, $depth);

            fn extract(value: &AttributeValue) -> Option<&Self> {
                match value {
                    AttributeValue::$variant(Sequence::$shape(v)) => Some(v),
                    _ => None,
                }
            }

            fn extract_mut(value: &mut AttributeValue) -> Option<&mut Self> {
                match value {
                    AttributeValue::$variant(Sequence::$shape(v)) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> AttributeValue {
                AttributeValue::$variant(Sequence::$shape(self))
            }
        }

        impl From<$ty> for AttributeValue {
            fn from(v: $ty) -> Self {
                v.into_value()
            }
        }
    };
    ($ty:ty, $base:ident, $variant:ident) => {
        sequence_attribute_type!(@level Vec<$ty>, $base, $variant, Flat, 1);
        sequence_attribute_type!(@level Vec<Vec<$ty>>, $base, $variant, Nested, 2);
        sequence_attribute_type!(@level Vec<Vec<Vec<$ty>>>, $base, $variant, Deep, 3);
    };
}

scalar_attribute_type!(i64, Int, Int);
scalar_attribute_type!(f64, Double, Double);
scalar_attribute_type!(bool, Bool, Bool);
scalar_attribute_type!(String, String, String);
scalar_attribute_type!(AttributeStore, Attributes, Attributes);

sequence_attribute_type!(i64, Int, IntSeq);
sequence_attribute_type!(f64, Double, DoubleSeq);
sequence_attribute_type!(bool, Bool, BoolSeq);
sequence_attribute_type!(String, String, StringSeq);
sequence_attribute_type!(AttributeStore, Attributes, AttributesSeq);

/// JSON has no NaN or infinity, so those travel as the strings `"NaN"`, `"inf"` and `"-inf"`.
mod double_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Sequence;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum WireDouble {
        Number(f64),
        Special(String),
    }

    impl WireDouble {
        fn encode(value: f64) -> Self {
            if value.is_finite() {
                Self::Number(value)
            } else if value.is_nan() {
                Self::Special("NaN".to_string())
            } else if value > 0.0 {
                Self::Special("inf".to_string())
            } else {
                Self::Special("-inf".to_string())
            }
        }

        fn decode<E: Error>(self) -> Result<f64, E> {
            match self {
                Self::Number(value) => Ok(value),
                Self::Special(text) => match text.as_str() {
                    "NaN" => Ok(f64::NAN),
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    other => Err(E::custom(format!("invalid double {:?}", other))),
                },
            }
        }
    }

    fn encode_all(values: &[f64]) -> Vec<WireDouble> {
        values.iter().copied().map(WireDouble::encode).collect()
    }

    fn decode_all<E: Error>(values: Vec<WireDouble>) -> Result<Vec<f64>, E> {
        values.into_iter().map(WireDouble::decode).collect()
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        WireDouble::encode(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        WireDouble::deserialize(deserializer)?.decode()
    }

    pub mod seq {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Sequence<f64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            let wire = match value {
                Sequence::Flat(v) => Sequence::Flat(encode_all(v)),
                Sequence::Nested(v) => {
                    Sequence::Nested(v.iter().map(|row| encode_all(row)).collect())
                }
                Sequence::Deep(v) => Sequence::Deep(
                    v.iter()
                        .map(|plane| plane.iter().map(|row| encode_all(row)).collect())
                        .collect(),
                ),
            };
            wire.serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Sequence<f64>, D::Error> {
            Ok(match Sequence::<WireDouble>::deserialize(deserializer)? {
                Sequence::Flat(v) => Sequence::Flat(decode_all::<D::Error>(v)?),
                Sequence::Nested(v) => Sequence::Nested(
                    v.into_iter()
                        .map(decode_all::<D::Error>)
                        .collect::<Result<_, _>>()?,
                ),
                Sequence::Deep(v) => Sequence::Deep(
                    v.into_iter()
                        .map(|plane| {
                            plane
                                .into_iter()
                                .map(decode_all::<D::Error>)
                                .collect::<Result<Vec<_>, _>>()
                        })
                        .collect::<Result<_, _>>()?,
                ),
            })
        }
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<()> for AttributeValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}
