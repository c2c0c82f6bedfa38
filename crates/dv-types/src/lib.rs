#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Null,
    Bool,
    Int64,
    Float64,
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKind {
    Null,
    NaN,
}

/// A single cell or constant value. Query payloads deliver cells as JSON,
/// hence the tagged representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    Null(NullKind),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
}

impl Scalar {
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Null(_) => DType::Null,
            Self::Bool(_) => DType::Bool,
            Self::Int64(_) => DType::Int64,
            Self::Float64(_) => DType::Float64,
            Self::Utf8(_) => DType::Utf8,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null(_) => true,
            Self::Float64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Value equality with NaN treated as equal to NaN, so identity keys
    /// built over float constants stay stable across comparisons.
    #[must_use]
    pub fn semantic_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float64(a), Self::Float64(b)) => (a.is_nan() && b.is_nan()) || (a == b),
            (Self::Null(NullKind::NaN), Self::Float64(v))
            | (Self::Float64(v), Self::Null(NullKind::NaN)) => v.is_nan(),
            _ => self == other,
        }
    }

    /// Stable textual form used when hashing a scalar into an identity key.
    #[must_use]
    pub fn key_fragment(&self) -> String {
        match self {
            Self::Null(NullKind::Null) => "null".to_owned(),
            Self::Null(NullKind::NaN) => "nan".to_owned(),
            Self::Bool(v) => format!("b:{v}"),
            Self::Int64(v) => format!("i:{v}"),
            Self::Float64(v) if v.is_nan() => "nan".to_owned(),
            Self::Float64(v) => format!("f:{}", v.to_bits()),
            Self::Utf8(v) => format!("s:{v}"),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(NullKind::Null) => write!(f, "null"),
            Self::Null(NullKind::NaN) => write!(f, "NaN"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Utf8(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Utf8(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{NullKind, Scalar};

    #[test]
    fn semantic_eq_treats_nan_as_equal() {
        let left = Scalar::Float64(f64::NAN);
        let right = Scalar::Null(NullKind::NaN);
        assert!(left.semantic_eq(&right));
        assert!(left.semantic_eq(&Scalar::Float64(f64::NAN)));
    }

    #[test]
    fn key_fragments_distinguish_dtypes() {
        assert_ne!(
            Scalar::Int64(1).key_fragment(),
            Scalar::Utf8("1".to_owned()).key_fragment()
        );
        assert_eq!(Scalar::from("a").key_fragment(), "s:a");
    }

    #[test]
    fn nan_floats_count_as_missing() {
        assert!(Scalar::Float64(f64::NAN).is_missing());
        assert!(!Scalar::Float64(0.0).is_missing());
        assert!(Scalar::Null(NullKind::Null).is_missing());
    }
}
