use std::{
    cmp::Ordering,
    fmt::{self, Display},
    sync::Arc,
};

use derive_more::IsVariant;
use num_traits::ToPrimitive;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Metadata mapping carried by facts and AST nodes.
pub type Info = im::OrdMap<String, Val>;

/// A field value inside a [`crate::term::Term`].
#[derive(Clone, Debug, Eq, Hash, IsVariant, PartialEq, Serialize, Deserialize)]
pub enum Val {
    Null,
    Bool(bool),
    S32(i32),
    S64(i64),
    F64(OrderedFloat<f64>),
    String(Arc<str>),
    List(Vec<Val>),
}

impl Val {
    pub fn f64(value: f64) -> Self {
        Self::F64(OrderedFloat(value))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Val::S32(_) | Val::S64(_) | Val::F64(_))
    }

    /// Numeric value as a double. Values beyond 2^53 lose precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Val::S32(v) => v.to_f64(),
            Val::S64(v) => v.to_f64(),
            Val::F64(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Val]> {
        match self {
            Val::List(v) => Some(v),
            _ => None,
        }
    }

    /// Compares `self` (a number) to `other` as doubles.
    ///
    /// A null or non-numeric `other` compares as equal, and so does a
    /// non-numeric `self`.
    pub fn num_cmp(&self, other: &Val) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        }
    }

    /// Ordering between values of the same kind, `None` when incomparable.
    pub fn natural_cmp(&self, other: &Val) -> Option<Ordering> {
        match (self, other) {
            (Val::Bool(x), Val::Bool(y)) => Some(x.cmp(y)),
            (Val::String(x), Val::String(y)) => Some(x.cmp(y)),
            (Val::List(x), Val::List(y)) => {
                for (a, b) in x.iter().zip(y.iter()) {
                    match a.compare(b)? {
                        Ordering::Equal => continue,
                        ordering => return Some(ordering),
                    }
                }

                Some(x.len().cmp(&y.len()))
            }
            (x, y) if x.is_number() && y.is_number() => Some(x.num_cmp(y)),
            _ => None,
        }
    }

    /// Numeric-aware comparison used by comparators, aggregates and sorting.
    ///
    /// Numbers compare as doubles whatever their width. Null, and a number
    /// against a non-number, are incomparable.
    pub fn compare(&self, other: &Val) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }

        self.natural_cmp(other)
    }

    /// The key under which this value is stored in a field index.
    pub fn index_key(&self) -> Val {
        match self.as_f64() {
            Some(v) => Val::f64(v),
            None => self.clone(),
        }
    }

    /// Plain string form, used to compute group and join keys.
    pub fn key_string(&self) -> String {
        match self {
            Val::Null => "null".to_owned(),
            Val::String(v) => v.to_string(),
            Val::List(vs) => {
                let items = vs
                    .iter()
                    .map(|v| v.key_string())
                    .collect::<Vec<String>>()
                    .join(", ");

                format!("[{items}]")
            }
            v => v.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::S32(_) => "s32",
            Val::S64(_) => "s64",
            Val::F64(_) => "f64",
            Val::String(_) => "string",
            Val::List(_) => "list",
        }
    }
}

impl Default for Val {
    fn default() -> Self {
        Self::Null
    }
}

macro_rules! val_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Val {
                fn from(value: $t) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

val_from! {
    bool => Bool,
    i32 => S32,
    i64 => S64,
    OrderedFloat<f64> => F64,
    &str => String,
    String => String,
    Arc<str> => String,
}

impl From<f64> for Val {
    fn from(value: f64) -> Self {
        Self::f64(value)
    }
}

impl From<usize> for Val {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(v) => Self::S64(v),
            Err(_) => Self::f64(value as f64),
        }
    }
}

impl<T: Into<Val>> From<Vec<T>> for Val {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Val>> From<Option<T>> for Val {
    fn from(value: Option<T>) -> Self {
        value.map_or(Val::Null, Into::into)
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => f.write_str("null"),
            Val::Bool(v) => Display::fmt(v, f),
            Val::S32(v) => Display::fmt(v, f),
            Val::S64(v) => Display::fmt(v, f),
            Val::F64(v) => f.write_fmt(format_args!("{:?}", v.0)),
            Val::String(v) => f.write_fmt(format_args!("{v:?}")),
            Val::List(vs) => {
                let items = vs
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");

                write!(f, "[{items}]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_numbers_compare_as_doubles() {
        assert_eq!(Val::S32(10).num_cmp(&Val::S64(10)), Ordering::Equal);
        assert_eq!(Val::S64(10).num_cmp(&Val::f64(10.5)), Ordering::Less);
        assert_eq!(Val::f64(11.0).num_cmp(&Val::S32(10)), Ordering::Greater);
    }

    #[test]
    fn test_non_numeric_right_side_compares_equal() {
        assert_eq!(Val::S32(10).num_cmp(&Val::Null), Ordering::Equal);
        assert_eq!(Val::S32(10).num_cmp(&Val::from("ten")), Ordering::Equal);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(
            Val::from("Bart").natural_cmp(&Val::from("Homer")),
            Some(Ordering::Less)
        );
        assert_eq!(Val::from("Bart").natural_cmp(&Val::S32(1)), None);
        assert_eq!(Val::Null.compare(&Val::Null), None);
        assert_eq!(Val::S32(1).compare(&Val::from("1")), None);
        assert_eq!(Val::S32(1).compare(&Val::f64(1.0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_index_key_normalizes_numbers() {
        assert_eq!(Val::S32(10).index_key(), Val::f64(10.0));
        assert_eq!(Val::S64(10).index_key(), Val::f64(10.0));
        assert_eq!(Val::f64(10.0).index_key(), Val::f64(10.0));
        assert_eq!(Val::from("10").index_key(), Val::from("10"));
    }

    #[test]
    fn test_key_string() {
        assert_eq!(Val::from("Homer").key_string(), "Homer");
        assert_eq!(Val::Null.key_string(), "null");
        assert_eq!(Val::S32(1).key_string(), "1");
        assert_eq!(Val::f64(2.0).to_string(), "2.0");
    }
}
