//! Values bound into statements.
//!
//! Substitution is textual: a [`Value`] is rendered through the active dialect
//! (numbers verbatim, text escaped by the driver and single-quoted) and spliced
//! into the SQL string.

use crate::builder::Select;
use crate::error::{SqlError, SqlResult};
use crate::expr::Expression;

/// A value that can be rendered into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    /// Rendered through [`Expression`]'s own formatting.
    Expr(Expression),
    /// Rendered as a parenthesized sub-select.
    Select(Box<Select>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` for values rendered verbatim (no quoting).
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_) | Self::Float(_))
    }

    /// Convert a scalar JSON value.
    ///
    /// Arrays and objects have no SQL literal form and are rejected.
    pub fn from_json(value: &serde_json::Value) -> SqlResult<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self::UInt(u))
                } else {
                    Ok(Self::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(SqlError::builder(format!(
                "cannot bind a nested JSON value: {other}"
            ))),
        }
    }
}

macro_rules! value_from_int {
    ($variant:ident: $($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from_int!(Int: i8, i16, i32, i64);
value_from_int!(UInt: u8, u16, u32, u64);

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<Expression> for Value {
    fn from(v: Expression) -> Self {
        Self::Expr(v)
    }
}

impl From<Select> for Value {
    fn from(v: Select) -> Self {
        Self::Select(Box::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// The value argument of `where`/`having`: absent, one scalar, or an ordered list.
///
/// - `()` and `None` mean "no substitution"
/// - a scalar fills the first `?`
/// - `Vec<T>` / `[T; N]` / `&[T]` fill placeholders left to right
pub trait IntoValues {
    fn into_values(self) -> Vec<Value>;
}

impl IntoValues for () {
    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl<T: Into<Value>> IntoValues for Option<T> {
    fn into_values(self) -> Vec<Value> {
        self.map(|v| vec![v.into()]).unwrap_or_default()
    }
}

impl<T: Into<Value>> IntoValues for Vec<T> {
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value>, const N: usize> IntoValues for [T; N] {
    fn into_values(self) -> Vec<Value> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Value> + Clone> IntoValues for &[T] {
    fn into_values(self) -> Vec<Value> {
        self.iter().cloned().map(Into::into).collect()
    }
}

macro_rules! scalar_into_values {
    ($($ty:ty),*) => {
        $(
            impl IntoValues for $ty {
                fn into_values(self) -> Vec<Value> {
                    vec![self.into()]
                }
            }
        )*
    };
}

scalar_into_values!(
    i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, bool, &str, String, &String, Expression,
    Select
);

impl IntoValues for Value {
    fn into_values(self) -> Vec<Value> {
        vec![self]
    }
}
