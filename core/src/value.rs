//! Raw argument values and the type information the classifier works from.
//!
//! Every field type usable on the command line implements [`ArgType`], which
//! reports a [`TypeInfo`] describing its shape (boolean, scalar, optional
//! scalar, list of scalars) and converts between the Rust type and the
//! untyped [`Value`] produced by the parser adapter.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::ValueError;

/// A raw, already-coerced command-line value.
///
/// This is what the parser adapter stores in a
/// [`Namespace`](crate::Namespace) and what option defaults and choices are
/// recorded as.
///
/// # Examples
///
/// ```
/// use cfgspec_core::{ArgType, Value};
///
/// assert_eq!(42_i64.into_value(), Value::Int(42));
/// assert_eq!(Option::<String>::None.into_value(), Value::Unset);
/// assert_eq!(Value::Str("json".into()).to_string(), "json");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag state.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Filesystem path (taken verbatim from the OS string).
    Path(PathBuf),
    /// One or more values of a list option.
    List(Vec<Value>),
    /// No value was given and the option has no default.
    Unset,
}

impl Value {
    /// Short description of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Path(_) => "path",
            Value::List(_) => "list",
            Value::Unset => "unset",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::Unset => f.write_str("<unset>"),
        }
    }
}

/// Kind of a single token's value.
///
/// Integers carry their bit width so out-of-range input is rejected while
/// tokenizing rather than during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScalarKind {
    /// Any UTF-8 string.
    Str,
    /// A filesystem path.
    Path,
    /// Signed integer of the given bit width.
    Signed(u32),
    /// Unsigned integer of the given bit width.
    Unsigned(u32),
    /// Floating point number.
    Float,
}

impl ScalarKind {
    /// Parses a single token into a [`Value`] of this kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use cfgspec_core::{ScalarKind, Value};
    ///
    /// assert_eq!(ScalarKind::Signed(64).parse("-3"), Ok(Value::Int(-3)));
    /// assert!(ScalarKind::Unsigned(8).parse("256").is_err());
    /// assert!(ScalarKind::Float.parse("abc").is_err());
    /// ```
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            ScalarKind::Str => Ok(Value::Str(raw.to_string())),
            ScalarKind::Path => Ok(Value::Path(PathBuf::from(raw))),
            ScalarKind::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string()),
            ScalarKind::Signed(bits) => {
                let n = raw.parse::<i64>().map_err(|e| e.to_string())?;
                if bits < 64 {
                    let bound = 1_i128 << (bits - 1);
                    let wide = i128::from(n);
                    if wide < -bound || wide >= bound {
                        return Err(format!("{n} is out of range for a {bits}-bit integer"));
                    }
                }
                Ok(Value::Int(n))
            }
            ScalarKind::Unsigned(bits) => {
                let n = raw.parse::<u64>().map_err(|e| e.to_string())?;
                if bits < 64 && n >= (1_u64 << bits) {
                    return Err(format!(
                        "{n} is out of range for a {bits}-bit unsigned integer"
                    ));
                }
                Ok(Value::UInt(n))
            }
        }
    }

    /// Returns `true` if `value` is a value this kind can produce.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarKind::Str, Value::Str(_))
                | (ScalarKind::Path, Value::Path(_))
                | (ScalarKind::Float, Value::Float(_))
                | (ScalarKind::Signed(_), Value::Int(_))
                | (ScalarKind::Unsigned(_), Value::UInt(_))
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Str => f.write_str("string"),
            ScalarKind::Path => f.write_str("path"),
            ScalarKind::Float => f.write_str("float"),
            ScalarKind::Signed(bits) => write!(f, "i{bits}"),
            ScalarKind::Unsigned(bits) => write!(f, "u{bits}"),
        }
    }
}

/// Structural description of a field's raw type.
///
/// # Examples
///
/// ```
/// use cfgspec_core::{ArgType, ScalarKind, TypeInfo};
///
/// assert_eq!(<Vec<String>>::type_info(), TypeInfo::List(Box::new(TypeInfo::Scalar(ScalarKind::Str))));
/// assert_eq!(<Option<u16>>::type_info().to_string(), "Option<u16>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    /// `bool`
    Bool,
    /// A single-token value.
    Scalar(ScalarKind),
    /// `Option<_>`
    Optional(Box<TypeInfo>),
    /// `Vec<_>`
    List(Box<TypeInfo>),
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::Bool => f.write_str("bool"),
            TypeInfo::Scalar(kind) => write!(f, "{kind}"),
            TypeInfo::Optional(inner) => write!(f, "Option<{inner}>"),
            TypeInfo::List(inner) => write!(f, "Vec<{inner}>"),
        }
    }
}

/// A Rust type that can be read from the command line.
pub trait ArgType: Sized + Send + 'static {
    /// Type of one permitted choice: the type itself for scalars, the inner
    /// scalar for `Option<_>` and `Vec<_>`.
    type Element: ArgType;

    /// Describes the type for the classifier.
    fn type_info() -> TypeInfo;

    /// Converts a raw value produced by the parser adapter.
    fn from_value(value: Value) -> Result<Self, ValueError>;

    /// Converts back into a raw value (used for defaults and choices).
    fn into_value(self) -> Value;
}

fn mismatch<T>(value: Value) -> Result<T, ValueError> {
    Err(ValueError {
        expected: std::any::type_name::<T>(),
        found: value,
    })
}

impl ArgType for bool {
    type Element = Self;

    fn type_info() -> TypeInfo {
        TypeInfo::Bool
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ArgType for String {
    type Element = Self;

    fn type_info() -> TypeInfo {
        TypeInfo::Scalar(ScalarKind::Str)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(s) => Ok(s),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl ArgType for PathBuf {
    type Element = Self;

    fn type_info() -> TypeInfo {
        TypeInfo::Scalar(ScalarKind::Path)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Path(p) => Ok(p),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Path(self)
    }
}

macro_rules! signed_arg_type {
    ($($ty:ty),*) => {$(
        impl ArgType for $ty {
            type Element = Self;

            fn type_info() -> TypeInfo {
                TypeInfo::Scalar(ScalarKind::Signed(<$ty>::BITS))
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::Int(n) => <$ty>::try_from(n).or_else(|_| mismatch(Value::Int(n))),
                    other => mismatch(other),
                }
            }

            fn into_value(self) -> Value {
                // Every supported signed width fits in i64.
                Value::Int(self as i64)
            }
        }
    )*};
}

macro_rules! unsigned_arg_type {
    ($($ty:ty),*) => {$(
        impl ArgType for $ty {
            type Element = Self;

            fn type_info() -> TypeInfo {
                TypeInfo::Scalar(ScalarKind::Unsigned(<$ty>::BITS))
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::UInt(n) => <$ty>::try_from(n).or_else(|_| mismatch(Value::UInt(n))),
                    other => mismatch(other),
                }
            }

            fn into_value(self) -> Value {
                Value::UInt(self as u64)
            }
        }
    )*};
}

signed_arg_type!(i8, i16, i32, i64, isize);
unsigned_arg_type!(u8, u16, u32, u64, usize);

impl ArgType for f64 {
    type Element = Self;

    fn type_info() -> TypeInfo {
        TypeInfo::Scalar(ScalarKind::Float)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(x) => Ok(x),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl ArgType for f32 {
    type Element = Self;

    fn type_info() -> TypeInfo {
        TypeInfo::Scalar(ScalarKind::Float)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(x) => Ok(x as f32),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl<T: ArgType> ArgType for Option<T> {
    type Element = T::Element;

    fn type_info() -> TypeInfo {
        TypeInfo::Optional(Box::new(T::type_info()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Unset => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Unset,
        }
    }
}

impl<T: ArgType> ArgType for Vec<T> {
    type Element = T::Element;

    fn type_info() -> TypeInfo {
        TypeInfo::List(Box::new(T::type_info()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => mismatch(other),
        }
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(ArgType::into_value).collect())
    }
}
