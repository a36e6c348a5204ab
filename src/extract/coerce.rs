//! Conversion of extracted strings into field types

use std::any::type_name;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::FieldErrorKind;

/// Convert one extracted string via `FromStr`.
///
/// `String` and newtypes around it always succeed; numeric and other
/// parsed types report the offending value instead of defaulting.
pub fn coerce<T>(raw: &str) -> Result<T, FieldErrorKind>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>().map_err(|e| FieldErrorKind::Coercion {
        value: raw.to_string(),
        target: type_name::<T>(),
        reason: e.to_string(),
    })
}

/// Convert every value, keeping order; the first failure aborts.
pub fn coerce_all<T>(raw: &[String]) -> Result<Vec<T>, FieldErrorKind>
where
    T: FromStr,
    T::Err: Display,
{
    raw.iter().map(|v| coerce::<T>(v)).collect()
}
