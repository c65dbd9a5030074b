use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Treat a missing, `null` or blank string as `None`, otherwise parse it.
///
/// Form posts send `""` for untouched optional inputs (dates, ids, free text).
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}
