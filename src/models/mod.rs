//! Schema types for the documents stored in a vault.
//!
//! Fields decode through the `lenient*` helpers below or `#[serde(default)]`,
//! so a document with missing or garbled fields still decodes. History lists
//! are decoded item by item; an item that is not even an object is dropped.
//! Only unparseable JSON is reported as malformed.

mod active_fast;
mod config;
mod history;
mod profile;

pub use active_fast::ActiveFast;
pub use config::{Config, DangerZone, Theme, WeightUnit};
pub use history::{FastEntry, History, NewProgressEntry, ProgressEntry, ProgressEntryView};
pub(crate) use history::sort_entries_newest_first;
pub use profile::{ActivityLevel, Gender, Profile};

use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// Decodes a field, falling back to its default when the stored value has the
/// wrong shape (`"theme": 42`, `"gender": "robot"`, ...).
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Like [`lenient`], but also accepts numbers written as strings
/// (`"startTime": "1700000000000"`).
pub(crate) fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default + FromStr,
{
    Ok(number_from(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub(crate) fn lenient_optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + FromStr,
{
    Ok(number_from(Value::deserialize(deserializer)?))
}

fn number_from<T: DeserializeOwned + FromStr>(value: Value) -> Option<T> {
    match value {
        Value::Null => None,
        Value::String(text) => text.trim().parse().ok(),
        other => T::deserialize(other).ok(),
    }
}

/// Decodes a list one item at a time, dropping items that do not decode.
/// Anything other than an array reads as empty.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                log::warn!("Dropping undecodable list item: {err}");
                None
            }
        })
        .collect())
}
