use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::{lenient, lenient_list, lenient_number, lenient_optional_number};
use crate::utils::parse_entry_date;

/// A completed fast. Times are epoch milliseconds, `duration` is seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FastEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub start_time: i64,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub end_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub duration: Option<u64>,
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub weight_loss: Option<f64>,
}

/// A journal entry. `photo_path` is relative to the vault root (`photos/...`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub date: String,
    #[serde(
        default,
        deserialize_with = "lenient_optional_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for a new journal entry; the photo arrives as an inlined image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProgressEntry {
    pub date: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub photo_base64: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A journal entry as handed to the display layer, photo resolved inline.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntryView {
    #[serde(flatten)]
    pub entry: ProgressEntry,
    pub photo_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct History {
    #[serde(deserialize_with = "lenient_list")]
    pub fasts: Vec<FastEntry>,
    #[serde(deserialize_with = "lenient_list")]
    pub progress_entries: Vec<ProgressEntry>,
}

impl History {
    /// Newest first; entries whose date does not parse go last, keeping their
    /// relative order.
    pub fn sort_progress_entries(&mut self) {
        sort_entries_newest_first(&mut self.progress_entries, |entry| entry.date.as_str());
    }

    pub fn sort_fasts(&mut self) {
        self.fasts.sort_by_key(|fast| Reverse(fast.start_time));
    }

    /// Fat lost across every completed fast, in kg.
    pub fn total_weight_loss(&self) -> f64 {
        self.fasts.iter().filter_map(|fast| fast.weight_loss).sum()
    }
}

pub(crate) fn sort_entries_newest_first<T>(entries: &mut [T], date: impl Fn(&T) -> &str) {
    entries.sort_by_key(|entry| Reverse(parse_entry_date(date(entry))));
}
