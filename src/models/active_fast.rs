use serde::{Deserialize, Serialize};

use super::lenient;

/// `active-fast.json`: the only record of a running fast that outlives the
/// process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveFast {
    #[serde(deserialize_with = "lenient")]
    pub is_active: bool,
    #[serde(deserialize_with = "lenient")]
    pub start_time: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub target_hours: Option<f64>,
}

impl ActiveFast {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(start_time: i64, target_hours: f64) -> Self {
        Self {
            is_active: true,
            start_time: Some(start_time),
            target_hours: Some(target_hours),
        }
    }

    /// `(start_time, target_hours)` when the document describes a running fast.
    /// `isActive` without both values (or with a non-positive target) is Idle.
    pub fn running_parts(&self) -> Option<(i64, f64)> {
        if !self.is_active {
            return None;
        }
        match (self.start_time, self.target_hours) {
            (Some(start), Some(target)) if start > 0 && target.is_finite() && target > 0.0 => {
                Some((start, target))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_payload_serializes_nulls() {
        let value = serde_json::to_value(ActiveFast::idle()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "isActive": false, "startTime": null, "targetHours": null })
        );
    }

    #[test]
    fn incomplete_running_document_is_idle() {
        let doc: ActiveFast =
            serde_json::from_str(r#"{ "isActive": true, "startTime": 1700000000000 }"#).unwrap();
        assert_eq!(doc.running_parts(), None);

        let doc: ActiveFast = serde_json::from_str(
            r#"{ "isActive": true, "startTime": 1700000000000, "targetHours": 16 }"#,
        )
        .unwrap();
        assert_eq!(doc.running_parts(), Some((1_700_000_000_000, 16.0)));
    }
}
