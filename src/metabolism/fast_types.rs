use serde::Serialize;

/// A fasting protocol the user can pick before starting a fast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FastType {
    pub id: String,
    pub name: String,
    pub hours: f64,
    pub is_custom: bool,
}

pub const COMMON_FAST_TYPES: [(&str, &str, f64); 10] = [
    ("16-8", "16:8 Intermittent", 16.0),
    ("18-6", "18:6 Intermittent", 18.0),
    ("20-4", "20:4 Intermittent", 20.0),
    ("24h", "24 Hours", 24.0),
    ("36h", "36 Hours", 36.0),
    ("48h", "48 Hours", 48.0),
    ("72h", "72 Hours", 72.0),
    ("96h", "96 Hours", 96.0),
    ("120h", "120 Hours (5 Days)", 120.0),
    ("168h", "168 Hours (7 Days)", 168.0),
];

pub fn find_fast_type(id: &str) -> Option<FastType> {
    COMMON_FAST_TYPES
        .iter()
        .find(|(preset_id, _, _)| *preset_id == id)
        .map(|(id, name, hours)| FastType {
            id: (*id).to_string(),
            name: (*name).to_string(),
            hours: *hours,
            is_custom: false,
        })
}

pub fn custom_fast_type(hours: f64) -> FastType {
    FastType {
        id: format!("custom-{hours}h"),
        name: format!("{hours} Hours (Custom)"),
        hours,
        is_custom: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_presets_by_id() {
        let preset = find_fast_type("16-8").unwrap();
        assert_eq!(preset.hours, 16.0);
        assert!(!preset.is_custom);
        assert!(find_fast_type("17-7").is_none());
    }

    #[test]
    fn custom_types_are_named_after_hours() {
        let custom = custom_fast_type(30.0);
        assert_eq!(custom.id, "custom-30h");
        assert!(custom.is_custom);
    }
}
