use serde::{Deserialize, Serialize};

use super::lenient;

const LBS_PER_KG: f64 = 2.20462;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }

    /// Converts a stored kilogram value into this unit.
    pub fn from_kg(&self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kg => kg,
            WeightUnit::Lbs => kg * LBS_PER_KG,
        }
    }

    /// Converts a value typed in this unit back to kilograms for storage.
    pub fn to_kg(&self, value: f64) -> f64 {
        match self {
            WeightUnit::Kg => value,
            WeightUnit::Lbs => value / LBS_PER_KG,
        }
    }

    pub fn format(&self, kg: f64) -> String {
        format!("{:.1}", self.from_kg(kg))
    }
}

/// Hour-of-day window (`start <= hour < end`) where cravings usually hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DangerZone {
    pub start: u32,
    pub end: u32,
}

impl DangerZone {
    pub fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

fn default_danger_zones() -> Vec<DangerZone> {
    vec![DangerZone { start: 18, end: 20 }]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    #[serde(deserialize_with = "lenient")]
    pub vault_path: String,
    #[serde(deserialize_with = "lenient")]
    pub theme: Theme,
    pub notifications: bool,
    pub danger_zones: Vec<DangerZone>,
    #[serde(deserialize_with = "lenient")]
    pub weight_unit: WeightUnit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_path: String::new(),
            theme: Theme::Dark,
            notifications: true,
            danger_zones: default_danger_zones(),
            weight_unit: WeightUnit::Kg,
        }
    }
}

impl Config {
    pub fn for_vault(vault_path: impl Into<String>) -> Self {
        Self {
            vault_path: vault_path.into(),
            ..Self::default()
        }
    }

    pub fn in_danger_zone(&self, hour: u32) -> bool {
        self.danger_zones.iter().any(|zone| zone.contains(hour))
    }
}
