use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    #[default]
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// TDEE multiplier applied on top of the basal rate.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

/// `profile.json`. Weight in kg, height in cm, `tmb` in kcal/day.
///
/// `avatar` holds a file reference on disk and may hold an inlined data URI in
/// memory; only [`crate::avatar::AvatarResolver`] converts between the two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub avatar: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub weight: f64,
    #[serde(deserialize_with = "lenient")]
    pub height: f64,
    #[serde(deserialize_with = "lenient")]
    pub tmb: f64,
    #[serde(deserialize_with = "lenient")]
    pub age: f64,
    #[serde(deserialize_with = "lenient")]
    pub gender: Gender,
    #[serde(deserialize_with = "lenient")]
    pub activity_level: ActivityLevel,
}

impl Profile {
    /// The blank profile written by vault initialization.
    pub fn blank() -> Self {
        Self {
            name: Some(String::new()),
            ..Self::default()
        }
    }

    /// A profile is usable for metabolic estimates once the body metrics are set.
    pub fn is_complete(&self) -> bool {
        self.weight > 0.0 && self.height > 0.0 && self.age > 0.0
    }

    /// Rejects values no form should ever produce. Zeroes are allowed: a vault
    /// can hold a profile with only a name while onboarding is unfinished.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("weight", self.weight),
            ("height", self.height),
            ("tmb", self.tmb),
            ("age", self.age),
        ] {
            if !value.is_finite() {
                bail!("profile {field} must be a finite number");
            }
            if value < 0.0 {
                bail!("profile {field} cannot be negative (got {value})");
            }
        }
        Ok(())
    }
}
