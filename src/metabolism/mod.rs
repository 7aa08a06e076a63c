//! Energy-balance estimates shown next to the timer.
//!
//! All functions are pure; `tmb` is the activity-adjusted daily expenditure
//! stored in the profile (kcal/day).

mod fast_types;
mod phases;

pub use fast_types::{custom_fast_type, find_fast_type, FastType, COMMON_FAST_TYPES};
pub use phases::{current_message, current_phase, phase_progress, Milestone, MetabolicPhase};

use crate::models::{ActivityLevel, Gender, Profile};

pub const SECONDS_PER_DAY: f64 = 86_400.0;
/// Energy content of one kilogram of body fat.
pub const KCAL_PER_KG_FAT: f64 = 7_700.0;

/// Mifflin-St Jeor basal metabolic rate.
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age: f64, gender: Gender) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * age;
    match gender {
        Gender::Male => base + 5.0,
        Gender::Female => base - 161.0,
    }
}

pub fn calculate_tdee(bmr: f64, activity_level: ActivityLevel) -> f64 {
    bmr * activity_level.multiplier()
}

/// The `tmb` value written into a profile when the caller left it out.
pub fn calculate_tmb(profile: &Profile) -> f64 {
    let bmr = calculate_bmr(profile.weight, profile.height, profile.age, profile.gender);
    calculate_tdee(bmr, profile.activity_level)
}

fn kcal_for(seconds: f64, tmb: f64) -> f64 {
    if tmb <= 0.0 || seconds <= 0.0 || !tmb.is_finite() {
        return 0.0;
    }
    tmb / SECONDS_PER_DAY * seconds
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Estimated fat lost after `seconds` of fasting, in kg.
pub fn weight_loss_kg(seconds: f64, tmb: f64) -> f64 {
    kcal_for(seconds, tmb) / KCAL_PER_KG_FAT
}

/// Fat burned so far in grams, 4 decimals.
pub fn fat_burned_grams(seconds: f64, tmb: f64) -> f64 {
    round_to(weight_loss_kg(seconds, tmb) * 1000.0, 4)
}

pub fn calories_burned(seconds: f64, tmb: f64) -> f64 {
    kcal_for(seconds, tmb).round()
}

/// Weight loss at the end of a fast of `target_hours`, in kg, 3 decimals.
pub fn projected_weight_loss_kg(target_hours: f64, tmb: f64) -> f64 {
    round_to(weight_loss_kg(target_hours * 3600.0, tmb), 3)
}

pub fn projected_calories(target_hours: f64, tmb: f64) -> f64 {
    calories_burned(target_hours * 3600.0, tmb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmr_follows_mifflin_st_jeor() {
        assert_eq!(calculate_bmr(80.0, 180.0, 30.0, Gender::Male), 1780.0);
        assert_eq!(calculate_bmr(80.0, 180.0, 30.0, Gender::Female), 1614.0);
    }

    #[test]
    fn tmb_applies_activity_multiplier() {
        let profile = Profile {
            weight: 80.0,
            height: 180.0,
            age: 30.0,
            activity_level: ActivityLevel::Sedentary,
            ..Profile::default()
        };
        assert!((calculate_tmb(&profile) - 2136.0).abs() < 1e-9);
    }

    #[test]
    fn weight_loss_is_zero_at_start_and_strictly_increasing() {
        let tmb = 2000.0;
        assert_eq!(weight_loss_kg(0.0, tmb), 0.0);

        let mut previous = 0.0;
        for seconds in [1.0, 60.0, 3600.0, 57_600.0, 86_400.0, 604_800.0] {
            let loss = weight_loss_kg(seconds, tmb);
            assert!(loss > previous);
            previous = loss;
        }
        assert!((weight_loss_kg(86_400.0, 7_700.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_tmb_means_no_estimates() {
        assert_eq!(weight_loss_kg(3600.0, 0.0), 0.0);
        assert_eq!(calories_burned(3600.0, -5.0), 0.0);
        assert_eq!(projected_weight_loss_kg(16.0, 0.0), 0.0);
    }

    #[test]
    fn projections_round() {
        assert_eq!(projected_calories(24.0, 2000.0), 2000.0);
        assert_eq!(projected_weight_loss_kg(24.0, 2000.0), 0.26);
        assert_eq!(fat_burned_grams(86_400.0, 7_700.0), 1000.0);
    }
}
