/// A stretch of the fast with a distinct metabolic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetabolicPhase {
    pub name: &'static str,
    pub start_hours: f64,
    /// `None` for the open-ended final phase.
    pub end_hours: Option<f64>,
}

pub const METABOLIC_PHASES: [MetabolicPhase; 4] = [
    MetabolicPhase {
        name: "Anabolic",
        start_hours: 0.0,
        end_hours: Some(4.0),
    },
    MetabolicPhase {
        name: "Catabolic",
        start_hours: 4.0,
        end_hours: Some(16.0),
    },
    MetabolicPhase {
        name: "Fat Burning",
        start_hours: 16.0,
        end_hours: Some(24.0),
    },
    MetabolicPhase {
        name: "Ketosis",
        start_hours: 24.0,
        end_hours: None,
    },
];

/// Hours the open-ended phase takes to fill its progress bar.
const OPEN_PHASE_SPAN_HOURS: f64 = 24.0;

pub fn current_phase(hours: f64) -> &'static MetabolicPhase {
    METABOLIC_PHASES
        .iter()
        .find(|phase| {
            hours >= phase.start_hours && phase.end_hours.map_or(true, |end| hours < end)
        })
        .unwrap_or(&METABOLIC_PHASES[METABOLIC_PHASES.len() - 1])
}

/// Fraction of the current phase already elapsed, 0..=1.
pub fn phase_progress(hours: f64) -> f64 {
    let phase = current_phase(hours);
    let span = phase
        .end_hours
        .map_or(OPEN_PHASE_SPAN_HOURS, |end| end - phase.start_hours);
    ((hours - phase.start_hours) / span).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Milestone {
    pub hours: f64,
    pub message: &'static str,
    pub phase: &'static str,
}

const MILESTONES: [Milestone; 13] = [
    Milestone { hours: 0.0, message: "Digestion Phase: Enjoy the energy from your last meal.", phase: "Anabolic" },
    Milestone { hours: 4.0, message: "Insulin Normalizing: Your body is preparing for metabolic transition.", phase: "Catabolic" },
    Milestone { hours: 8.0, message: "Glycogen in Use: Energy reserves being mobilized.", phase: "Catabolic" },
    Milestone { hours: 12.0, message: "Low Insulin: The door to fat burning has opened.", phase: "Catabolic" },
    Milestone { hours: 16.0, message: "Peak Focus: BDNF (Brain Derived Neurotrophic Factor) increasing.", phase: "Fat Burning" },
    Milestone { hours: 18.0, message: "Autophagy Activated: Cellular cleanup in progress.", phase: "Fat Burning" },
    Milestone { hours: 20.0, message: "Intensified Fat Burning: Metabolism optimized.", phase: "Fat Burning" },
    Milestone { hours: 24.0, message: "Ketosis Established: Maximum fat burning efficiency.", phase: "Ketosis" },
    Milestone { hours: 36.0, message: "Deep Autophagy: Cellular regeneration at peak.", phase: "Ketosis" },
    Milestone { hours: 48.0, message: "Elevated Growth Hormone: Accelerated recovery and repair.", phase: "Ketosis" },
    Milestone { hours: 72.0, message: "Advanced Fasting State: Metabolic benefits maximized.", phase: "Ketosis" },
    Milestone { hours: 96.0, message: "Mental Resilience: Clarity and focus at elevated levels.", phase: "Ketosis" },
    Milestone { hours: 120.0, message: "Prolonged Fast: Complete metabolic transformation.", phase: "Ketosis" },
];

/// The highest milestone already reached.
pub fn current_message(hours: f64) -> &'static Milestone {
    MILESTONES
        .iter()
        .rev()
        .find(|milestone| hours >= milestone.hours)
        .unwrap_or(&MILESTONES[0])
}
