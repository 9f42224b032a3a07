use crate::params::{AccumulationParams, DecayFunction};

/// Relax `potential` toward the neutral potential over `elapsed_us`.
///
/// Non-positive elapsed time leaves the potential untouched. A value inside
/// `[min_potential, max_potential]` stays inside it, since every variant
/// only moves toward neutral.
pub fn decay(potential: f32, elapsed_us: i64, params: &AccumulationParams) -> f32 {
    if elapsed_us <= 0 {
        return potential;
    }
    let neutral = params.neutral_potential;
    match params.decay_function {
        DecayFunction::None => potential,
        DecayFunction::Linear => {
            let step = (params.decay_param * elapsed_us as f64 / 1e6) as f32;
            if potential > neutral {
                (potential - step).max(neutral)
            } else {
                (potential + step).min(neutral)
            }
        }
        DecayFunction::Exponential => {
            let factor = (-(elapsed_us as f64) / params.decay_param).exp() as f32;
            neutral + (potential - neutral) * factor
        }
        DecayFunction::Step => {
            if elapsed_us as f64 > params.decay_param {
                neutral
            } else {
                potential
            }
        }
    }
}

/// Signed contribution of one event.
pub fn contribution(polarity: bool, params: &AccumulationParams) -> f32 {
    if params.rectify_polarity || polarity {
        params.event_contribution
    } else {
        -params.event_contribution
    }
}

/// Add one event's contribution and clamp to the potential range.
pub fn apply(potential: f32, polarity: bool, params: &AccumulationParams) -> f32 {
    (potential + contribution(polarity, params)).clamp(params.min_potential, params.max_potential)
}
