//! Fixed weights of the composite effectiveness formula.

use serde::{Deserialize, Serialize};

/// Coefficients for each sub-score and for the final blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    // penetrationScore = power × k − deviation + chance × k
    pub penetration_power: f64,
    pub penetration_chance: f64,

    // utilityScore terms
    pub armor_damage: f64,
    pub light_bleed: f64,
    pub heavy_bleed: f64,
    pub stamina_burn: f64,

    // handlingScore = accuracy × k − recoil × k
    pub accuracy: f64,
    pub recoil: f64,

    /// Blend of sub-scores into `finalScore`.
    pub blend_penetration: f64,
    pub blend_lethal: f64,
    pub blend_utility: f64,
    pub blend_handling: f64,
}

impl ScoreWeights {
    pub const STANDARD: ScoreWeights = ScoreWeights {
        penetration_power:  4.0,
        penetration_chance: 20.0,
        armor_damage:       1.5,
        light_bleed:        50.0,
        heavy_bleed:        75.0,
        stamina_burn:       150.0,
        accuracy:           200.0,
        recoil:             200.0,
        blend_penetration:  1.8,
        blend_lethal:       0.8,
        blend_utility:      0.5,
        blend_handling:     1.0,
    };
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}
