//! Composite effectiveness score.
//!
//! finalScore = penetration × 1.8 + lethal × 0.8 + utility × 0.5 + handling
//!
//! Scoring never fails: a record whose numeric attributes cannot be read
//! scores 0.0 and the problem is logged.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ammoscope_common::{fields, AmmoRecord, FieldTypeError, MinBuyPrice, TradeOffer};

use crate::weights::ScoreWeights;

/// Numeric ballistic attributes of one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallisticProfile {
    pub damage: f64,
    pub projectile_count: f64,
    pub fragmentation_chance: f64,
    pub penetration_power: f64,
    pub penetration_chance: f64,
    pub penetration_power_deviation: f64,
    pub armor_damage: f64,
    pub light_bleed_modifier: f64,
    pub heavy_bleed_modifier: f64,
    pub stamina_burn_per_damage: f64,
    pub accuracy_modifier: f64,
    pub recoil_modifier: f64,
}

impl BallisticProfile {
    /// Missing or null attributes read as zero; a non-numeric value is an error.
    pub fn from_record(record: &AmmoRecord) -> Result<Self, FieldTypeError> {
        Ok(Self {
            damage:                      record.numeric(fields::DAMAGE)?,
            projectile_count:            record.numeric(fields::PROJECTILE_COUNT)?,
            fragmentation_chance:        record.numeric(fields::FRAGMENTATION_CHANCE)?,
            penetration_power:           record.numeric(fields::PENETRATION_POWER)?,
            penetration_chance:          record.numeric(fields::PENETRATION_CHANCE)?,
            penetration_power_deviation: record.numeric(fields::PENETRATION_POWER_DEVIATION)?,
            armor_damage:                record.numeric(fields::ARMOR_DAMAGE)?,
            light_bleed_modifier:        record.numeric(fields::LIGHT_BLEED_MODIFIER)?,
            heavy_bleed_modifier:        record.numeric(fields::HEAVY_BLEED_MODIFIER)?,
            stamina_burn_per_damage:     record.numeric(fields::STAMINA_BURN_PER_DAMAGE)?,
            accuracy_modifier:           record.numeric(fields::ACCURACY_MODIFIER)?,
            recoil_modifier:             record.numeric(fields::RECOIL_MODIFIER)?,
        })
    }
}

/// Intermediate sub-scores, kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub raw_damage: f64,
    pub lethal: f64,
    pub penetration: f64,
    pub utility: f64,
    pub handling: f64,
    pub final_score: f64,
}

pub fn compute_breakdown(p: &BallisticProfile, w: &ScoreWeights) -> ScoreBreakdown {
    let raw_damage = p.damage * p.projectile_count;
    let lethal = raw_damage * (1.0 + p.fragmentation_chance);

    let penetration = p.penetration_power * w.penetration_power
        + p.penetration_chance * w.penetration_chance
        - p.penetration_power_deviation;

    let utility = p.armor_damage * w.armor_damage
        + p.light_bleed_modifier * w.light_bleed
        + p.heavy_bleed_modifier * w.heavy_bleed
        + p.stamina_burn_per_damage * w.stamina_burn;

    let handling = p.accuracy_modifier * w.accuracy - p.recoil_modifier * w.recoil;

    let final_score = penetration * w.blend_penetration
        + lethal * w.blend_lethal
        + utility * w.blend_utility
        + handling * w.blend_handling;

    ScoreBreakdown { raw_damage, lethal, penetration, utility, handling, final_score }
}

/// Cheapest offer by ruble price. Offers without a positive `priceRUB` are
/// ignored; on ties the earlier offer wins.
pub fn cheapest_offer(offers: &[TradeOffer]) -> MinBuyPrice {
    let mut best: Option<(&TradeOffer, f64)> = None;
    for offer in offers {
        let Some(price) = offer.comparable_price() else { continue };
        if best.map_or(true, |(_, current)| price < current) {
            best = Some((offer, price));
        }
    }
    best.map(|(offer, _)| MinBuyPrice::from_offer(offer))
        .unwrap_or(MinBuyPrice::NotAvailable)
}

/// What happened to a record's score.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Computed(f64),
    /// `finalScore` was already present and left as is.
    AlreadyScored,
    /// Scored 0.0 because an attribute had the wrong type or the result was not finite.
    Degraded(String),
}

/// Set `finalScore` (unless present) and always refresh `minBuyPrice`.
pub fn score_record(record: &mut AmmoRecord, weights: &ScoreWeights) -> ScoreOutcome {
    let outcome = if record.has_final_score() {
        ScoreOutcome::AlreadyScored
    } else {
        let outcome = match BallisticProfile::from_record(record) {
            Ok(profile) => {
                let score = compute_breakdown(&profile, weights).final_score;
                if score.is_finite() {
                    ScoreOutcome::Computed(score)
                } else {
                    ScoreOutcome::Degraded(format!("non-finite score {score}"))
                }
            }
            Err(e) => ScoreOutcome::Degraded(e.to_string()),
        };
        match &outcome {
            ScoreOutcome::Computed(score) => record.set_final_score(*score),
            ScoreOutcome::Degraded(reason) => {
                warn!(id = ?record.id(), reason = %reason, "Score degraded to zero");
                record.set_final_score(0.0);
            }
            ScoreOutcome::AlreadyScored => {}
        }
        outcome
    };

    let min_buy = cheapest_offer(&record.buy_offers());
    record.set_min_buy_price(&min_buy);

    outcome
}

/// Counts from one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoringSummary {
    pub computed: usize,
    pub already_scored: usize,
    pub degraded: usize,
    pub without_offer: usize,
}

pub fn score_batch(records: &mut [AmmoRecord], weights: &ScoreWeights) -> ScoringSummary {
    let mut summary = ScoringSummary::default();
    for record in records.iter_mut() {
        match score_record(record, weights) {
            ScoreOutcome::Computed(_)   => summary.computed += 1,
            ScoreOutcome::AlreadyScored => summary.already_scored += 1,
            ScoreOutcome::Degraded(_)   => summary.degraded += 1,
        }
        if !record.min_buy_price().is_some_and(|p| p.is_available()) {
            summary.without_offer += 1;
        }
    }
    debug!(?summary, "Scoring pass complete");
    summary
}
