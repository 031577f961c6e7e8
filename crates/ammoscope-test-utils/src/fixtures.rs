//! Record fixtures.

use ammoscope_common::{fields, AmmoRecord, Document};
use serde_json::{json, Value};

/// Builder for catalog-shaped records.
pub struct RecordBuilder {
    doc: Document,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        let mut doc = Document::new();
        doc.insert(fields::ID.into(), json!(id));
        Self { doc }
    }

    pub fn name(self, name: &str) -> Self {
        self.field(fields::NAME, json!(name))
    }

    pub fn kind(self, ammo_type: &str, caliber: &str) -> Self {
        self.field(fields::AMMO_TYPE, json!(ammo_type))
            .field(fields::CALIBER, json!(caliber))
    }

    /// Single-projectile round with the given damage and penetration power.
    pub fn ballistics(self, damage: f64, penetration_power: f64) -> Self {
        self.field(fields::DAMAGE, json!(damage))
            .field(fields::PROJECTILE_COUNT, json!(1))
            .field(fields::PENETRATION_POWER, json!(penetration_power))
    }

    pub fn final_score(self, score: f64) -> Self {
        self.field(fields::FINAL_SCORE, json!(score))
    }

    pub fn offer(mut self, price: i64, currency: &str, price_rub: f64, source: &str) -> Self {
        let entry = json!({
            "price": price,
            "currency": currency,
            "priceRUB": price_rub,
            "source": source,
        });
        match self.doc.get_mut(fields::BUY_FOR) {
            Some(Value::Array(offers)) => offers.push(entry),
            _ => {
                self.doc.insert(fields::BUY_FOR.into(), json!([entry]));
            }
        }
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.doc.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> AmmoRecord {
        AmmoRecord::from_document(self.doc)
    }
}

/// Record carrying only an id and a precomputed score.
pub fn scored(id: &str, score: f64) -> AmmoRecord {
    RecordBuilder::new(id).final_score(score).build()
}

/// A small catalog resembling the upstream feed, already flattened.
pub fn sample_catalog() -> Vec<AmmoRecord> {
    let raw = json!([
        {
            "id": "54527a984bdc2d4e668b4567",
            "name": "5.56x45mm M855",
            "shortName": "M855",
            "ammoType": "bullet",
            "caliber": "Caliber556x45NATO",
            "damage": 54, "projectileCount": 1, "armorDamage": 37,
            "fragmentationChance": 0.4, "penetrationChance": 0.31,
            "penetrationPower": 31, "penetrationPowerDeviation": 1.2,
            "accuracyModifier": 0.0, "recoilModifier": 0.0,
            "lightBleedModifier": 0.0, "heavyBleedModifier": 0.0,
            "staminaBurnPerDamage": 0.0,
            "buyFor": [
                { "price": 1053, "currency": "RUB", "priceRUB": 1053, "source": "prapor" },
                { "price": 998, "currency": "RUB", "priceRUB": 998, "source": "fleaMarket" }
            ]
        },
        {
            "id": "54527ac44bdc2d36668b4567",
            "name": "5.56x45mm M855A1",
            "shortName": "M855A1",
            "ammoType": "bullet",
            "caliber": "Caliber556x45NATO",
            "damage": 49, "projectileCount": 1, "armorDamage": 52,
            "fragmentationChance": 0.34, "penetrationChance": 0.44,
            "penetrationPower": 44, "penetrationPowerDeviation": 1.0,
            "accuracyModifier": -0.05, "recoilModifier": 0.05,
            "lightBleedModifier": 0.0, "heavyBleedModifier": 0.0,
            "staminaBurnPerDamage": null,
            "buyFor": [
                { "price": 9, "currency": "USD", "priceRUB": 1282, "source": "peacekeeper" }
            ]
        },
        {
            "id": "560d5e524bdc2d25448b4571",
            "name": "12/70 7mm buckshot",
            "shortName": "7mm",
            "ammoType": "buckshot",
            "caliber": "Caliber12g",
            "damage": 39, "projectileCount": 8, "armorDamage": 26,
            "fragmentationChance": 0.0, "penetrationChance": 0.03,
            "penetrationPower": 3, "penetrationPowerDeviation": 0.4,
            "accuracyModifier": 0.0, "recoilModifier": 0.0,
            "lightBleedModifier": 0.0, "heavyBleedModifier": 0.0,
            "staminaBurnPerDamage": 0.0,
            "buyFor": []
        },
        {
            "id": "5e023e53d4353e3302577c4c",
            "name": "12.7x55mm PS12B",
            "shortName": "PS12B",
            "ammoType": "bullet",
            "caliber": "Caliber127x55",
            "damage": 102, "projectileCount": 1, "armorDamage": 57,
            "fragmentationChance": 0.3, "penetrationChance": 0.46,
            "penetrationPower": 46, "penetrationPowerDeviation": 1.5,
            "accuracyModifier": 0.0, "recoilModifier": 0.0,
            "lightBleedModifier": 0.2, "heavyBleedModifier": 0.1,
            "staminaBurnPerDamage": 0.2,
            "buyFor": [
                { "price": 899, "currency": "RUB", "priceRUB": 899, "source": "prapor" }
            ]
        }
    ]);

    match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| AmmoRecord::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    }
}
