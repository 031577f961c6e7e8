//! Ammunition record model.
//! A record is a flat JSON object as produced by the catalog collaborator,
//! enriched in place with the derived fields below.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::fmt;

use crate::error::{AmmoscopeError, FieldTypeError, Result};
use crate::tier::Tier;

/// Field name → value, as persisted.
pub type Document = Map<String, Value>;

/// Sentinel written into every `minBuyPrice` sub-field when nothing is for sale.
pub const NOT_AVAILABLE: &str = "N/A";

/// Attribute names used by the core.
pub mod fields {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const AMMO_TYPE: &str = "ammoType";
    pub const CALIBER: &str = "caliber";
    pub const BUY_FOR: &str = "buyFor";

    pub const DAMAGE: &str = "damage";
    pub const PROJECTILE_COUNT: &str = "projectileCount";
    pub const FRAGMENTATION_CHANCE: &str = "fragmentationChance";
    pub const PENETRATION_POWER: &str = "penetrationPower";
    pub const PENETRATION_CHANCE: &str = "penetrationChance";
    pub const PENETRATION_POWER_DEVIATION: &str = "penetrationPowerDeviation";
    pub const ARMOR_DAMAGE: &str = "armorDamage";
    pub const LIGHT_BLEED_MODIFIER: &str = "lightBleedModifier";
    pub const HEAVY_BLEED_MODIFIER: &str = "heavyBleedModifier";
    pub const STAMINA_BURN_PER_DAMAGE: &str = "staminaBurnPerDamage";
    pub const ACCURACY_MODIFIER: &str = "accuracyModifier";
    pub const RECOIL_MODIFIER: &str = "recoilModifier";

    // Derived by the core
    pub const FINAL_SCORE: &str = "finalScore";
    pub const MIN_BUY_PRICE: &str = "minBuyPrice";
    pub const NORMALIZED: &str = "normalized";
    pub const TIER: &str = "tier";

    // Owned by the store
    pub const STORE_ID: &str = "_id";
    pub const LAST_UPDATED: &str = "last_updated";

    /// The embedded descriptive object the upstream catalog nests under each record.
    pub const NESTED_ITEM: &str = "item";
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One ammunition variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmmoRecord {
    doc: Document,
}

impl AmmoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    /// Accepts only JSON objects.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(doc) => Ok(Self { doc }),
            other => Err(AmmoscopeError::Catalog(format!(
                "expected a record object, found {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.doc.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.doc.contains_key(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.doc.insert(field.to_string(), value.into());
    }

    /// Natural key. Empty strings and non-string ids count as missing.
    pub fn id(&self) -> Option<&str> {
        self.str_field(fields::ID).filter(|s| !s.is_empty())
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field(fields::NAME)
    }

    pub fn ammo_type(&self) -> Option<&str> {
        self.str_field(fields::AMMO_TYPE)
    }

    pub fn caliber(&self) -> Option<&str> {
        self.str_field(fields::CALIBER)
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.doc.get(field).and_then(Value::as_str)
    }

    /// Numeric attribute; missing and `null` read as zero.
    pub fn numeric(&self, field: &str) -> std::result::Result<f64, FieldTypeError> {
        match self.doc.get(field) {
            None | Some(Value::Null) => Ok(0.0),
            Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(0.0)),
            Some(other) => Err(FieldTypeError {
                field: field.to_string(),
                found: json_type_name(other),
            }),
        }
    }

    pub fn final_score(&self) -> Option<f64> {
        self.doc.get(fields::FINAL_SCORE).and_then(Value::as_f64)
    }

    pub fn has_final_score(&self) -> bool {
        self.contains(fields::FINAL_SCORE)
    }

    pub fn set_final_score(&mut self, score: f64) {
        self.set(fields::FINAL_SCORE, score);
    }

    /// Offers that deserialize cleanly; malformed entries are dropped.
    pub fn buy_offers(&self) -> Vec<TradeOffer> {
        match self.doc.get(fields::BUY_FOR) {
            Some(Value::Array(offers)) => offers
                .iter()
                .filter_map(|o| serde_json::from_value(o.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn min_buy_price(&self) -> Option<MinBuyPrice> {
        self.doc.get(fields::MIN_BUY_PRICE).and_then(MinBuyPrice::from_value)
    }

    pub fn set_min_buy_price(&mut self, price: &MinBuyPrice) {
        self.set(fields::MIN_BUY_PRICE, price.to_value());
    }

    pub fn normalized(&self) -> Option<f64> {
        self.doc.get(fields::NORMALIZED).and_then(Value::as_f64)
    }

    pub fn tier(&self) -> Option<Tier> {
        self.str_field(fields::TIER).and_then(Tier::parse)
    }

    pub fn set_normalization(&mut self, normalized: f64, tier: Tier) {
        self.set(fields::NORMALIZED, normalized);
        self.set(fields::TIER, tier.as_str());
    }
}

impl From<Document> for AmmoRecord {
    fn from(doc: Document) -> Self {
        Self::from_document(doc)
    }
}

/// Lift the fields of the object under `key` into the top level, replacing
/// same-named top-level fields. Returns false if there was nothing to lift.
pub fn flatten_nested(doc: &mut Document, key: &str) -> bool {
    if !matches!(doc.get(key), Some(Value::Object(_))) {
        return false;
    }
    if let Some(Value::Object(nested)) = doc.remove(key) {
        doc.extend(nested);
    }
    true
}

/// JSON type name for diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Trade offers
// ---------------------------------------------------------------------------

/// One `buyFor` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOffer {
    #[serde(default)]
    pub price: Option<Number>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, rename = "priceRUB")]
    pub price_rub: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl TradeOffer {
    /// Ruble price usable for comparison: present, finite and positive.
    pub fn comparable_price(&self) -> Option<f64> {
        self.price_rub.filter(|p| p.is_finite() && *p > 0.0)
    }
}

/// Cheapest offer summary stored as `minBuyPrice`.
#[derive(Debug, Clone, PartialEq)]
pub enum MinBuyPrice {
    Offer {
        price: Option<Number>,
        currency: Option<String>,
        source: Option<String>,
    },
    NotAvailable,
}

impl MinBuyPrice {
    pub fn from_offer(offer: &TradeOffer) -> Self {
        MinBuyPrice::Offer {
            price: offer.price.clone(),
            currency: offer.currency.clone(),
            source: offer.source.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MinBuyPrice::Offer { .. })
    }

    pub fn to_value(&self) -> Value {
        match self {
            MinBuyPrice::Offer { price, currency, source } => json!({
                "price": price,
                "currency": currency,
                "source": source,
            }),
            MinBuyPrice::NotAvailable => json!({
                "price": NOT_AVAILABLE,
                "currency": NOT_AVAILABLE,
                "source": NOT_AVAILABLE,
            }),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("price").and_then(Value::as_str) == Some(NOT_AVAILABLE) {
            return Some(MinBuyPrice::NotAvailable);
        }
        Some(MinBuyPrice::Offer {
            price: match obj.get("price") {
                Some(Value::Number(n)) => Some(n.clone()),
                _ => None,
            },
            currency: obj.get("currency").and_then(Value::as_str).map(str::to_string),
            source: obj.get("source").and_then(Value::as_str).map(str::to_string),
        })
    }
}

impl fmt::Display for MinBuyPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinBuyPrice::Offer { price, currency, source } => {
                let price = price.as_ref().map(|p| p.to_string());
                write!(
                    f,
                    "{} {} ({})",
                    price.as_deref().unwrap_or("?"),
                    currency.as_deref().unwrap_or("?"),
                    source.as_deref().unwrap_or("?"),
                )
            }
            MinBuyPrice::NotAvailable => {
                write!(f, "{NOT_AVAILABLE} {NOT_AVAILABLE} ({NOT_AVAILABLE})")
            }
        }
    }
}
