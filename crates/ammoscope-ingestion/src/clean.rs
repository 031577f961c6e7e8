//! Field clean-up applied before scoring.

use ammoscope_common::{fields, AmmoRecord};

/// Prefix the upstream feed puts on every caliber identifier.
pub const CALIBER_PREFIX: &str = "Caliber";

/// `"Caliber556x45NATO"` becomes `"556x45NATO"`.
pub fn clean_caliber_value(raw: &str) -> String {
    raw.replace(CALIBER_PREFIX, "").trim().to_string()
}

/// Strip the caliber prefix in place. Returns how many records changed.
pub fn clean_calibers(records: &mut [AmmoRecord]) -> usize {
    let mut changed = 0;
    for record in records.iter_mut() {
        let Some(raw) = record.caliber() else { continue };
        let cleaned = clean_caliber_value(raw);
        if cleaned != raw {
            record.set(fields::CALIBER, cleaned);
            changed += 1;
        }
    }
    changed
}
