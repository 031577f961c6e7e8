//! Ranking view of an enriched batch, grouped by ammo type and caliber with
//! the best score first inside each group.

use std::cmp::Ordering;
use std::fmt::Write;

use serde::Serialize;

use ammoscope_common::{AmmoRecord, MinBuyPrice, Tier};

const NAME_WIDTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    pub name: String,
    pub ammo_type: String,
    pub caliber: String,
    pub final_score: Option<f64>,
    pub normalized: Option<f64>,
    pub tier: Option<Tier>,
    #[serde(skip)]
    pub cheapest: Option<MinBuyPrice>,
}

impl RankingRow {
    pub fn from_record(record: &AmmoRecord) -> Self {
        Self {
            name: record.name().unwrap_or_default().to_string(),
            ammo_type: record.ammo_type().unwrap_or_default().to_string(),
            caliber: record.caliber().unwrap_or_default().to_string(),
            final_score: record.final_score(),
            normalized: record.normalized(),
            tier: record.tier(),
            cheapest: record.min_buy_price(),
        }
    }
}

fn by_group_then_score(a: &RankingRow, b: &RankingRow) -> Ordering {
    let score = |row: &RankingRow| row.final_score.unwrap_or(f64::NEG_INFINITY);
    a.ammo_type
        .cmp(&b.ammo_type)
        .then_with(|| a.caliber.cmp(&b.caliber))
        .then_with(|| score(b).total_cmp(&score(a)))
}

/// Rows sorted by ammo type, caliber, then descending score.
pub fn ranking_rows(records: &[AmmoRecord]) -> Vec<RankingRow> {
    let mut rows: Vec<RankingRow> = records.iter().map(RankingRow::from_record).collect();
    rows.sort_by(by_group_then_score);
    rows
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

/// Fixed-width text table. Long names are cut to fit their column.
pub fn render_table(rows: &[RankingRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<NAME_WIDTH$} {:<10} {:<14} {:>8} {:>6} {:<4} CHEAPEST",
        "NAME", "TYPE", "CALIBER", "SCORE", "NORM", "TIER"
    );
    for row in rows {
        let name: String = if row.name.chars().count() > NAME_WIDTH {
            row.name.chars().take(NAME_WIDTH - 2).chain("..".chars()).collect()
        } else {
            row.name.clone()
        };
        let tier = row.tier.map(|t| t.as_str()).unwrap_or("-");
        let cheapest = row
            .cheapest
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<NAME_WIDTH$} {:<10} {:<14} {:>8} {:>6} {:<4} {}",
            name,
            row.ammo_type,
            row.caliber,
            cell(row.final_score),
            cell(row.normalized),
            tier,
            cheapest
        );
    }
    out
}
