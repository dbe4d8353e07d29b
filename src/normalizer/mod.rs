//! Price series normalizer: string-typed KAMIS records in, comparison rows out.
//!
//! Nothing here fails on data. Missing or unparseable prices become `None` and
//! flow through to the rows, where the renderer shows them as "—".

pub mod format;

use crate::models::{ComparisonRow, ComparisonTable, PeriodSet, PriceRecord, PriceSeries, PriceSlot};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse a comma-grouped currency string.
/// "1,234" → 1234 | "2,150.5" → 2150.5 | "" / "-" / "abc" → None
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Percentage change from `previous` to `current`, unrounded.
pub fn compute_percent_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

// ── Display adjustment ────────────────────────────────────────────────────────

/// Thresholds of the tiered display-price rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AdjustmentTiers {
    /// Below this, the raw value is added to the baseline price.
    pub lower_threshold: f64,
    /// Below this (and at or above `lower_threshold`), it is added to `upper_base`.
    pub upper_threshold: f64,
    pub upper_base: f64,
}

impl Default for AdjustmentTiers {
    fn default() -> Self {
        Self {
            lower_threshold: 3000.0,
            upper_threshold: 40000.0,
            upper_base: 20000.0,
        }
    }
}

impl AdjustmentTiers {
    pub fn apply(&self, baseline_price: f64, raw_adjustment: f64) -> f64 {
        if raw_adjustment < self.lower_threshold {
            baseline_price + raw_adjustment
        } else if raw_adjustment < self.upper_threshold {
            self.upper_base + raw_adjustment
        } else {
            raw_adjustment
        }
    }
}

/// How a parsed slot price becomes the price shown to the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayRule {
    /// Show the parsed upstream price as is.
    Raw,
    Tiered(AdjustmentTiers),
}

impl Default for DisplayRule {
    fn default() -> Self {
        DisplayRule::Tiered(AdjustmentTiers::default())
    }
}

/// Tiered display price with the stock thresholds (3000 / 40000, base 20000).
/// Total: NaN and negatives take the same branches as any other value.
pub fn adjust_display_price(baseline_price: f64, raw_adjustment: f64) -> f64 {
    AdjustmentTiers::default().apply(baseline_price, raw_adjustment)
}

// ── Record → series → table ───────────────────────────────────────────────────

pub fn series_from_record(record: &PriceRecord) -> PriceSeries {
    let mut prices = [None; 7];
    for slot in PriceSlot::ALL {
        let raw = record.price(slot);
        prices[slot.index()] = parse_currency(raw);
        if prices[slot.index()].is_none() && !is_blank_marker(raw) {
            debug!("{}: unparseable {} value {:?}", record.item_name, slot, raw);
        }
    }

    PriceSeries {
        item_name: record.item_name.trim().to_string(),
        kind_name: record.kind_name.trim().to_string(),
        unit: record.unit.trim().to_string(),
        prices,
    }
}

fn is_blank_marker(s: &str) -> bool {
    matches!(s.trim(), "" | "-" | "—")
}

/// Rows for `periods` in order, with each change taken against the previous row's raw price.
pub fn table_from_series(series: &PriceSeries, periods: &PeriodSet, rule: &DisplayRule) -> ComparisonTable {
    let baseline = series.baseline();
    let mut rows = Vec::with_capacity(periods.len());
    let mut previous_raw: Option<Option<f64>> = None;

    for period in periods.iter() {
        let raw_price = series.price(period.slot);

        let display_price = raw_price.and_then(|raw| {
            let shown = match rule {
                DisplayRule::Raw => raw,
                DisplayRule::Tiered(tiers) => tiers.apply(baseline.unwrap_or(f64::NAN), raw),
            };
            shown.is_finite().then_some(shown)
        });

        let percent_change = previous_raw.and_then(|prev| compute_percent_change(raw_price, prev));

        rows.push(ComparisonRow {
            label: period.label.clone(),
            raw_price,
            display_price,
            percent_change,
        });
        previous_raw = Some(raw_price);
    }

    ComparisonTable {
        item_name: series.item_name.clone(),
        kind_name: series.kind_name.clone(),
        unit: series.unit.clone(),
        rows,
    }
}

/// Normalize a record against `periods` with the default tiered display rule.
pub fn build_comparison_table(record: &PriceRecord, periods: &PeriodSet) -> ComparisonTable {
    build_comparison_table_with(record, periods, &DisplayRule::default())
}

pub fn build_comparison_table_with(
    record: &PriceRecord,
    periods: &PeriodSet,
    rule: &DisplayRule,
) -> ComparisonTable {
    table_from_series(&series_from_record(record), periods, rule)
}

impl ComparisonTable {
    /// Change of the first row against the second, e.g. "current vs previous month".
    pub fn headline_change(&self) -> Option<f64> {
        match self.rows.as_slice() {
            [first, second, ..] => compute_percent_change(first.raw_price, second.raw_price),
            _ => None,
        }
    }
}

/// Find the record for a seasonal item. KAMIS names never carry padding; user input might.
pub fn find_record<'a>(records: &'a [PriceRecord], item_name: &str) -> Option<&'a PriceRecord> {
    let wanted = item_name.trim();
    records.iter().find(|r| r.item_name.trim() == wanted)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Period;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn rice() -> PriceRecord {
        PriceRecord {
            item_name: "쌀".into(),
            kind_name: "20kg(1kg)".into(),
            unit: "1kg".into(),
            dpr1: "1,983".into(),
            dpr2: "1,990".into(),
            dpr5: "6,000".into(),
            dpr6: "-".into(),
            dpr7: "20,000".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("1,234"), Some(1234.0));
        assert_eq!(parse_currency(" 2,150.5 "), Some(2150.5));
        assert_eq!(parse_currency("0"), Some(0.0));
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("-"), None);
        assert_eq!(parse_currency("abc"), None);
        assert_eq!(parse_currency("NaN"), None);
        assert_eq!(parse_currency("inf"), None);
    }

    #[test]
    fn test_compute_percent_change() {
        assert_eq!(compute_percent_change(Some(110.0), Some(100.0)), Some(10.0));
        assert_eq!(compute_percent_change(Some(90.0), Some(100.0)), Some(-10.0));
        assert_eq!(compute_percent_change(Some(100.0), Some(100.0)), Some(0.0));
        assert_eq!(compute_percent_change(Some(5.0), Some(0.0)), None);
        assert_eq!(compute_percent_change(None, Some(100.0)), None);
        assert_eq!(compute_percent_change(Some(100.0), None), None);

        // unrounded
        let third = compute_percent_change(Some(4.0), Some(3.0)).unwrap();
        assert!(close(third, 100.0 / 3.0));
    }

    #[test]
    fn test_adjust_display_price_tiers() {
        assert_eq!(adjust_display_price(10000.0, 2000.0), 12000.0);
        assert_eq!(adjust_display_price(10000.0, 15000.0), 35000.0);
        assert_eq!(adjust_display_price(10000.0, 50000.0), 50000.0);
        // boundaries belong to the upper tier
        assert_eq!(adjust_display_price(10000.0, 3000.0), 23000.0);
        assert_eq!(adjust_display_price(10000.0, 40000.0), 40000.0);
        // no special-casing of negatives or NaN
        assert_eq!(adjust_display_price(10000.0, -500.0), 9500.0);
        assert!(adjust_display_price(10000.0, f64::NAN).is_nan());
    }

    #[test]
    fn test_custom_tiers() {
        let tiers = AdjustmentTiers {
            lower_threshold: 100.0,
            upper_threshold: 200.0,
            upper_base: 1.0,
        };
        assert_eq!(tiers.apply(10.0, 50.0), 60.0);
        assert_eq!(tiers.apply(10.0, 150.0), 151.0);
        assert_eq!(tiers.apply(10.0, 250.0), 250.0);
    }

    #[test]
    fn test_end_to_end_rice_scenario() {
        let table = build_comparison_table(&rice(), &PeriodSet::monthly());
        assert_eq!(table.rows.len(), 4);

        let current = &table.rows[0];
        assert_eq!(current.label, "현재");
        assert_eq!(current.display_price, Some(21983.0));
        assert_eq!(current.percent_change, None);

        let prev_month = &table.rows[1];
        assert_eq!(prev_month.display_price, Some(26000.0));
        assert_eq!(prev_month.raw_price, Some(6000.0));
        let change = prev_month.percent_change.unwrap();
        assert!(close(change, (6000.0 - 1983.0) / 1983.0 * 100.0));

        let headline = table.headline_change().unwrap();
        assert!(close(headline, -66.95));
        assert_eq!(format::format_percent(Some(headline), 2), "-66.95%");
    }

    #[test]
    fn test_unparseable_row_is_kept() {
        let table = build_comparison_table(&rice(), &PeriodSet::monthly());
        let prev_year = &table.rows[2];
        assert_eq!(prev_year.label, "전년");
        assert_eq!(prev_year.raw_price, None);
        assert_eq!(prev_year.display_price, None);
        assert_eq!(prev_year.percent_change, None);

        // the normal-year row follows a gap, so it has no change either
        let normal = &table.rows[3];
        assert_eq!(normal.raw_price, Some(20000.0));
        assert_eq!(normal.display_price, Some(20000.0 + 20000.0));
        assert_eq!(normal.percent_change, None);
    }

    #[test]
    fn test_rows_follow_period_order() {
        let periods = PeriodSet::new(vec![
            Period::new("a", PriceSlot::NormalYear),
            Period::new("b", PriceSlot::Current),
            Period::new("c", PriceSlot::DayAgo),
        ])
        .unwrap();
        let table = build_comparison_table_with(&rice(), &periods, &DisplayRule::Raw);

        let labels: Vec<&str> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0].percent_change, None);
        assert_eq!(table.rows[1].display_price, Some(1983.0));
        assert!(close(
            table.rows[1].percent_change.unwrap(),
            (1983.0 - 20000.0) / 20000.0 * 100.0
        ));
    }

    #[test]
    fn test_row_count_matches_periods() {
        let empty = PriceRecord::default();
        for periods in [
            PeriodSet::new(vec![]).unwrap(),
            PeriodSet::monthly(),
            PeriodSet::full_week(),
        ] {
            let table = build_comparison_table(&empty, &periods);
            assert_eq!(table.rows.len(), periods.len());
            assert!(table.rows.iter().all(|r| r.display_price.is_none()));
            if let Some(first) = table.rows.first() {
                assert_eq!(first.percent_change, None);
            }
        }
    }

    #[test]
    fn test_missing_baseline_hides_low_tier_price() {
        let mut rec = rice();
        rec.dpr7 = String::new();
        let table = build_comparison_table(&rec, &PeriodSet::monthly());
        // 1983 needs the baseline; 6000 does not
        assert_eq!(table.rows[0].display_price, None);
        assert_eq!(table.rows[0].raw_price, Some(1983.0));
        assert_eq!(table.rows[1].display_price, Some(26000.0));
    }

    #[test]
    fn test_zero_change_is_not_missing() {
        let rec = PriceRecord {
            dpr1: "5,000".into(),
            dpr5: "5,000".into(),
            ..Default::default()
        };
        let table = build_comparison_table_with(&rec, &PeriodSet::monthly(), &DisplayRule::Raw);
        assert_eq!(table.rows[1].percent_change, Some(0.0));
        assert_eq!(format::format_percent(table.rows[1].percent_change, 2), "0.00%");
        assert_eq!(format::format_percent(table.rows[0].percent_change, 2), "—");
    }

    #[test]
    fn test_find_record() {
        let records = vec![rice(), PriceRecord { item_name: "감자".into(), ..Default::default() }];
        assert_eq!(find_record(&records, " 감자").map(|r| r.item_name.as_str()), Some("감자"));
        assert!(find_record(&records, "배추").is_none());
    }
}
