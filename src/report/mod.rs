//! Text / CSV / JSON rendering of comparison tables and dashboard reports.

use crate::models::{ComparisonTable, SeasonalFoodRecord};
use crate::normalizer::format::{MISSING, format_percent, format_price, rounds_to_zero};
use crate::pipeline::{DashboardReport, Headline, ItemComparison};
use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

const RULE: &str = "─────────────────────────────────────────";

pub fn render_table(table: &ComparisonTable, decimals: usize) -> String {
    let mut out = String::new();
    let kind = if table.kind_name.is_empty() {
        String::new()
    } else {
        format!(" ({})", table.kind_name)
    };
    out.push_str(&format!("{}\n  {}{} · {}\n{}\n", RULE, table.item_name, kind, table.unit, RULE));

    for row in &table.rows {
        out.push_str(&format!(
            "  {:<8} {:>12} {:>10}\n",
            row.label,
            format_price(row.display_price),
            format_percent(row.percent_change, decimals),
        ));
    }
    out
}

pub fn render_headline(headline: &Headline, decimals: usize) -> String {
    let unit = if headline.unit.is_empty() { "unit" } else { headline.unit.as_str() };
    let movement = if rounds_to_zero(headline.change, decimals) {
        "unchanged".to_string()
    } else {
        let direction = if headline.change < 0.0 { "down" } else { "up" };
        format!("{} {}", direction, format_percent(Some(headline.change.abs()), decimals))
    };
    format!(
        "{} is {} against the previous period, now {} per {}",
        headline.item_name,
        movement,
        format_price(headline.current_price),
        unit,
    )
}

pub fn render_food(food: &SeasonalFoodRecord) -> String {
    let field = |s: &str| if s.trim().is_empty() { MISSING.to_string() } else { s.trim().to_string() };
    format!(
        "  {} [{}] origin: {} · season: {}\n    {}",
        food.name,
        field(&food.classification),
        field(&food.origin),
        field(&food.production_era),
        field(&food.effect),
    )
}

pub fn render_dashboard(report: &DashboardReport, decimals: usize) -> String {
    let mut out = format!("{} {} seasonal foods\n", report.year, report.month);
    if let Some(headline) = &report.headline {
        out.push_str(&format!("{}\n", render_headline(headline, decimals)));
    }
    for card in &report.cards {
        out.push('\n');
        out.push_str(&render_food(&card.food));
        out.push('\n');
        match &card.prices {
            Some(table) => out.push_str(&render_table(table, decimals)),
            None => out.push_str("    no price data\n"),
        }
    }
    out
}

#[derive(Serialize)]
struct CsvRow<'a> {
    item: &'a str,
    kind: &'a str,
    unit: &'a str,
    period: &'a str,
    raw_price: Option<f64>,
    display_price: Option<f64>,
    percent_change: Option<f64>,
}

/// One CSV line per row. Values are unrounded; missing values are empty cells.
pub fn write_csv<'a, W, I>(writer: W, tables: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ComparisonTable>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for table in tables {
        for row in &table.rows {
            wtr.serialize(CsvRow {
                item: &table.item_name,
                kind: &table.kind_name,
                unit: &table.unit,
                period: &row.label,
                raw_price: row.raw_price,
                display_price: row.display_price,
                percent_change: row.percent_change,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Seasonal food rows with their upstream column names as the header.
pub fn write_foods_csv<W: Write>(writer: W, foods: &[SeasonalFoodRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for food in foods {
        wtr.serialize(food)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn comparison_tables(items: &[ItemComparison]) -> impl Iterator<Item = &ComparisonTable> {
    items.iter().filter_map(|c| c.table.as_ref())
}

pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PeriodSet, PriceRecord};
    use crate::normalizer::build_comparison_table;

    fn rice_table() -> ComparisonTable {
        let record = PriceRecord {
            item_name: "쌀".into(),
            kind_name: "20kg(1kg)".into(),
            unit: "1kg".into(),
            dpr1: "1,983".into(),
            dpr5: "6,000".into(),
            dpr7: "20,000".into(),
            ..Default::default()
        };
        build_comparison_table(&record, &PeriodSet::monthly())
    }

    #[test]
    fn test_render_table() {
        let text = render_table(&rice_table(), 2);
        assert!(text.contains("쌀 (20kg(1kg)) · 1kg"));
        assert!(text.contains("21,983"));
        assert!(text.contains("26,000"));
        assert!(text.contains("202.57%"));
        // previous-year row has no data
        let prev_year = text.lines().find(|l| l.contains("전년")).unwrap();
        assert_eq!(prev_year.matches(MISSING).count(), 2);
    }

    #[test]
    fn test_write_csv() {
        let table = rice_table();
        let mut buf = Vec::new();
        write_csv(&mut buf, [&table]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "item,kind,unit,period,raw_price,display_price,percent_change");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("쌀,20kg(1kg),1kg,현재,1983.0,21983.0,"));
        assert!(lines[1].ends_with(','));
        assert_eq!(lines[3], "쌀,20kg(1kg),1kg,전년,,,");
    }

    #[test]
    fn test_render_headline() {
        let headline = Headline {
            item_name: "쌀".into(),
            change: -66.95,
            current_price: Some(1983.0),
            unit: "1kg".into(),
        };
        assert_eq!(
            render_headline(&headline, 0),
            "쌀 is down 67% against the previous period, now 1,983 per 1kg"
        );
    }

    #[test]
    fn test_write_foods_csv() {
        let foods = vec![SeasonalFoodRecord {
            name: "미역".into(),
            classification: "수산물".into(),
            ..Default::default()
        }];
        let mut buf = Vec::new();
        write_foods_csv(&mut buf, &foods).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("PRDLST_NM,IMG_URL,IDNTFC_NO"));
        assert!(lines.next().unwrap().starts_with("미역,,,,,수산물,"));
    }

    #[test]
    fn test_render_headline_flat() {
        let mut headline = Headline {
            item_name: "감자".into(),
            change: 0.0,
            current_price: Some(3000.0),
            unit: "1kg".into(),
        };
        assert_eq!(
            render_headline(&headline, 2),
            "감자 is unchanged against the previous period, now 3,000 per 1kg"
        );
        headline.change = -0.001;
        assert!(render_headline(&headline, 2).contains("is unchanged"));
        headline.change = 0.5;
        assert!(render_headline(&headline, 2).contains("is up 0.50%"));
    }

    #[test]
    fn test_write_json() {
        let mut buf = Vec::new();
        write_json(&mut buf, &rice_table()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["rows"][0]["display_price"], 21983.0);
        assert!(value["rows"][0]["percent_change"].is_null());
    }
}
