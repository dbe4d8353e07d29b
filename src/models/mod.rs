use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Upstream JSON is loose: a "string" field may arrive as a number, null or `[]`.
/// Anything that is not a string or number collapses to an empty string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = lenient_string(deserializer)?;
    let s = s.trim();
    Ok(if s.is_empty() { None } else { Some(s.to_string()) })
}

// ── Price slots ───────────────────────────────────────────────────────────────

/// One of the seven price points carried by a KAMIS record (`dpr1`..`dpr7`).
/// Deserializes through `FromStr`, so config and CLI accept the same names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum PriceSlot {
    #[serde(rename = "dpr1")]
    Current,
    #[serde(rename = "dpr2")]
    DayAgo,
    #[serde(rename = "dpr3")]
    WeekAgo,
    #[serde(rename = "dpr4")]
    TwoWeeksAgo,
    #[serde(rename = "dpr5")]
    MonthAgo,
    #[serde(rename = "dpr6")]
    YearAgo,
    #[serde(rename = "dpr7")]
    NormalYear,
}

impl PriceSlot {
    pub const ALL: [PriceSlot; 7] = [
        PriceSlot::Current,
        PriceSlot::DayAgo,
        PriceSlot::WeekAgo,
        PriceSlot::TwoWeeksAgo,
        PriceSlot::MonthAgo,
        PriceSlot::YearAgo,
        PriceSlot::NormalYear,
    ];

    /// Zero-based position, so `dpr1` is 0.
    pub fn index(self) -> usize {
        match self {
            PriceSlot::Current => 0,
            PriceSlot::DayAgo => 1,
            PriceSlot::WeekAgo => 2,
            PriceSlot::TwoWeeksAgo => 3,
            PriceSlot::MonthAgo => 4,
            PriceSlot::YearAgo => 5,
            PriceSlot::NormalYear => 6,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            PriceSlot::Current => "dpr1",
            PriceSlot::DayAgo => "dpr2",
            PriceSlot::WeekAgo => "dpr3",
            PriceSlot::TwoWeeksAgo => "dpr4",
            PriceSlot::MonthAgo => "dpr5",
            PriceSlot::YearAgo => "dpr6",
            PriceSlot::NormalYear => "dpr7",
        }
    }

    /// Default display label (Korean, as the KAMIS tables use).
    pub fn default_label(self) -> &'static str {
        match self {
            PriceSlot::Current => "현재",
            PriceSlot::DayAgo => "1일전",
            PriceSlot::WeekAgo => "1주일전",
            PriceSlot::TwoWeeksAgo => "2주일전",
            PriceSlot::MonthAgo => "전월",
            PriceSlot::YearAgo => "전년",
            PriceSlot::NormalYear => "평년",
        }
    }
}

impl fmt::Display for PriceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for PriceSlot {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let slot = match key.as_str() {
            "dpr1" | "current" => PriceSlot::Current,
            "dpr2" | "day_ago" => PriceSlot::DayAgo,
            "dpr3" | "week_ago" => PriceSlot::WeekAgo,
            "dpr4" | "two_weeks_ago" => PriceSlot::TwoWeeksAgo,
            "dpr5" | "month_ago" => PriceSlot::MonthAgo,
            "dpr6" | "year_ago" => PriceSlot::YearAgo,
            "dpr7" | "normal_year" => PriceSlot::NormalYear,
            _ => return Err(PeriodError::UnknownSlot(s.to_string())),
        };
        Ok(slot)
    }
}

impl TryFrom<String> for PriceSlot {
    type Error = PeriodError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ── Periods ───────────────────────────────────────────────────────────────────

pub const MAX_PERIODS: usize = 7;

#[derive(Debug, Error, PartialEq)]
pub enum PeriodError {
    #[error("unknown price slot {0:?} (expected dpr1..dpr7)")]
    UnknownSlot(String),

    #[error("unknown period preset {0:?} (expected monthly or full_week)")]
    UnknownPreset(String),

    #[error("{0} periods configured, at most 7 allowed")]
    TooManyPeriods(usize),
}

/// A labelled reference to one price slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Period {
    pub label: String,
    pub slot: PriceSlot,
}

impl Period {
    pub fn new(label: impl Into<String>, slot: PriceSlot) -> Self {
        Self {
            label: label.into(),
            slot,
        }
    }
}

/// Ordered comparison sequence, most recent first. Order is taken as given.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodSet(Vec<Period>);

impl PeriodSet {
    pub fn new(periods: Vec<Period>) -> Result<Self, PeriodError> {
        if periods.len() > MAX_PERIODS {
            return Err(PeriodError::TooManyPeriods(periods.len()));
        }
        Ok(Self(periods))
    }

    /// current → previous month → previous year → normal year
    pub fn monthly() -> Self {
        Self(
            [
                PriceSlot::Current,
                PriceSlot::MonthAgo,
                PriceSlot::YearAgo,
                PriceSlot::NormalYear,
            ]
            .into_iter()
            .map(|slot| Period::new(slot.default_label(), slot))
            .collect(),
        )
    }

    /// Every slot in record order.
    pub fn full_week() -> Self {
        Self(
            PriceSlot::ALL
                .into_iter()
                .map(|slot| Period::new(slot.default_label(), slot))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &Period> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── KAMIS price record ────────────────────────────────────────────────────────

/// One item row from KAMIS `dailyPriceByCategoryList`. Every field is a string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind_code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rank: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: String,

    // Upstream labels for each slot ("당일", "1개월전", ...)
    #[serde(default, deserialize_with = "lenient_string")]
    pub day1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day2: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day3: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day4: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day5: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub day7: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr2: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr3: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr4: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr5: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr6: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dpr7: String,
}

impl PriceRecord {
    /// Raw string behind a slot.
    pub fn price(&self, slot: PriceSlot) -> &str {
        match slot {
            PriceSlot::Current => &self.dpr1,
            PriceSlot::DayAgo => &self.dpr2,
            PriceSlot::WeekAgo => &self.dpr3,
            PriceSlot::TwoWeeksAgo => &self.dpr4,
            PriceSlot::MonthAgo => &self.dpr5,
            PriceSlot::YearAgo => &self.dpr6,
            PriceSlot::NormalYear => &self.dpr7,
        }
    }
}

// ── Normalized price series ───────────────────────────────────────────────────

/// A `PriceRecord` after ingress parsing: one optional number per slot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceSeries {
    pub item_name: String,
    pub kind_name: String,
    pub unit: String,
    pub prices: [Option<f64>; 7],
}

impl PriceSeries {
    pub fn price(&self, slot: PriceSlot) -> Option<f64> {
        self.prices[slot.index()]
    }

    /// Normal-year price, the base of the display adjustment.
    pub fn baseline(&self) -> Option<f64> {
        self.price(PriceSlot::NormalYear)
    }
}

// ── Comparison output ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparisonRow {
    pub label: String,
    pub raw_price: Option<f64>,
    pub display_price: Option<f64>,
    /// Unrounded; formatting happens at render time.
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparisonTable {
    pub item_name: String,
    pub kind_name: String,
    pub unit: String,
    pub rows: Vec<ComparisonRow>,
}

// ── Seasonal food record ──────────────────────────────────────────────────────

/// One row of the seasonal-produce grid (Grid_20171128000000000572_1).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SeasonalFoodRecord {
    #[serde(rename = "PRDLST_NM", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "IMG_URL", default, deserialize_with = "lenient_opt_string")]
    pub image_url: Option<String>,
    #[serde(rename = "IDNTFC_NO", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "M_DISTCTNS", default, deserialize_with = "lenient_string")]
    pub month: String,
    #[serde(rename = "M_DISTCTNS_ITM", default, deserialize_with = "lenient_string")]
    pub month_item: String,
    #[serde(rename = "PRDLST_CL", default, deserialize_with = "lenient_string")]
    pub classification: String,
    #[serde(rename = "MTC_NM", default, deserialize_with = "lenient_string")]
    pub origin: String,
    #[serde(rename = "PRDCTN__ERA", default, deserialize_with = "lenient_string")]
    pub production_era: String,
    #[serde(rename = "MAIN_SPCIES_NM", default, deserialize_with = "lenient_string")]
    pub main_variety: String,
    #[serde(rename = "EFFECT", default, deserialize_with = "lenient_string")]
    pub effect: String,
    #[serde(rename = "PURCHASE_MTH", default, deserialize_with = "lenient_string")]
    pub purchase_method: String,
    #[serde(rename = "COOK_MTH", default, deserialize_with = "lenient_string")]
    pub cook_method: String,
    #[serde(rename = "TRT_MTH", default, deserialize_with = "lenient_string")]
    pub handling_method: String,
    #[serde(rename = "REGIST_DE", default, deserialize_with = "lenient_string")]
    pub registered_on: String,
    #[serde(rename = "URL", default, deserialize_with = "lenient_string")]
    pub detail_url: String,
}

/// Seasonal food joined with its price table, when KAMIS lists the item.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodCard {
    pub food: SeasonalFoodRecord,
    pub prices: Option<ComparisonTable>,
}

// ── Month selection ───────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq)]
#[error("invalid month {0:?} (expected 1-12, optionally suffixed with 월)")]
pub struct MonthError(pub String);

/// Calendar month selected by the user. Accepts "10" or "10월".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month(u32);

impl Month {
    pub fn new(month: u32) -> Result<Self, MonthError> {
        if (1..=12).contains(&month) {
            Ok(Self(month))
        } else {
            Err(MonthError(month.to_string()))
        }
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// Form used by the seasonal grid API's `M_DISTCTNS` filter.
    pub fn label(self) -> String {
        format!("{}월", self.0)
    }

    /// KAMIS `p_regday`: the 15th of the month.
    pub fn regday(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.0, 15)
    }
}

impl FromStr for Month {
    type Err = MonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches('월').trim();
        let n: u32 = digits.parse().map_err(|_| MonthError(s.to_string()))?;
        Month::new(n).map_err(|_| MonthError(s.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}월", self.0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_from_str() {
        assert_eq!("dpr5".parse::<PriceSlot>(), Ok(PriceSlot::MonthAgo));
        assert_eq!(" DPR1 ".parse::<PriceSlot>(), Ok(PriceSlot::Current));
        assert_eq!("normal_year".parse::<PriceSlot>(), Ok(PriceSlot::NormalYear));
        assert_eq!(
            "dpr9".parse::<PriceSlot>(),
            Err(PeriodError::UnknownSlot("dpr9".into()))
        );
    }

    #[test]
    fn test_slot_deserialize_matches_from_str() {
        let period: Period = serde_json::from_str(r#"{"label": "전월", "slot": "DPR5"}"#).unwrap();
        assert_eq!(period.slot, PriceSlot::MonthAgo);
        let period: Period = serde_json::from_str(r#"{"label": "평년", "slot": "normal_year"}"#).unwrap();
        assert_eq!(period.slot, PriceSlot::NormalYear);
        assert!(serde_json::from_str::<Period>(r#"{"label": "x", "slot": "dpr8"}"#).is_err());

        // serializes back to the canonical field name
        let json = serde_json::to_string(&Period::new("전월", PriceSlot::MonthAgo)).unwrap();
        assert_eq!(json, r#"{"label":"전월","slot":"dpr5"}"#);
    }

    #[test]
    fn test_period_set_limit() {
        let eight: Vec<Period> = (0..8).map(|_| Period::new("x", PriceSlot::Current)).collect();
        assert_eq!(PeriodSet::new(eight), Err(PeriodError::TooManyPeriods(8)));
        assert_eq!(PeriodSet::full_week().len(), MAX_PERIODS);
        assert!(PeriodSet::new(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_monthly_preset_order() {
        let slots: Vec<PriceSlot> = PeriodSet::monthly().iter().map(|p| p.slot).collect();
        assert_eq!(
            slots,
            vec![
                PriceSlot::Current,
                PriceSlot::MonthAgo,
                PriceSlot::YearAgo,
                PriceSlot::NormalYear
            ]
        );
    }

    #[test]
    fn test_price_record_lenient_fields() {
        let json = r#"{
            "item_name": "쌀", "kind_name": "20kg(1kg)", "unit": "1kg",
            "dpr1": "1,983", "dpr2": [], "dpr5": 6000, "dpr7": null
        }"#;
        let rec: PriceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.price(PriceSlot::Current), "1,983");
        assert_eq!(rec.price(PriceSlot::DayAgo), "");
        assert_eq!(rec.price(PriceSlot::MonthAgo), "6000");
        assert_eq!(rec.price(PriceSlot::NormalYear), "");
        assert_eq!(rec.price(PriceSlot::YearAgo), "");
    }

    #[test]
    fn test_seasonal_record_renames() {
        let json = r#"{
            "PRDLST_NM": "청경채", "IMG_URL": "", "PRDLST_CL": "채소류",
            "MTC_NM": "경기", "M_DISTCTNS": "10월", "ROW_NUM": 1
        }"#;
        let rec: SeasonalFoodRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.name, "청경채");
        assert_eq!(rec.image_url, None);
        assert_eq!(rec.classification, "채소류");
        assert_eq!(rec.month, "10월");
    }

    #[test]
    fn test_month_parse() {
        assert_eq!("10월".parse::<Month>().unwrap().number(), 10);
        assert_eq!(" 3 ".parse::<Month>().unwrap().label(), "3월");
        assert!("13".parse::<Month>().is_err());
        assert!("october".parse::<Month>().is_err());
        assert_eq!(
            Month::new(10).unwrap().regday(2024),
            NaiveDate::from_ymd_opt(2024, 10, 15)
        );
    }
}
