use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

use super::model::{AssetTable, CellValue};

// ---------------------------------------------------------------------------
// KPI totals
// ---------------------------------------------------------------------------

/// The three headline totals of a (filtered) register.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub total_cost: f64,
    pub total_depreciation: f64,
    pub total_net_book_value: f64,
}

/// Sum each money column. Non-numeric cells are left out of the sums; an
/// empty table sums to zero.
pub fn summarize(table: &AssetTable) -> Summary {
    let layout = table.layout;
    let total = |idx: usize| -> f64 {
        table
            .records
            .iter()
            .filter_map(|r| r.get(idx).as_f64())
            .sum()
    };
    Summary {
        total_cost: total(layout.asset_cost),
        total_depreciation: total(layout.depreciation_reserve),
        total_net_book_value: total(layout.net_book_value),
    }
}

// ---------------------------------------------------------------------------
// Monthly time series
// ---------------------------------------------------------------------------

/// A calendar month; orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Months since year 0, used as the x coordinate of time charts.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub fn from_ordinal(ordinal: i64) -> Self {
        YearMonth {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Assets placed in service during one month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    #[serde(rename = "Month")]
    pub month: YearMonth,
    #[serde(rename = "Asset Count")]
    pub count: usize,
    #[serde(rename = "Asset Cost")]
    pub cost: f64,
}

/// Group records by the month of their service date, ascending.
///
/// Records without a service date are dropped. `count` counts records with a
/// non-blank asset number; `cost` sums every numeric cost in the month.
///
/// The grouping runs eagerly when this is called; the returned iterator
/// only walks the finished groups. Call again to regroup.
pub fn monthly_series(table: &AssetTable) -> impl Iterator<Item = MonthlyAggregate> {
    let layout = table.layout;
    let mut months: BTreeMap<YearMonth, (usize, f64)> = BTreeMap::new();
    for rec in &table.records {
        let Some(date) = rec.get(layout.service_date).as_date() else {
            continue;
        };
        let entry = months.entry(YearMonth::of(date)).or_insert((0, 0.0));
        if !rec.get(layout.asset_number).is_empty() {
            entry.0 += 1;
        }
        if let Some(cost) = rec.get(layout.asset_cost).as_f64() {
            entry.1 += cost;
        }
    }
    months
        .into_iter()
        .map(|(month, (count, cost))| MonthlyAggregate { month, count, cost })
}

// ---------------------------------------------------------------------------
// Chart breakdowns
// ---------------------------------------------------------------------------

/// Summed asset cost for one value of a categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCost {
    pub label: String,
    pub cost: f64,
}

/// Asset cost per distinct value of `column`, ordered by value.
/// Blank categories are left out.
pub fn cost_by_category(table: &AssetTable, column: &str) -> Vec<CategoryCost> {
    let Some(idx) = table.column_index(column) else {
        return Vec::new();
    };
    let cost_idx = table.layout.asset_cost;
    let mut groups: BTreeMap<&CellValue, f64> = BTreeMap::new();
    for rec in &table.records {
        let key = rec.get(idx);
        if key.is_empty() {
            continue;
        }
        *groups.entry(key).or_insert(0.0) += rec.get(cost_idx).as_f64().unwrap_or(0.0);
    }
    groups
        .into_iter()
        .map(|(value, cost)| CategoryCost {
            label: value.to_string(),
            cost,
        })
        .collect()
}

/// Number of assets in one city and that count's share of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct CityShare {
    pub city: String,
    pub count: usize,
    pub share: f64,
}

/// Asset count per city, largest first.
pub fn city_distribution(table: &AssetTable) -> Vec<CityShare> {
    let idx = table.layout.city;
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    for rec in &table.records {
        let city = rec.get(idx);
        if !city.is_empty() {
            *counts.entry(city).or_insert(0) += 1;
        }
    }
    let total: usize = counts.values().sum();
    let mut shares: Vec<CityShare> = counts
        .into_iter()
        .map(|(city, count)| CityShare {
            city: city.to_string(),
            count,
            share: count as f64 / total as f64,
        })
        .collect();
    // Stable sort keeps the alphabetical order between equal counts.
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}
