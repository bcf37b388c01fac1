use anyhow::{anyhow, Context, Result};

use super::aggregate::MonthlyAggregate;
use super::model::AssetTable;

/// Default file name offered when saving the filtered register.
pub const FILTERED_FILE_NAME: &str = "filtered_assets.csv";
/// Default file name offered when saving the monthly series.
pub const MONTHLY_FILE_NAME: &str = "monthly_assets.csv";

/// Serialize a table as comma-separated text: one header row, then one line
/// per record, no index column. Dates are written as `YYYY-MM-DD` and
/// blank cells as empty fields.
pub fn to_csv(table: &AssetTable) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.columns)
        .context("writing CSV header")?;
    for (row_no, rec) in table.records.iter().enumerate() {
        wtr.write_record(rec.cells.iter().map(|c| c.to_string()))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow!("flushing CSV buffer: {}", e.error()))
}

/// Serialize the monthly series (`Month,Asset Count,Asset Cost`).
pub fn monthly_csv(series: &[MonthlyAggregate]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for month in series {
        wtr.serialize(month)
            .with_context(|| format!("writing month {}", month.month))?;
    }
    if series.is_empty() {
        wtr.write_record(["Month", "Asset Count", "Asset Cost"])
            .context("writing CSV header")?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow!("flushing CSV buffer: {}", e.error()))
}

/// Render a KPI as a thousands-grouped integer: `1234567.8` → `1,234,568`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && digits.chars().any(|c| c != '0') {
        grouped.insert(0, '-');
    }
    grouped
}
