use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Column names of the fixed-asset register
// ---------------------------------------------------------------------------

pub const ASSET_NUMBER: &str = "Asset Number";
pub const CITY: &str = "City";
pub const OFFICE_OR_WAREHOUSE: &str = "Office or Warehouse";
pub const MAJOR_CATEGORY: &str = "Major Category Desp";
pub const MINOR_CATEGORY: &str = "Minor Category Desp";
pub const ASSET_DESCRIPTION: &str = "Asset Description";
pub const SERVICE_DATE: &str = "Date Placed in Service";
pub const ASSET_COST: &str = "Asset Cost";
pub const DEPRECIATION_RESERVE: &str = "Depreciation Reserve";
pub const NET_BOOK_VALUE: &str = "Net Book Value";
/// Optional: only used as a range filter when the upload carries it.
pub const REMAINING_LIFE: &str = "Remaining Life";

/// Columns filtered by set membership, in sidebar order.
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    CITY,
    OFFICE_OR_WAREHOUSE,
    MAJOR_CATEGORY,
    MINOR_CATEGORY,
    ASSET_DESCRIPTION,
];

/// Columns filtered by an inclusive [min, max] range.
pub const RANGE_COLUMNS: [&str; 3] = [ASSET_COST, NET_BOOK_VALUE, REMAINING_LIFE];

/// Every column an upload must provide, in the order they are reported.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    ASSET_NUMBER,
    CITY,
    OFFICE_OR_WAREHOUSE,
    MAJOR_CATEGORY,
    MINOR_CATEGORY,
    ASSET_DESCRIPTION,
    SERVICE_DATE,
    ASSET_COST,
    DEPRECIATION_RESERVE,
    NET_BOOK_VALUE,
];

/// How many leading rows may be searched for the header.
const HEADER_SEARCH_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the register
// ---------------------------------------------------------------------------

/// A dynamically-typed cell, as produced by the spreadsheet readers.
/// Used as a key in `BTreeSet`s of unique values, so it must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Empty,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Empty => 0,
                Bool(_) => 1,
                Number(_) => 2,
                Date(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Empty, Empty) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Empty => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            // Identifiers read from spreadsheets arrive as floats; show
            // 1001.0 as "1001".
            CellValue::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Numeric coercion used by range filters and totals.
    ///
    /// `None` means the cell is unusable for numeric work; callers skip it
    /// instead of failing the whole aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            CellValue::Text(s) => {
                let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
                cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
            }
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text cell; blank strings become [`CellValue::Empty`].
    pub fn text(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }

    /// Guess a type for a cell that arrived as plain text (CSV uploads).
    pub fn guess(s: &str) -> Self {
        if s.trim().is_empty() {
            return CellValue::Empty;
        }
        if let Ok(v) = s.trim().parse::<f64>() {
            return CellValue::Number(v);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Date coercion
// ---------------------------------------------------------------------------

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%d-%b-%Y", "%Y%m%d",
];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Largest serial Excel accepts (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Coerce a cell to a calendar date. Never fails: anything that does not
/// look like a date maps to `None`.
pub fn coerce_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => excel_serial_to_date(*n).or_else(|| compact_date(*n)),
        CellValue::Text(s) => parse_date_text(s.trim()),
        CellValue::Bool(_) | CellValue::Empty => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// `20220115` read as a number by the CSV reader. Such values are far above
/// the largest Excel serial, so the two readings never overlap.
fn compact_date(n: f64) -> Option<NaiveDate> {
    if n.fract() != 0.0 || !(10_000_101.0..=99_991_231.0).contains(&n) {
        return None;
    }
    NaiveDate::parse_from_str(&(n as i64).to_string(), "%Y%m%d").ok()
}

/// Spreadsheet serials count days from 1899-12-30 (the 1900 system with
/// the leap-year bug folded in).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The upload lacks one or more required columns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required column(s): {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

// ---------------------------------------------------------------------------
// RawTable – the grid handed over by a reader
// ---------------------------------------------------------------------------

/// Rows exactly as read from the upload, header (and any title row)
/// included.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        RawTable { rows }
    }
}

// ---------------------------------------------------------------------------
// AssetRecord / AssetTable
// ---------------------------------------------------------------------------

/// One row of the register, aligned with [`AssetTable::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub cells: Vec<CellValue>,
}

impl AssetRecord {
    pub fn get(&self, idx: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(idx).unwrap_or(&EMPTY)
    }
}

/// Positions of the well-known columns inside a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub asset_number: usize,
    pub city: usize,
    pub service_date: usize,
    pub asset_cost: usize,
    pub depreciation_reserve: usize,
    pub net_book_value: usize,
}

/// A normalized register: trimmed headers, validated schema, service dates
/// coerced. Immutable once loaded; filtering produces new tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetTable {
    /// Trimmed column names in source order.
    pub columns: Vec<String>,
    pub layout: ColumnLayout,
    pub records: Vec<AssetRecord>,
    /// Service-date cells that were present but could not be parsed.
    pub unparsed_dates: usize,
}

impl AssetTable {
    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First column with this (trimmed) name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Sorted distinct non-empty values of a column.
    pub fn unique_values(&self, column: &str) -> BTreeSet<CellValue> {
        let Some(idx) = self.column_index(column) else {
            return BTreeSet::new();
        };
        self.records
            .iter()
            .map(|r| r.get(idx))
            .filter(|v| !v.is_empty())
            .cloned()
            .collect()
    }

    /// A new table holding the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> AssetTable {
        AssetTable {
            columns: self.columns.clone(),
            layout: self.layout,
            records: indices
                .iter()
                .filter_map(|&i| self.records.get(i).cloned())
                .collect(),
            unparsed_dates: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// load – RawTable → AssetTable
// ---------------------------------------------------------------------------

/// Normalize a raw grid into an [`AssetTable`].
///
/// * The header is the first of the leading rows that names the asset
///   number column, or failing that the first row with at least two
///   non-empty cells, so a one-cell title row is skipped.
/// * Column names are trimmed; blank ones become `Unnamed: <i>`.
/// * Rows with no non-empty cell are dropped.
/// * The service-date column is coerced to dates; unparseable cells become
///   [`CellValue::Empty`] and are counted in `unparsed_dates`.
pub fn load(raw: RawTable) -> Result<AssetTable, SchemaError> {
    let Some(header_idx) = find_header_row(&raw.rows) else {
        return Err(SchemaError {
            missing: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        });
    };

    let mut rows = raw.rows.into_iter().skip(header_idx);
    let header = rows.next().unwrap_or_default();
    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.to_string().trim().to_string();
            if name.is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            }
        })
        .collect();

    let position = |name: &str| columns.iter().position(|c| c == name);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| position(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError { missing });
    }

    let required = |name: &str| position(name).unwrap_or_default();
    let layout = ColumnLayout {
        asset_number: required(ASSET_NUMBER),
        city: required(CITY),
        service_date: required(SERVICE_DATE),
        asset_cost: required(ASSET_COST),
        depreciation_reserve: required(DEPRECIATION_RESERVE),
        net_book_value: required(NET_BOOK_VALUE),
    };

    let width = columns.len();
    let mut unparsed_dates = 0;
    let records: Vec<AssetRecord> = rows
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|mut cells| {
            cells.resize(width, CellValue::Empty);
            let date_cell = &mut cells[layout.service_date];
            *date_cell = match coerce_date(date_cell) {
                Some(d) => CellValue::Date(d),
                None => {
                    if !date_cell.is_empty() {
                        unparsed_dates += 1;
                    }
                    CellValue::Empty
                }
            };
            AssetRecord { cells }
        })
        .collect();

    Ok(AssetTable {
        columns,
        layout,
        records,
        unparsed_dates,
    })
}

fn find_header_row(rows: &[Vec<CellValue>]) -> Option<usize> {
    let leading = rows.iter().take(HEADER_SEARCH_ROWS).enumerate();
    let names_asset_number = |row: &[CellValue]| {
        row.iter().any(|c| c.to_string().trim() == ASSET_NUMBER)
    };
    leading
        .clone()
        .find(|(_, row)| names_asset_number(row.as_slice()))
        .or_else(|| {
            leading
                .clone()
                .find(|(_, row)| row.iter().filter(|c| !c.is_empty()).count() >= 2)
        })
        .map(|(i, _)| i)
}
