use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{AssetTable, CellValue, RANGE_COLUMNS};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of accepted values.
/// If a column is absent or its set is empty, it means "no filter".
pub type CategoryFilters = BTreeMap<String, BTreeSet<CellValue>>;

/// Inclusive numeric bounds. `min == max` keeps exact matches only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        NumericRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether `other` lies entirely inside these bounds.
    pub fn covers(&self, other: &NumericRange) -> bool {
        self.min <= other.min && self.max >= other.max
    }
}

/// Inclusive service-date bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Every predicate active for one render.
///
/// Built fresh from the sidebar controls on each interaction; the default
/// value constrains nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub categories: CategoryFilters,
    /// column_name → inclusive bounds.
    pub ranges: BTreeMap<String, NumericRange>,
    /// `None` leaves rows without a service date in the result.
    pub dates: Option<DateRange>,
    /// Asset-number query. When non-empty every other predicate is ignored.
    pub search: Option<String>,
}

impl FilterSpec {
    pub fn with_category<I>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = CellValue>,
    {
        self.categories
            .insert(column.to_string(), values.into_iter().collect());
        self
    }

    pub fn with_range(mut self, column: &str, min: f64, max: f64) -> Self {
        self.ranges
            .insert(column.to_string(), NumericRange::new(min, max));
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = Some(DateRange { start, end });
        self
    }

    pub fn with_search(mut self, query: &str) -> Self {
        self.search = Some(query.to_string());
        self
    }

    /// The search query, if search mode is on.
    pub fn active_search(&self) -> Option<&str> {
        self.search.as_deref().filter(|q| !q.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Range seeding
// ---------------------------------------------------------------------------

/// Observed [min, max] of a numeric column. Cells that are not numeric are
/// skipped; `None` when nothing numeric is left (or the column is absent).
pub fn default_range(table: &AssetTable, column: &str) -> Option<NumericRange> {
    let idx = table.column_index(column)?;
    table
        .records
        .iter()
        .filter_map(|r| r.get(idx).as_f64())
        .fold(None, |acc: Option<NumericRange>, v| {
            Some(match acc {
                Some(r) => NumericRange::new(r.min.min(v), r.max.max(v)),
                None => NumericRange::new(v, v),
            })
        })
}

/// A spec whose ranges cover each range column's full extent.
pub fn default_spec(table: &AssetTable) -> FilterSpec {
    let ranges = RANGE_COLUMNS
        .iter()
        .filter_map(|col| default_range(table, col).map(|r| (col.to_string(), r)))
        .collect();
    FilterSpec {
        ranges,
        ..FilterSpec::default()
    }
}

// ---------------------------------------------------------------------------
// Search / filter
// ---------------------------------------------------------------------------

/// Rows whose asset number, rendered as text, contains `query`.
/// Case-sensitive.
pub fn search(table: &AssetTable, query: &str) -> AssetTable {
    let idx = table.layout.asset_number;
    let hits: Vec<usize> = table
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.get(idx).to_string().contains(query))
        .map(|(i, _)| i)
        .collect();
    table.select(&hits)
}

/// Return indices of records that pass every predicate of `spec`
/// (search is not consulted here).
///
/// A record passes:
/// * a category filter when the set is empty or holds the record's value;
/// * a range filter when its cell is numeric and inside the bounds. A range
///   spanning the column's whole observed extent is not a constraint, so
///   blank or text cells only fail a range that has been narrowed;
/// * the date filter when it is inactive, or the record has a service date
///   inside the bounds.
pub fn filtered_indices(table: &AssetTable, spec: &FilterSpec) -> Vec<usize> {
    let categories: Vec<(usize, &BTreeSet<CellValue>)> = spec
        .categories
        .iter()
        .filter(|(_, selected)| !selected.is_empty())
        .filter_map(|(col, selected)| {
            let idx = table.column_index(col);
            if idx.is_none() {
                log::debug!("Ignoring filter on unknown column {col:?}");
            }
            idx.map(|i| (i, selected))
        })
        .collect();
    let ranges: Vec<(usize, &NumericRange)> = spec
        .ranges
        .iter()
        .filter_map(|(col, range)| {
            let idx = table.column_index(col)?;
            let narrowed = default_range(table, col).map_or(true, |full| !range.covers(&full));
            narrowed.then_some((idx, range))
        })
        .collect();
    let date_idx = table.layout.service_date;

    table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            for (idx, selected) in &categories {
                if !selected.contains(rec.get(*idx)) {
                    return false;
                }
            }
            for (idx, range) in &ranges {
                match rec.get(*idx).as_f64() {
                    Some(v) if range.contains(v) => {}
                    _ => return false,
                }
            }
            match &spec.dates {
                Some(dates) => rec
                    .get(date_idx)
                    .as_date()
                    .is_some_and(|d| dates.contains(d)),
                None => true,
            }
        })
        .map(|(i, _)| i)
        .collect()
}

/// Records passing every predicate, as a new table.
pub fn filter(table: &AssetTable, spec: &FilterSpec) -> AssetTable {
    table.select(&filtered_indices(table, spec))
}

/// Search mode when the spec carries a query, filter mode otherwise.
pub fn apply(table: &AssetTable, spec: &FilterSpec) -> AssetTable {
    match spec.active_search() {
        Some(query) => search(table, query),
        None => filter(table, spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{load, ASSET_COST, CITY, NET_BOOK_VALUE, REMAINING_LIFE};
    use crate::data::test_support::{asset_numbers, asset_table, raw_asset_table};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_spec_returns_everything() {
        let table = asset_table();
        assert_eq!(filter(&table, &FilterSpec::default()).records, table.records);
    }

    #[test]
    fn full_default_ranges_return_everything() {
        let table = asset_table();
        let spec = default_spec(&table);
        assert_eq!(spec.ranges.len(), 3);
        assert_eq!(filter(&table, &spec).records, table.records);
    }

    #[test]
    fn default_range_spans_observed_values() {
        let table = asset_table();
        assert_eq!(
            default_range(&table, ASSET_COST),
            Some(NumericRange::new(50.0, 400.0))
        );
        assert_eq!(default_range(&table, "No Such Column"), None);
    }

    #[test]
    fn default_range_of_empty_table_is_none() {
        let table = asset_table().select(&[]);
        assert_eq!(default_range(&table, ASSET_COST), None);
        assert!(default_spec(&table).ranges.is_empty());
    }

    #[test]
    fn category_membership() {
        let table = asset_table();
        let spec = FilterSpec::default().with_category(
            CITY,
            [CellValue::Text("Jeddah".into()), CellValue::Text("Dammam".into())],
        );
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1002", "1004", "10045"]);
    }

    #[test]
    fn empty_category_set_is_no_constraint() {
        let table = asset_table();
        let spec = FilterSpec::default().with_category(CITY, []);
        assert_eq!(filter(&table, &spec).len(), table.len());
    }

    #[test]
    fn predicates_combine() {
        let table = asset_table();
        let spec = FilterSpec::default()
            .with_category(CITY, [CellValue::Text("Riyadh".into())])
            .with_range(NET_BOOK_VALUE, 100.0, 1000.0);
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1003"]);
    }

    #[test]
    fn equal_bounds_keep_exact_match() {
        let table = asset_table();
        let spec = FilterSpec::default().with_range(ASSET_COST, 200.0, 200.0);
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1003"]);
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let table = asset_table();
        let spec = FilterSpec::default().with_range(REMAINING_LIFE, 3.0, 5.0);
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1001", "1002", "1004"]);
    }

    #[test]
    fn date_range_drops_rows_without_date() {
        let table = asset_table();
        let spec = FilterSpec::default().with_dates(date(2000, 1, 1), date(2030, 12, 31));
        let out = filter(&table, &spec);
        assert_eq!(asset_numbers(&out), ["1001", "1002", "1003", "10045"]);

        let spec = FilterSpec::default().with_dates(date(2022, 1, 15), date(2022, 1, 20));
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1001", "1002"]);
    }

    fn table_with_cost(row: usize, cost: CellValue) -> AssetTable {
        let mut raw = raw_asset_table();
        let cost_idx = raw.rows[0]
            .iter()
            .position(|c| c.to_string() == ASSET_COST)
            .unwrap();
        raw.rows[row][cost_idx] = cost;
        load(raw).unwrap()
    }

    #[test]
    fn non_numeric_cells_fail_a_narrowed_range() {
        let table = table_with_cost(1, CellValue::Text("TBD".into()));
        let spec = FilterSpec::default().with_range(ASSET_COST, 150.0, 250.0);
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1003"]);
    }

    #[test]
    fn exact_match_excludes_blank_cost() {
        let table = table_with_cost(2, CellValue::Empty);
        let spec = FilterSpec::default().with_range(ASSET_COST, 200.0, 200.0);
        assert_eq!(asset_numbers(&filter(&table, &spec)), ["1003"]);
    }

    #[test]
    fn full_range_keeps_blank_cost() {
        let table = table_with_cost(2, CellValue::Empty);
        let spec = default_spec(&table);
        assert_eq!(spec.ranges[ASSET_COST], NumericRange::new(75.0, 400.0));
        assert_eq!(filter(&table, &spec).records, table.records);

        // Wider than the observed extent is still no constraint.
        let spec = FilterSpec::default().with_range(ASSET_COST, 0.0, 1e9);
        assert_eq!(filter(&table, &spec).len(), table.len());
    }

    #[test]
    fn search_is_substring_and_case_sensitive() {
        let table = asset_table();
        assert_eq!(asset_numbers(&search(&table, "1004")), ["1004", "10045"]);
        assert!(search(&table, "ABC").is_empty());

        let mut raw = raw_asset_table();
        raw.rows[1][0] = CellValue::Text("FA-001".into());
        let table = load(raw).unwrap();
        assert_eq!(search(&table, "FA-").len(), 1);
        assert_eq!(search(&table, "fa-").len(), 0);
    }

    #[test]
    fn search_supersedes_other_predicates() {
        let table = asset_table();
        let spec = FilterSpec::default()
            .with_category(CITY, [CellValue::Text("Riyadh".into())])
            .with_search("1002");
        assert_eq!(asset_numbers(&apply(&table, &spec)), ["1002"]);

        // An empty query is not search mode.
        let spec = spec.with_search("");
        assert_eq!(asset_numbers(&apply(&table, &spec)), ["1001", "1003"]);
    }

    #[test]
    fn filtering_leaves_input_untouched() {
        let table = asset_table();
        let before = table.clone();
        let _ = filter(&table, &FilterSpec::default().with_range(ASSET_COST, 0.0, 1.0));
        assert_eq!(table, before);
    }
}
