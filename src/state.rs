use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::data::aggregate::{
    city_distribution, cost_by_category, monthly_series, summarize, CategoryCost, CityShare,
    MonthlyAggregate, Summary,
};
use crate::data::filter::{apply, default_spec, CategoryFilters, DateRange, FilterSpec, NumericRange};
use crate::data::loader;
use crate::data::model::{
    AssetTable, CellValue, CATEGORICAL_COLUMNS, CITY, MAJOR_CATEGORY, MINOR_CATEGORY,
    OFFICE_OR_WAREHOUSE,
};

/// Categorical columns that get a cost bar chart, in display order.
pub const BAR_CHART_COLUMNS: [&str; 4] = [MAJOR_CATEGORY, MINOR_CATEGORY, CITY, OFFICE_OR_WAREHOUSE];

// ---------------------------------------------------------------------------
// Sidebar controls
// ---------------------------------------------------------------------------

/// Widget state of the filter panel. Turned into a [`FilterSpec`] on every
/// change.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterControls {
    pub search: String,
    pub categories: CategoryFilters,
    /// Current slider positions per range column.
    pub ranges: BTreeMap<String, NumericRange>,
    pub date_enabled: bool,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
}

impl FilterControls {
    fn new(default_ranges: &BTreeMap<String, NumericRange>, date_bounds: (NaiveDate, NaiveDate)) -> Self {
        FilterControls {
            search: String::new(),
            categories: CategoryFilters::new(),
            ranges: default_ranges.clone(),
            date_enabled: false,
            date_start: date_bounds.0,
            date_end: date_bounds.1,
        }
    }

    pub fn to_spec(&self) -> FilterSpec {
        let search = self.search.trim();
        FilterSpec {
            categories: self.categories.clone(),
            ranges: self.ranges.clone(),
            dates: self.date_enabled.then_some(DateRange {
                start: self.date_start,
                end: self.date_end,
            }),
            search: (!search.is_empty()).then(|| search.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived outputs
// ---------------------------------------------------------------------------

/// Everything the central panel draws for one render.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub rows: AssetTable,
    pub summary: Summary,
    pub monthly: Vec<MonthlyAggregate>,
    /// One entry per [`BAR_CHART_COLUMNS`] column.
    pub category_costs: Vec<(&'static str, Vec<CategoryCost>)>,
    pub cities: Vec<CityShare>,
}

impl Dashboard {
    pub fn build(table: &AssetTable, spec: &FilterSpec) -> Self {
        let rows = apply(table, spec);
        let summary = summarize(&rows);
        let monthly: Vec<MonthlyAggregate> = monthly_series(&rows).collect();
        let category_costs = BAR_CHART_COLUMNS
            .iter()
            .map(|col| (*col, cost_by_category(&rows, col)))
            .collect();
        let cities = city_distribution(&rows);
        log::debug!(
            "Recomputed dashboard: {} of {} assets, {} months",
            rows.len(),
            table.len(),
            monthly.len()
        );
        Dashboard {
            rows,
            summary,
            monthly,
            category_costs,
            cities,
        }
    }
}

// ---------------------------------------------------------------------------
// Session – one uploaded file
// ---------------------------------------------------------------------------

/// The loaded register plus the filter state built on top of it. Replaced
/// wholesale when a new file is loaded.
pub struct Session {
    pub file_name: String,
    /// Loaded once, never mutated.
    pub table: AssetTable,
    /// Choices offered by each multi-select.
    pub unique_values: BTreeMap<&'static str, BTreeSet<CellValue>>,
    /// Slider bounds: the observed extent of each range column.
    pub default_ranges: BTreeMap<String, NumericRange>,
    /// Earliest and latest service date, if any row has one.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
    pub controls: FilterControls,
    pub dashboard: Dashboard,
}

impl Session {
    pub fn new(file_name: &str, table: AssetTable) -> Self {
        let unique_values = CATEGORICAL_COLUMNS
            .iter()
            .map(|col| (*col, table.unique_values(col)))
            .collect();
        let default_ranges = default_spec(&table).ranges;
        let date_bounds = service_date_bounds(&table);
        let controls = FilterControls::new(
            &default_ranges,
            date_bounds.unwrap_or_else(|| {
                let today = chrono::Local::now().date_naive();
                (today, today)
            }),
        );
        let dashboard = Dashboard::build(&table, &controls.to_spec());
        Session {
            file_name: file_name.to_string(),
            table,
            unique_values,
            default_ranges,
            date_bounds,
            controls,
            dashboard,
        }
    }

    /// Recompute the dashboard from the current controls.
    pub fn refresh(&mut self) {
        self.dashboard = Dashboard::build(&self.table, &self.controls.to_spec());
    }

    /// Whether the search box is overriding the other filters.
    pub fn search_mode(&self) -> bool {
        !self.controls.search.trim().is_empty()
    }

    /// Toggle a single value in a column's multi-select.
    pub fn toggle_value(&mut self, column: &str, value: &CellValue) {
        let selected = self.controls.categories.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.refresh();
    }

    /// Drop a column's selection, so every value passes.
    pub fn clear_selection(&mut self, column: &str) {
        self.controls.categories.remove(column);
        self.refresh();
    }

    /// Back to the state right after loading.
    pub fn reset_filters(&mut self) {
        let bounds = (self.controls.date_start, self.controls.date_end);
        self.controls = FilterControls::new(&self.default_ranges, self.date_bounds.unwrap_or(bounds));
        self.refresh();
    }
}

fn service_date_bounds(table: &AssetTable) -> Option<(NaiveDate, NaiveDate)> {
    let idx = table.layout.service_date;
    table
        .records
        .iter()
        .filter_map(|r| r.get(idx).as_date())
        .fold(None, |acc, d| match acc {
            Some((lo, hi)) => Some((d.min(lo), d.max(hi))),
            None => Some((d, d)),
        })
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// What the central panel shows below the KPIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Table,
    Charts,
}

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded register and its filters (None until user loads a file).
    pub session: Option<Session>,

    pub view: View,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    /// Ingest an upload. On failure the current session is kept and the
    /// error is shown in the status line.
    pub fn load_upload(&mut self, file_name: &str, bytes: &[u8]) {
        match loader::load_upload(file_name, bytes) {
            Ok(table) => {
                self.session = Some(Session::new(file_name, table));
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {file_name}: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export::to_csv;
    use crate::data::model::{load, ASSET_COST};
    use crate::data::test_support::{asset_table, raw_asset_table};

    fn session() -> Session {
        Session::new("assets.xlsx", asset_table())
    }

    #[test]
    fn fresh_session_shows_everything() {
        let s = session();
        assert_eq!(s.dashboard.rows.records, s.table.records);
        assert_eq!(s.dashboard.summary.total_cost, 825.0);
        assert_eq!(s.dashboard.category_costs.len(), BAR_CHART_COLUMNS.len());
        assert_eq!(
            s.date_bounds,
            Some((
                NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
                NaiveDate::from_ymd_opt(2022, 2, 1).unwrap()
            ))
        );
        assert_eq!(s.unique_values[CITY].len(), 3);
    }

    #[test]
    fn toggling_and_clearing_a_selection() {
        let mut s = session();
        let riyadh = CellValue::Text("Riyadh".into());
        s.toggle_value(CITY, &riyadh);
        assert_eq!(s.dashboard.rows.len(), 2);
        s.toggle_value(CITY, &riyadh);
        assert_eq!(s.dashboard.rows.len(), 5);
        s.toggle_value(CITY, &riyadh);
        s.clear_selection(CITY);
        assert_eq!(s.dashboard.rows.len(), 5);
    }

    #[test]
    fn blank_cost_hidden_only_by_narrowed_slider() {
        let mut raw = raw_asset_table();
        let cost_idx = raw.rows[0]
            .iter()
            .position(|c| c.to_string() == ASSET_COST)
            .unwrap();
        raw.rows[2][cost_idx] = CellValue::Empty;
        let mut s = Session::new("assets.xlsx", load(raw).unwrap());
        assert_eq!(s.dashboard.rows.len(), 5);

        s.controls.ranges.insert(ASSET_COST.into(), NumericRange::new(200.0, 200.0));
        s.refresh();
        assert_eq!(s.dashboard.rows.len(), 1);

        s.reset_filters();
        assert_eq!(s.dashboard.rows.len(), 5);
    }

    #[test]
    fn search_box_overrides_filters() {
        let mut s = session();
        s.controls.ranges.insert(ASSET_COST.into(), NumericRange::new(0.0, 10.0));
        s.refresh();
        assert!(s.dashboard.rows.is_empty());
        assert_eq!(s.dashboard.summary, Summary::default());

        s.controls.search = " 1003 ".into();
        s.refresh();
        assert!(s.search_mode());
        assert_eq!(s.dashboard.rows.len(), 1);
    }

    #[test]
    fn date_range_only_applies_when_enabled() {
        let mut s = session();
        s.controls.date_start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        s.refresh();
        assert_eq!(s.dashboard.rows.len(), 5);

        s.controls.date_enabled = true;
        s.refresh();
        assert_eq!(s.dashboard.rows.len(), 3);

        s.reset_filters();
        assert!(!s.controls.date_enabled);
        assert_eq!(s.dashboard.rows.len(), 5);
    }

    #[test]
    fn failed_upload_keeps_previous_session() {
        let mut state = AppState::default();
        let csv = to_csv(&asset_table()).unwrap();
        state.load_upload("assets.csv", &csv);
        assert!(state.status_message.is_none());
        assert_eq!(state.session.as_ref().map(|s| s.table.len()), Some(5));

        state.load_upload("broken.csv", b"Asset Number,City\n1,Riyadh\n");
        let msg = state.status_message.clone().unwrap();
        assert!(msg.contains("Net Book Value"), "{msg}");
        assert_eq!(state.session.as_ref().map(|s| s.file_name.as_str()), Some("assets.csv"));
    }
}
