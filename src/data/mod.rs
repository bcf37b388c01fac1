/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .parquet / .json (in-memory upload)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  header, schema check, date coercion → AssetTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  search, or category sets + numeric/date ranges
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  KPI totals, monthly series, chart breakdowns
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  CSV bytes, KPI formatting
///   └──────────┘
/// ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;

#[cfg(test)]
pub(crate) mod test_support;
