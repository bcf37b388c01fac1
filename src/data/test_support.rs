//! Shared fixtures for the data-layer tests.

use super::model::{
    load, AssetTable, CellValue, RawTable, ASSET_COST, ASSET_DESCRIPTION, ASSET_NUMBER, CITY,
    DEPRECIATION_RESERVE, MAJOR_CATEGORY, MINOR_CATEGORY, NET_BOOK_VALUE, OFFICE_OR_WAREHOUSE,
    REMAINING_LIFE, SERVICE_DATE,
};

pub fn header_row() -> Vec<&'static str> {
    vec![
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
        REMAINING_LIFE,
    ]
}

/// One register row. `date` is passed through as text so loading exercises
/// date coercion; an empty string leaves the date blank.
#[allow(clippy::too_many_arguments)]
pub fn asset_row(
    number: f64,
    city: &str,
    site: &str,
    major: &str,
    minor: &str,
    description: &str,
    date: &str,
    cost: f64,
    depreciation: f64,
    nbv: f64,
    remaining_life: f64,
) -> Vec<CellValue> {
    let text = CellValue::text;
    vec![
        CellValue::Number(number),
        text(city),
        text(site),
        text(major),
        text(minor),
        text(description),
        text(date),
        CellValue::Number(cost),
        CellValue::Number(depreciation),
        CellValue::Number(nbv),
        CellValue::Number(remaining_life),
    ]
}

pub fn raw_with_rows(rows: Vec<Vec<CellValue>>) -> RawTable {
    let mut all = vec![header_row()
        .into_iter()
        .map(|c| CellValue::Text(c.to_string()))
        .collect::<Vec<_>>()];
    all.extend(rows);
    RawTable::new(all)
}

/// Five assets across three cities; asset 1004 has no service date.
pub fn raw_asset_table() -> RawTable {
    raw_with_rows(vec![
        asset_row(1001.0, "Riyadh", "Office", "IT", "Laptops", "Laptop", "2022-01-15", 100.0, 20.0, 80.0, 3.0),
        asset_row(1002.0, "Jeddah", "Warehouse", "Vehicles", "Trucks", "Truck", "2022-01-20", 50.0, 10.0, 40.0, 5.0),
        asset_row(1003.0, "Riyadh", "Warehouse", "Furniture", "Desks", "Desk", "2022-02-01", 200.0, 50.0, 150.0, 7.0),
        asset_row(1004.0, "Dammam", "Office", "IT", "Servers", "Server", "", 400.0, 100.0, 300.0, 4.0),
        asset_row(10045.0, "Jeddah", "Office", "Vehicles", "Cars", "Sedan", "2021-12-31", 75.0, 25.0, 50.0, 2.0),
    ])
}

pub fn asset_table() -> AssetTable {
    load(raw_asset_table()).expect("fixture has every required column")
}

/// Asset numbers of a table, in row order.
pub fn asset_numbers(table: &AssetTable) -> Vec<String> {
    table
        .records
        .iter()
        .map(|r| r.get(table.layout.asset_number).to_string())
        .collect()
}
