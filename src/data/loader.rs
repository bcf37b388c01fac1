use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{Data, Reader, Xlsx};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{self, AssetTable, CellValue, RawTable};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an in-memory upload and normalize it into an [`AssetTable`].
///
/// Fails with a [`model::SchemaError`] (wrapped in `anyhow`) when required
/// columns are missing.
pub fn load_upload(file_name: &str, bytes: &[u8]) -> Result<AssetTable> {
    let raw = read_raw(file_name, bytes)?;
    let table = model::load(raw)?;
    log::info!(
        "Loaded {} assets with {} columns from {file_name}",
        table.len(),
        table.columns.len()
    );
    if table.unparsed_dates > 0 {
        log::warn!(
            "{} value(s) in '{}' could not be read as dates and were left blank",
            table.unparsed_dates,
            model::SERVICE_DATE
        );
    }
    Ok(table)
}

/// Read an upload into a raw grid. Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` – first worksheet (recommended)
/// * `.csv`            – comma-separated, header detected later
/// * `.parquet`        – column names become the header row
/// * `.json`           – `[{ "Asset Number": 1001, "City": "...", ... }, ...]`
pub fn read_raw(file_name: &str, bytes: &[u8]) -> Result<RawTable> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if bytes.is_empty() {
        bail!("{file_name} is empty");
    }

    match ext.as_str() {
        "xlsx" | "xlsm" => read_xlsx(bytes),
        "csv" => read_csv(bytes),
        "parquet" | "pq" => read_parquet(bytes),
        "json" => read_json(bytes),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// Only the first worksheet is read. Cells formatted as dates come back as
/// [`CellValue::Date`].
fn read_xlsx(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = Xlsx::new(Cursor::new(bytes)).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook contains no sheets")?
        .context("reading first worksheet")?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(excel_to_cell).collect())
        .collect();
    Ok(RawTable::new(rows))
}

fn excel_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // #N/A, #REF! and friends carry no value.
        Data::Error(_) => CellValue::Empty,
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(ndt.date()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Every record is read, including the header, so a title line above the
/// header is handled the same way as in workbooks.
fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::guess).collect());
    }
    Ok(RawTable::new(rows))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Date and timestamp columns become
/// dates, numeric columns become numbers.
fn read_parquet(bytes: &[u8]) -> Result<RawTable> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::copy_from_slice(bytes))
        .context("reading parquet metadata")?;
    let header: Vec<CellValue> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| CellValue::Text(f.name().clone()))
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = vec![header];
    for (batch_no, batch_result) in reader.enumerate() {
        let batch = batch_result.context("reading parquet record batch")?;
        if batch_no == 0 && log::log_enabled!(log::Level::Debug) {
            let preview = batch.slice(0, batch.num_rows().min(5));
            if let Ok(table) = arrow::util::pretty::pretty_format_batches(&[preview]) {
                log::debug!("First parquet rows:\n{table}");
            }
        }

        let columns = batch
            .columns()
            .iter()
            .enumerate()
            .map(|(i, col)| {
                column_cells(col).with_context(|| {
                    format!("reading column '{}'", batch.schema().field(i).name())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            rows.push(columns.iter().map(|col| col[row].clone()).collect());
        }
    }
    Ok(RawTable::new(rows))
}

/// Convert one Arrow column into cells, casting to a small set of types
/// first.
fn column_cells(col: &ArrayRef) -> Result<Vec<CellValue>> {
    let n = col.len();
    let cells = match col.data_type() {
        DataType::Boolean => {
            let arr = col.as_boolean();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Bool(arr.value(i))
                    }
                })
                .collect()
        }
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let cast_col = cast(col.as_ref(), &DataType::Utf8)?;
            let arr = cast_col.as_string::<i32>();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::text(arr.value(i))
                    }
                })
                .collect()
        }
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let cast_col = cast(col.as_ref(), &DataType::Date32)?;
            let arr = cast_col.as_primitive::<Date32Type>();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Empty
                    } else {
                        arr.value_as_date(i)
                            .map(CellValue::Date)
                            .unwrap_or(CellValue::Empty)
                    }
                })
                .collect()
        }
        dt if dt.is_numeric() => {
            let cast_col = cast(col.as_ref(), &DataType::Float64)?;
            let arr = cast_col.as_primitive::<Float64Type>();
            (0..n)
                .map(|i| {
                    if arr.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Number(arr.value(i))
                    }
                })
                .collect()
        }
        _ => {
            let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
            (0..n)
                .map(|i| {
                    if col.is_null(i) {
                        CellValue::Empty
                    } else {
                        CellValue::Text(formatter.value(i).to_string())
                    }
                })
                .collect()
        }
    };
    Ok(cells)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, as written by
/// `df.to_json(orient='records', date_format='iso')`):
///
/// ```json
/// [
///   { "Asset Number": 1001, "City": "Riyadh", "Asset Cost": 1500.0, ... },
///   ...
/// ]
/// ```
///
/// Columns are the union of all keys, in first-seen order.
fn read_json(bytes: &[u8]) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_slice(bytes).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(columns.iter().map(|c| CellValue::Text(c.clone())).collect());
    for rec in records {
        rows.push(
            columns
                .iter()
                .map(|col| rec.get(col).map(json_to_cell).unwrap_or(CellValue::Empty))
                .collect(),
        );
    }
    Ok(RawTable::new(rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::text(s),
        JsonValue::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    use super::*;
    use crate::data::filter::search;
    use crate::data::model::{SchemaError, ASSET_COST, NET_BOOK_VALUE, SERVICE_DATE};
    use crate::data::test_support::header_row;

    fn xlsx_fixture(include_nbv: bool) -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");

        sheet.write_string(0, 0, "Fixed Asset Register").unwrap();
        let headers: Vec<&str> = header_row()
            .into_iter()
            .filter(|h| include_nbv || *h != NET_BOOK_VALUE)
            .collect();
        for (c, name) in headers.iter().enumerate() {
            // Stray spaces, as exported by some ERPs.
            sheet.write_string(1, c as u16, format!(" {name} ")).unwrap();
        }

        let dates = [(2022, 1, 15), (2022, 1, 20), (2022, 2, 1)];
        for (r, (y, m, d)) in dates.into_iter().enumerate() {
            let row = r as u32 + 2;
            for (c, name) in headers.iter().enumerate() {
                let col = c as u16;
                match *name {
                    model::ASSET_NUMBER => {
                        sheet.write_number(row, col, 2000.0 + r as f64).unwrap();
                    }
                    model::SERVICE_DATE => {
                        let date = ExcelDateTime::from_ymd(y, m, d).unwrap();
                        sheet
                            .write_datetime_with_format(row, col, &date, &date_format)
                            .unwrap();
                    }
                    ASSET_COST | model::DEPRECIATION_RESERVE | NET_BOOK_VALUE
                    | model::REMAINING_LIFE => {
                        sheet.write_number(row, col, 100.0 * (r as f64 + 1.0)).unwrap();
                    }
                    other => {
                        sheet.write_string(row, col, format!("{other} {r}")).unwrap();
                    }
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_xlsx_with_title_row() {
        let table = load_upload("assets.xlsx", &xlsx_fixture(true)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns[0], model::ASSET_NUMBER);
        let date_idx = table.column_index(SERVICE_DATE).unwrap();
        assert_eq!(
            table.records[0].get(date_idx).as_date(),
            NaiveDate::from_ymd_opt(2022, 1, 15)
        );
        assert_eq!(search(&table, "2001").len(), 1);
    }

    #[test]
    fn xlsx_without_net_book_value_is_a_schema_error() {
        let err = load_upload("assets.xlsx", &xlsx_fixture(false)).unwrap_err();
        let schema = err.downcast_ref::<SchemaError>().expect("schema error");
        assert_eq!(schema.missing, vec![NET_BOOK_VALUE.to_string()]);
    }

    #[test]
    fn reads_csv() {
        let mut text = String::from("Asset Register\n");
        text.push_str(&header_row().join(","));
        text.push('\n');
        text.push_str("1001,Riyadh,Office,IT,Laptops,Laptop,2022-01-15,100,20,80,3\n");
        text.push_str("1002,Jeddah,Warehouse,IT,Servers,Server,someday,\"1,250.00\",10,40,5\n");

        let table = load_upload("assets.CSV", text.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.unparsed_dates, 1);
        let cost_idx = table.column_index(ASSET_COST).unwrap();
        assert_eq!(table.records[1].get(cost_idx).as_f64(), Some(1250.0));
    }

    #[test]
    fn reads_json_records() {
        let json = serde_json::json!([
            {
                "Asset Number": 1001, "City": "Riyadh", "Office or Warehouse": "Office",
                "Major Category Desp": "IT", "Minor Category Desp": "Laptops",
                "Asset Description": "Laptop", "Date Placed in Service": "2022-01-15T00:00:00.000Z",
                "Asset Cost": 100.0, "Depreciation Reserve": 20.0, "Net Book Value": 80.0
            },
            {
                "Asset Number": 1002, "City": null, "Office or Warehouse": "Office",
                "Major Category Desp": "IT", "Minor Category Desp": "Laptops",
                "Asset Description": "Laptop", "Date Placed in Service": null,
                "Asset Cost": 50.0, "Depreciation Reserve": 10.0, "Net Book Value": 40.0
            }
        ]);
        let bytes = serde_json::to_vec(&json).unwrap();
        let table = load_upload("assets.json", &bytes).unwrap();
        assert_eq!(table.len(), 2);
        let date_idx = table.column_index(SERVICE_DATE).unwrap();
        assert_eq!(
            table.records[0].get(date_idx).as_date(),
            NaiveDate::from_ymd_opt(2022, 1, 15)
        );
        assert_eq!(table.records[1].get(table.layout.city), &CellValue::Empty);
        assert_eq!(table.unparsed_dates, 0);
    }

    #[test]
    fn reads_parquet() {
        let names = header_row();
        let text_col = |v: &str| Arc::new(StringArray::from(vec![v, v])) as ArrayRef;
        let mut fields = Vec::new();
        let mut arrays: Vec<ArrayRef> = Vec::new();
        for name in &names {
            let (field, array) = match *name {
                model::ASSET_NUMBER => (
                    Field::new(*name, DataType::Int64, false),
                    Arc::new(Int64Array::from(vec![7001, 7002])) as ArrayRef,
                ),
                model::SERVICE_DATE => (
                    Field::new(*name, DataType::Date32, true),
                    // 2022-01-15 and null
                    Arc::new(Date32Array::from(vec![Some(19007), None])) as ArrayRef,
                ),
                ASSET_COST | model::DEPRECIATION_RESERVE | NET_BOOK_VALUE
                | model::REMAINING_LIFE => (
                    Field::new(*name, DataType::Float64, false),
                    Arc::new(Float64Array::from(vec![10.0, 20.0])) as ArrayRef,
                ),
                other => (Field::new(*name, DataType::Utf8, false), text_col(other)),
            };
            fields.push(field);
            arrays.push(array);
        }
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        let bytes = writer.into_inner().unwrap();

        let table = load_upload("assets.parquet", &bytes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(search(&table, "7002").len(), 1);
        let date_idx = table.column_index(SERVICE_DATE).unwrap();
        assert_eq!(
            table.records[0].get(date_idx).as_date(),
            NaiveDate::from_ymd_opt(2022, 1, 15)
        );
        assert_eq!(table.records[1].get(date_idx), &CellValue::Empty);
    }

    #[test]
    fn rejects_unknown_extension_and_empty_upload() {
        let err = read_raw("assets.ods", b"data").unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
        assert!(read_raw("assets.xlsx", b"").is_err());
        assert!(read_raw("assets.xlsx", b"not a zip").is_err());
    }
}
