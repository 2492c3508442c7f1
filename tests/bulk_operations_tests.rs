//! Integration tests for bulk export, bulk insert and import preparation.
//!
//! bcp itself is replaced by `FakeBcp`; everything else (argument building,
//! format files, temp files, decoding, cleanup) runs for real.

mod common;

use bulkcopy::bcp::{
    ExportOptions, FileEncoding, InsertOptions, Mode, PrepareOptions, Row, TypeTag, Value,
};
use bulkcopy::{BcpOptions, Error, Step};
use chrono::{Datelike, Timelike};
use common::fixtures::{INSERT_STDOUT, ORDERS_DATA, ORDERS_FORMAT_XML, ORDERS_STDOUT};
use common::{FailOn, FakeBcp, TestBulkCopy};

fn orders_fake() -> FakeBcp {
    FakeBcp::new(ORDERS_FORMAT_XML, ORDERS_DATA, ORDERS_STDOUT)
}

// =============================================================================
// Bulk export
// =============================================================================

#[test]
fn test_export_reads_rows_and_cleans_up() {
    let test = TestBulkCopy::new(orders_fake());

    let (rows, details) =
        test.bulk.export("orders", ExportOptions::default()).expect("export failed");

    assert_eq!(rows.len(), 3);
    assert_eq!(details.row_count, Some(3));
    assert_eq!(details.raw_output, ORDERS_STDOUT);

    assert_eq!(rows[0].get("OrderId"), Some(&Value::Int(1)));
    assert_eq!(rows[0].get("Customer"), Some(&Value::String("Acme".into())));
    assert_eq!(rows[0].get("Shipped"), Some(&Value::Bool(true)));
    let Some(Value::DateTime(placed)) = rows[0].get("PlacedAt") else {
        panic!("PlacedAt should be a timestamp");
    };
    assert_eq!((placed.year(), placed.month(), placed.day()), (2024, 1, 15));
    assert_eq!((placed.hour(), placed.minute()), (10, 30));

    // Empty string and NULL stay distinct
    assert_eq!(rows[1].get("Customer"), Some(&Value::String(String::new())));
    assert_eq!(rows[1].get("PlacedAt"), Some(&Value::Null));
    assert_eq!(rows[2].get("Customer"), Some(&Value::Null));

    assert!(!details.format_file.exists());
    assert!(!details.export_file.exists());
    assert!(test.temp_files().is_empty());
}

#[test]
fn test_export_runs_format_then_out() {
    let options = BcpOptions {
        server: Some("db01".into()),
        trusted: true,
        batch_size: Some(500),
        ..Default::default()
    };
    let test = TestBulkCopy::with_options(orders_fake(), options);

    let (_, details) = test.bulk.export("orders", ExportOptions::default()).expect("export failed");

    let calls = test.fake().calls();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].mode, Mode::Format);
    assert_eq!(calls[0].format_file, details.format_file);
    assert_eq!(calls[0].arg_tokens(), vec!["-x", "-c", "-b", "500", "-S", "db01", "-T"]);

    assert_eq!(calls[1].mode, Mode::Out(details.export_file.clone()));
    assert_eq!(calls[1].format_file, details.format_file);
    assert_eq!(calls[1].arg_tokens(), vec!["-b", "500", "-S", "db01", "-T"]);
    assert_eq!(calls[1].table.token(), "[orders]");
}

#[test]
fn test_export_temp_file_names() {
    let test = TestBulkCopy::new(orders_fake());
    let options = ExportOptions { keep_files: true, ..Default::default() };

    let (_, details) = test.bulk.export("orders", options).expect("export failed");

    let format_name = details.format_file.file_name().unwrap().to_string_lossy().into_owned();
    let export_name = details.export_file.file_name().unwrap().to_string_lossy().into_owned();
    let pid = std::process::id().to_string();

    assert!(format_name.ends_with(&format!("_{pid}_format.xml")));
    assert!(export_name.ends_with(&format!("_{pid}_export.dat")));
    assert_eq!(details.format_file.parent(), Some(test.temp_dir.path().join("bcp").as_path()));
}

#[test]
fn test_export_without_read_keeps_files() {
    let test = TestBulkCopy::new(orders_fake());
    let options = ExportOptions { read: false, keep_files: false, ..Default::default() };

    let (rows, details) = test.bulk.export("orders", options).expect("export failed");

    assert!(rows.is_empty());
    assert_eq!(details.row_count, Some(3));
    assert!(details.format_file.exists());
    assert!(details.export_file.exists());
    assert_eq!(std::fs::read(&details.export_file).unwrap(), ORDERS_DATA);
}

#[test]
fn test_export_keep_files_reads_and_keeps() {
    let test = TestBulkCopy::new(orders_fake());
    let options = ExportOptions { keep_files: true, ..Default::default() };

    let (rows, details) = test.bulk.export("orders", options).expect("export failed");

    assert_eq!(rows.len(), 3);
    assert!(details.format_file.exists());
    assert!(details.export_file.exists());
}

#[test]
fn test_export_to_caller_paths_creates_directories() {
    let test = TestBulkCopy::new(orders_fake());
    let format_file = test.temp_dir.path().join("formats/nested/orders.xml");
    let export_file = test.temp_dir.path().join("exports/orders.dat");
    let options = ExportOptions {
        read: false,
        format_file: Some(format_file.clone()),
        export_file: Some(export_file.clone()),
        ..Default::default()
    };

    let (_, details) = test.bulk.export("orders", options).expect("export failed");

    assert_eq!(details.format_file, format_file);
    assert_eq!(details.export_file, export_file);
    assert!(format_file.exists());
    assert!(export_file.exists());
}

#[test]
fn test_export_tool_failure_stops_pipeline() {
    let test = TestBulkCopy::new(orders_fake().failing(FailOn::Out));

    let err = test.bulk.export("orders", ExportOptions::default()).unwrap_err();

    assert_eq!(err.step(), Some(Step::RunTool));
    assert!(matches!(err.root(), Error::ToolFailed { stdout, .. } if stdout.contains("08001")));
    assert_eq!(test.fake().calls().len(), 2);
    // No cleanup on the failure path: the generated format file is left behind
    assert_eq!(test.temp_files().len(), 1);
}

#[test]
fn test_export_format_failure_skips_transfer() {
    let test = TestBulkCopy::new(orders_fake().failing(FailOn::Format));

    let err = test.bulk.export("orders", ExportOptions::default()).unwrap_err();

    assert_eq!(err.step(), Some(Step::GenerateFormat));
    assert_eq!(test.fake().calls().len(), 1);
}

#[test]
fn test_export_bad_format_file_is_parse_error() {
    let test = TestBulkCopy::new(FakeBcp::new("<BCPFORMAT/>", ORDERS_DATA, ORDERS_STDOUT));

    let err = test.bulk.export("orders", ExportOptions::default()).unwrap_err();

    assert_eq!(err.step(), Some(Step::GenerateFormat));
    assert!(matches!(err.root(), Error::Parse(_)));
}

#[test]
fn test_export_undecodable_value_fails_read_step() {
    let test = TestBulkCopy::new(FakeBcp::new(ORDERS_FORMAT_XML, b"x\ty\t1\t\r\n", ORDERS_STDOUT));

    let err = test.bulk.export("orders", ExportOptions::default()).unwrap_err();

    assert_eq!(err.step(), Some(Step::ReadResults));
    assert!(matches!(err.root(), Error::Decode { field, .. } if field == "OrderId"));
}

#[test]
fn test_export_truncated_output_drops_partial_row() {
    let truncated = &ORDERS_DATA[..ORDERS_DATA.len() - 2];
    let test = TestBulkCopy::new(FakeBcp::new(ORDERS_FORMAT_XML, truncated, ORDERS_STDOUT));

    let (rows, _) = test.bulk.export("orders", ExportOptions::default()).expect("export failed");

    assert_eq!(rows.len(), 2);
}

#[test]
fn test_export_missing_row_count() {
    let test = TestBulkCopy::new(FakeBcp::new(ORDERS_FORMAT_XML, ORDERS_DATA, "Starting copy..."));

    let (rows, details) =
        test.bulk.export("orders", ExportOptions::default()).expect("export failed");

    assert_eq!(rows.len(), 3);
    assert_eq!(details.row_count, None);
}

#[test]
fn test_export_qualifies_table() {
    let options = BcpOptions {
        database: Some("sales".into()),
        schema: Some("dbo".into()),
        quoted_identifiers: true,
        ..Default::default()
    };
    let test = TestBulkCopy::with_options(orders_fake(), options);

    test.bulk.export("order lines", ExportOptions::default()).expect("export failed");

    let calls = test.fake().calls();
    assert!(calls.iter().all(|call| call.table.token() == "\"sales.dbo.[order lines]\""));
    assert!(calls[1].arg_tokens().contains(&"-q".to_string()));
}

// =============================================================================
// Prepare bulk insert
// =============================================================================

#[test]
fn test_prepare_insert_unknown_column() {
    let options =
        BcpOptions { database: Some("sales".into()), schema: Some("dbo".into()), ..Default::default() };
    let test = TestBulkCopy::with_options(orders_fake(), options);
    let import_file = test.temp_dir.path().join("orders_import.dat");
    let prepare = PrepareOptions { import_file: Some(import_file.clone()), ..Default::default() };

    let err = test.bulk.prepare_insert("orders", &["orderid", "Discount"], prepare).err();

    let err = err.expect("prepare should fail");
    assert_eq!(err.step(), Some(Step::MatchColumns));
    match err.root() {
        Error::ColumnNotFound { column, table } => {
            assert_eq!(column, "Discount");
            assert_eq!(table, "sales.dbo.[orders]");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!import_file.exists());
    assert_eq!(test.fake().calls().len(), 1);
    assert_eq!(test.fake().calls()[0].mode, Mode::Format);
}

#[test]
fn test_prepare_insert_renames_and_flags_columns() {
    let test = TestBulkCopy::new(orders_fake());

    let file = test
        .bulk
        .prepare_insert("orders", &["orderid", "CUSTOMER"], PrepareOptions::default())
        .expect("prepare failed");

    let fields = &file.format().fields;
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0].name, "orderid");
    assert!(fields[0].in_import);
    assert_eq!(fields[1].name, "CUSTOMER");
    assert!(fields[1].in_import);
    assert!(!fields[2].in_import);
    assert!(!fields[3].in_import);
    assert_eq!(fields[3].type_tag, TypeTag::DateTime);
    assert!(file.path().exists());
    assert_eq!(file.table(), "orders");
}

// =============================================================================
// Bulk insert
// =============================================================================

#[test]
fn test_prepare_write_and_insert() {
    let fake = FakeBcp::new(ORDERS_FORMAT_XML, b"", INSERT_STDOUT);
    let test = TestBulkCopy::new(fake);

    let mut file = test
        .bulk
        .prepare_insert("orders", &["OrderId", "Customer"], PrepareOptions::default())
        .expect("prepare failed");
    let rows: Vec<Row> = vec![
        [("OrderId", Value::Int(10)), ("Customer", "Globex".into())].into_iter().collect(),
        [("OrderId", Value::Int(11)), ("Customer", "".into())].into_iter().collect(),
    ];
    for row in &rows {
        file.write_row(row).expect("write failed");
    }
    let prepared = file.finish().expect("finish failed");

    test.bulk.insert_prepared(&prepared, InsertOptions::default()).expect("insert failed");

    let imports = test.fake().imports();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].data, b"10\tGlobex\t11\t\0\t".to_vec());
    assert!(imports[0].format_xml.contains("NAME=\"OrderId\""));
    assert!(!imports[0].format_xml.contains("PlacedAt"));

    let calls = test.fake().calls();
    assert_eq!(calls[1].mode, Mode::In(prepared.data_file.clone()));
    assert_eq!(calls[1].format_file, prepared.format.path);

    assert!(!prepared.data_file.exists());
    assert!(!prepared.format.path.exists());
}

#[test]
fn test_insert_keep_files() {
    let test = TestBulkCopy::new(FakeBcp::new(ORDERS_FORMAT_XML, b"", INSERT_STDOUT));
    let file = test
        .bulk
        .prepare_insert("orders", &["OrderId"], PrepareOptions::default())
        .expect("prepare failed");
    let prepared = file.finish().expect("finish failed");

    test.bulk
        .insert_prepared(&prepared, InsertOptions { keep_files: true })
        .expect("insert failed");

    assert!(prepared.data_file.exists());
    assert!(prepared.format.path.exists());
}

#[test]
fn test_insert_failure_keeps_files() {
    let fake = FakeBcp::new(ORDERS_FORMAT_XML, b"", INSERT_STDOUT).failing(FailOn::In);
    let test = TestBulkCopy::new(fake);
    let file = test
        .bulk
        .prepare_insert("orders", &["OrderId"], PrepareOptions::default())
        .expect("prepare failed");
    let prepared = file.finish().expect("finish failed");

    let err = test.bulk.insert_prepared(&prepared, InsertOptions::default()).unwrap_err();

    assert_eq!(err.step(), Some(Step::RunTool));
    assert!(prepared.data_file.exists());
    assert!(prepared.format.path.exists());
}

// =============================================================================
// Round trip through the import writer and the reader
// =============================================================================

#[test]
fn test_import_file_round_trips_through_reader() {
    let test = TestBulkCopy::new(FakeBcp::new(ORDERS_FORMAT_XML, b"", INSERT_STDOUT));
    let columns = ["OrderId", "Customer", "Shipped", "PlacedAt"];
    let mut file = test
        .bulk
        .prepare_insert("orders", &columns, PrepareOptions::default())
        .expect("prepare failed");

    let placed = chrono::DateTime::parse_from_rfc3339("2024-03-09T08:15:30.500+00:00").unwrap();
    let rows: Vec<Row> = vec![
        [
            ("OrderId", Value::Int(1)),
            ("Customer", "Initech".into()),
            ("Shipped", Value::Bool(true)),
            ("PlacedAt", Value::DateTime(placed)),
        ]
        .into_iter()
        .collect(),
        [
            ("OrderId", Value::Int(2)),
            ("Customer", Value::String(String::new())),
            ("Shipped", Value::Bool(false)),
            ("PlacedAt", Value::Null),
        ]
        .into_iter()
        .collect(),
        [
            ("OrderId", Value::Int(3)),
            ("Customer", Value::Null),
            ("Shipped", Value::Bool(false)),
            ("PlacedAt", Value::Null),
        ]
        .into_iter()
        .collect(),
    ];
    for row in &rows {
        file.write_row(row).expect("write failed");
    }
    let prepared = file.finish().expect("finish failed");

    let bytes = std::fs::read(&prepared.data_file).unwrap();
    let decoded = bulkcopy::bcp::read_rows(&bytes, &prepared.format).expect("decode failed");

    assert_eq!(prepared.format.encoding, FileEncoding::Char);
    assert_eq!(decoded, rows);
}
