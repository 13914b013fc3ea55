use std::fs;
use std::path::PathBuf;

use calamine::{CellErrorType, Data, ExcelDateTime, ExcelDateTimeType};

use crate::errors::ParserError;
use crate::formats::{parse_delimited, DelimitedReader, WorkbookReader};
use crate::model::RawGrid;
use crate::read_grid_file;
use crate::registry::GridReader;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

#[test]
fn reads_store_export_without_assuming_header() {
    let grid = read_grid_file(&fixture_path("btc_store_mis.csv"), None)
        .expect("delimited read failed");

    assert_eq!(grid.row_count(), 8);
    assert_eq!(grid.width(), 13);
    assert_eq!(grid.cell(0, 0), Some("BTC Store MIS"));
    assert_eq!(grid.cell(0, 1), None);
    assert_eq!(grid.cell(2, 0), Some("Store Name"));
    assert_eq!(grid.cell(2, 9), None);
    assert_eq!(grid.cell(3, 6), Some("1,250"));
    assert_eq!(grid.cell(7, 0), Some("Andheri, West"));
}

#[test]
fn ragged_rows_are_kept_and_padded_on_lookup() {
    let content = b"a,b,c\nd\ne,f,g,h\n";
    let grid = parse_delimited(content, b',').expect("parse failed");

    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.width(), 4);
    assert_eq!(grid.row(1).map(|r| r.len()), Some(1));
    assert_eq!(grid.cell(1, 2), None);
    assert_eq!(grid.cell(2, 3), Some("h"));
}

#[test]
fn whitespace_cells_become_null_but_text_is_untouched() {
    let grid = parse_delimited(b"  ,  Store Name ,x\n", b',').expect("parse failed");
    assert_eq!(grid.cell(0, 0), None);
    assert_eq!(grid.cell(0, 1), Some("  Store Name "));
}

#[test]
fn invalid_utf8_is_replaced_not_rejected() {
    let content = b"Caf\xe9 Codes,Region\n";
    let grid = parse_delimited(content, b',').expect("parse failed");
    assert_eq!(grid.cell(0, 0), Some("Caf\u{fffd} Codes"));
}

#[test]
fn byte_order_mark_is_not_part_of_first_label() {
    let grid = parse_delimited(b"\xEF\xBB\xBFStore Name,Parameter\n", b',').expect("parse failed");
    assert_eq!(grid.cell(0, 0), Some("Store Name"));
}

#[test]
fn tab_separated_extension_switches_delimiter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stores.tsv");
    fs::write(&path, "Store Name\tApr-21\nA, B\t1,000\n").unwrap();

    let grid = read_grid_file(&path, None).expect("tsv read failed");
    assert_eq!(grid.cell(1, 0), Some("A, B"));
    assert_eq!(grid.cell(1, 1), Some("1,000"));
}

#[test]
fn empty_input_is_a_structural_error() {
    let err = parse_delimited(b"", b',').unwrap_err();
    assert!(matches!(err, ParserError::EmptyInput { .. }));
}

#[test]
fn unknown_extension_reports_every_reader_attempt() {
    let err = read_grid_file(&fixture_path("btc_store_mis.json"), None).unwrap_err();
    match err {
        ParserError::NoMatchingReader { attempts } => {
            let names: Vec<&str> = attempts.iter().map(|a| a.reader).collect();
            assert_eq!(names, vec!["DELIMITED", "WORKBOOK"]);
        }
        other => panic!("expected NoMatchingReader, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = DelimitedReader
        .read(&fixture_path("does_not_exist.csv"))
        .unwrap_err();
    assert!(matches!(err, ParserError::Io { .. }));
}

#[test]
fn workbook_reader_declines_delimited_files() {
    let err = WorkbookReader::new(None)
        .read(&fixture_path("btc_store_mis.csv"))
        .unwrap_err();
    assert!(matches!(err, ParserError::FormatMismatch { .. }));
}

#[test]
fn grid_from_strings_matches_parsed_grid() {
    let built = RawGrid::from_strings(vec![vec!["Store Name", ""], vec!["A", "1"]]);
    let parsed = parse_delimited(b"Store Name,\nA,1\n", b',').unwrap();
    assert_eq!(built, parsed);
}

#[test]
fn workbook_cells_render_as_typed_text() {
    let april = Data::DateTime(ExcelDateTime::new(44287.0, ExcelDateTimeType::DateTime, false));
    let cases = [
        (Data::Float(1000.0), Some("1000")),
        (Data::Float(2500.5), Some("2500.5")),
        (Data::Float(-0.085), Some("-0.085")),
        (Data::Int(12), Some("12")),
        (april, Some("44287")),
        (Data::Bool(true), Some("TRUE")),
        (Data::Bool(false), Some("FALSE")),
        (Data::String("Koramangala".into()), Some("Koramangala")),
        (Data::String("   ".into()), None),
        (Data::DateTimeIso("2021-04-01".into()), Some("2021-04-01")),
        (Data::Error(CellErrorType::Div0), None),
        (Data::Empty, None),
    ];

    for (cell, expected) in cases {
        assert_eq!(
            WorkbookReader::render_cell(&cell).as_deref(),
            expected,
            "cell {cell:?}"
        );
    }
}

#[test]
fn reads_workbook_fixture_with_date_headers_as_serials() {
    let grid = read_grid_file(&fixture_path("btc_store_mis.xlsx"), None)
        .expect("workbook read failed");

    assert_eq!(grid.row_count(), 3);
    assert_eq!(grid.width(), 4);
    assert_eq!(grid.cell(0, 0), Some("Store Name"));
    assert_eq!(grid.cell(0, 2), Some("44287"));
    assert_eq!(grid.cell(0, 3), Some("44317"));
    assert_eq!(grid.cell(1, 2), Some("1000"));
    assert_eq!(grid.cell(1, 3), Some("2500.5"));
    assert_eq!(grid.cell(2, 1), Some("TRUE"));
    assert_eq!(grid.cell(2, 2), None);
    assert_eq!(grid.cell(2, 3), Some("12"));
}

#[test]
fn workbook_sheet_can_be_named() {
    let named = read_grid_file(&fixture_path("btc_store_mis.xlsx"), Some("MIS"))
        .expect("named sheet read failed");
    assert_eq!(named.cell(1, 0), Some("Koramangala"));

    let err = read_grid_file(&fixture_path("btc_store_mis.xlsx"), Some("Summary")).unwrap_err();
    match err {
        ParserError::MissingSheet { sheet, available, .. } => {
            assert_eq!(sheet, "Summary");
            assert_eq!(available, vec!["MIS".to_string()]);
        }
        other => panic!("expected MissingSheet, got {other:?}"),
    }
}
