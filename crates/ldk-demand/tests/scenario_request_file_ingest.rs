//! Scenario: request-file ingestion from disk.
//!
//! Exercises the full file path: extension gate, structural failures as
//! named error kinds, row drops counted but non-fatal, and the aggregated
//! book matching the known breakdown of the reference request file.

use std::io::Write;

use ldk_demand::{load_demand, DemandError, DropReason, DEFAULT_LOT_SIZE};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

const REFERENCE: &str = "\
client_name,symbol,number_of_locates_requested
Client1,ABC,300
Client2,QQQ,100
Client2,ABC,200
Client3,TTT,100
";

#[test]
fn reference_file_aggregates_to_known_breakdown() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "requests.csv", REFERENCE);

    let (book, report) = load_demand(&path, DEFAULT_LOT_SIZE).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.rows_accepted, 4);

    let totals = book.totals_by_symbol();
    assert_eq!(totals["ABC"], 500);
    assert_eq!(totals["QQQ"], 100);
    assert_eq!(totals["TTT"], 100);

    assert_eq!(book.requested("Client1", "ABC"), Some(300));
    assert_eq!(book.requested("Client2", "ABC"), Some(200));
    assert_eq!(book.requested("Client2", "QQQ"), Some(100));
    assert_eq!(book.requested("Client3", "TTT"), Some(100));

    let abc = book.symbols.iter().find(|s| s.symbol == "ABC").unwrap();
    assert!((abc.lines[0].share - 0.6).abs() < 1e-12);
    assert!((abc.lines[1].share - 0.4).abs() < 1e-12);
}

#[test]
fn invalid_rows_are_dropped_not_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "requests.csv",
        "client_name,symbol,number_of_locates_requested\n\
         Client1,ABC,300\n\
         ,ABC,100\n\
         Client2,ABC,250\n\
         Client3,ABC,abc\n",
    );

    let (book, report) = load_demand(&path, DEFAULT_LOT_SIZE).unwrap();
    assert_eq!(report.rows_seen, 4);
    assert_eq!(report.rows_accepted, 1);
    assert_eq!(report.count_of(DropReason::EmptyClient), 1);
    assert_eq!(report.count_of(DropReason::OffLotQuantity), 1);
    assert_eq!(report.count_of(DropReason::BadQuantity), 1);
    assert_eq!(book.totals_by_symbol()["ABC"], 300);
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.csv");
    let err = load_demand(&path, DEFAULT_LOT_SIZE).unwrap_err();
    assert!(matches!(err, DemandError::NotFound(_)));
}

#[test]
fn wrong_extension_is_rejected_before_reading() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "requests.txt", REFERENCE);
    let err = load_demand(&path, DEFAULT_LOT_SIZE).unwrap_err();
    assert!(matches!(err, DemandError::NotCsv(_)));
}

#[test]
fn wrong_header_shape_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "two.csv", "col1,col2\nval1,val2\n");
    let err = load_demand(&path, DEFAULT_LOT_SIZE).unwrap_err();
    assert_eq!(err, DemandError::WrongShape { found: 2 });
}

#[test]
fn per_row_lot_file_round_trips_through_book() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "lots.csv",
        "client_name,symbol,number_of_locates_requested,round_lot_size\n\
         Client1,ABC,250,50\n\
         Client2,ABC,150,50\n",
    );
    let (book, report) = load_demand(&path, DEFAULT_LOT_SIZE).unwrap();
    assert!(report.is_clean());
    let abc = &book.symbols[0];
    assert_eq!(abc.lot_size, 50);
    assert_eq!(abc.total_requested(), 400);
}
