//! CSV ingestion for locate request files.
//!
//! ## CSV column contract (by header name, case-insensitive)
//!
//! | Column                        | Type / example | Notes                         |
//! |-------------------------------|----------------|-------------------------------|
//! | `client_name`                 | `Client1`      | non-empty after trimming      |
//! | `symbol`                      | `ABC`          | non-empty after trimming      |
//! | `number_of_locates_requested` | `300`          | positive multiple of the lot  |
//! | `round_lot_size` (optional)   | `50`           | per-row lot; positive integer |
//!
//! The header must have exactly 3 or 4 columns. Rows that fail validation
//! are dropped and counted in the [`IngestReport`]; only structural
//! failures abort the parse.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Fixed lot size applied when the file carries no `round_lot_size` column.
pub const DEFAULT_LOT_SIZE: u64 = 100;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Structural failures while reading a request file. Each kind is fatal to
/// the parse; per-row problems are reported through [`IngestReport`]
/// instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DemandError {
    /// The path does not exist or could not be opened.
    NotFound(String),
    /// The path does not carry a `.csv` extension.
    NotCsv(String),
    /// The header row has the wrong number of columns.
    WrongShape { found: usize },
    /// An I/O or CSV-structure error mid-stream.
    Io(String),
}

impl fmt::Display for DemandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemandError::NotFound(path) => write!(f, "demand file not found: '{path}'"),
            DemandError::NotCsv(path) => write!(f, "not a .csv file: '{path}'"),
            DemandError::WrongShape { found } => {
                write!(f, "demand header must have 3 or 4 columns, found {found}")
            }
            DemandError::Io(msg) => write!(f, "demand csv error: {msg}"),
        }
    }
}

impl std::error::Error for DemandError {}

// ---------------------------------------------------------------------------
// Accepted row / ingest report
// ---------------------------------------------------------------------------

/// A validated request row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRow {
    pub client: String,
    pub symbol: String,
    pub requested: u64,
    /// Lot size applicable to this row (per-row column or the file default).
    pub lot_size: u64,
}

/// Why a row was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// A required field is absent from the record.
    MissingField,
    /// `client_name` is empty after trimming.
    EmptyClient,
    /// `symbol` is empty after trimming.
    EmptySymbol,
    /// `round_lot_size` is not a positive integer.
    BadLotSize,
    /// `number_of_locates_requested` is not a positive integer.
    BadQuantity,
    /// Quantity is not a multiple of the applicable lot size.
    OffLotQuantity,
    /// Per-row lot size disagrees with the symbol's established lot size.
    LotSizeConflict,
    /// The (client, symbol) pair was already seen; first row wins.
    DuplicatePair,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingField => "missing-field",
            DropReason::EmptyClient => "empty-client",
            DropReason::EmptySymbol => "empty-symbol",
            DropReason::BadLotSize => "bad-lot-size",
            DropReason::BadQuantity => "bad-quantity",
            DropReason::OffLotQuantity => "off-lot-quantity",
            DropReason::LotSizeConflict => "lot-size-conflict",
            DropReason::DuplicatePair => "duplicate-pair",
        }
    }
}

/// One dropped row: 1-based CSV line number (header = line 1) plus reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DroppedRow {
    pub line: usize,
    pub reason: DropReason,
}

/// Summary of one ingest pass, for the caller to log or surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub dropped: Vec<DroppedRow>,
}

impl IngestReport {
    pub fn rows_dropped(&self) -> usize {
        self.dropped.len()
    }

    pub fn count_of(&self, reason: DropReason) -> usize {
        self.dropped.iter().filter(|d| d.reason == reason).count()
    }

    /// True when every row seen was accepted.
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a request CSV at `path`.
///
/// Returns accepted rows plus the ingest report. See module docs for the
/// column contract and drop rules.
pub fn parse_requests_file(
    path: &Path,
    default_lot: u64,
) -> Result<(Vec<RequestRow>, IngestReport), DemandError> {
    let is_csv = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(DemandError::NotCsv(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DemandError::NotFound(path.display().to_string())
        } else {
            DemandError::Io(format!("read '{}': {e}", path.display()))
        }
    })?;

    parse_requests_str(&content, default_lot)
}

/// Parse request CSV from a string slice (useful for tests without touching
/// the filesystem). See [`parse_requests_file`] for the full contract.
pub fn parse_requests_str(
    src: &str,
    default_lot: u64,
) -> Result<(Vec<RequestRow>, IngestReport), DemandError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(src.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DemandError::Io(e.to_string()))?
        .clone();
    if headers.len() != 3 && headers.len() != 4 {
        return Err(DemandError::WrongShape {
            found: headers.len(),
        });
    }

    let col = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let client_col = col("client_name");
    let symbol_col = col("symbol");
    let quantity_col = col("number_of_locates_requested");
    let lot_col = col("round_lot_size");

    let mut rows: Vec<RequestRow> = Vec::new();
    let mut report = IngestReport::default();
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    let mut symbol_lots: HashMap<String, u64> = HashMap::new();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DemandError::Io(e.to_string()))?;
        let line = i + 2; // 1-based, header is line 1
        report.rows_seen += 1;

        let reject = |report: &mut IngestReport, reason: DropReason| {
            report.dropped.push(DroppedRow { line, reason });
        };

        let field = |idx: Option<usize>| idx.and_then(|c| record.get(c));

        let (client, symbol, quantity_s) = match (
            field(client_col),
            field(symbol_col),
            field(quantity_col),
        ) {
            (Some(c), Some(s), Some(q)) => (c, s, q),
            _ => {
                reject(&mut report, DropReason::MissingField);
                continue;
            }
        };

        if client.is_empty() {
            reject(&mut report, DropReason::EmptyClient);
            continue;
        }
        if symbol.is_empty() {
            reject(&mut report, DropReason::EmptySymbol);
            continue;
        }

        let lot_size = match lot_col {
            Some(c) => match record.get(c) {
                Some(raw) => match raw.parse::<u64>() {
                    Ok(l) if l > 0 => l,
                    _ => {
                        reject(&mut report, DropReason::BadLotSize);
                        continue;
                    }
                },
                None => {
                    reject(&mut report, DropReason::MissingField);
                    continue;
                }
            },
            None => default_lot,
        };

        let requested = match quantity_s.parse::<u64>() {
            Ok(q) if q > 0 => q,
            _ => {
                reject(&mut report, DropReason::BadQuantity);
                continue;
            }
        };
        if requested % lot_size != 0 {
            reject(&mut report, DropReason::OffLotQuantity);
            continue;
        }

        match symbol_lots.get(symbol) {
            Some(&established) if established != lot_size => {
                reject(&mut report, DropReason::LotSizeConflict);
                continue;
            }
            Some(_) => {}
            None => {
                symbol_lots.insert(symbol.to_string(), lot_size);
            }
        }

        if !seen_pairs.insert((client.to_string(), symbol.to_string())) {
            reject(&mut report, DropReason::DuplicatePair);
            continue;
        }

        rows.push(RequestRow {
            client: client.to_string(),
            symbol: symbol.to_string(),
            requested,
            lot_size,
        });
        report.rows_accepted += 1;
    }

    Ok((rows, report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
