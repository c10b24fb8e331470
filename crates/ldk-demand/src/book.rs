//! Aggregation of accepted request rows into the engine's demand book.

use std::collections::HashMap;
use std::path::Path;

use ldk_engine::{DemandBook, DemandLine, SymbolDemand};

use crate::parse::{parse_requests_file, parse_requests_str, DemandError, IngestReport, RequestRow};

/// Build a [`DemandBook`] from accepted request rows.
///
/// Symbols and their lines appear in first-seen row order (the engine's
/// stable-sort tie-break depends on it). Each line's share is its fraction
/// of the symbol's total requested quantity, so shares per symbol sum to
/// 1.0 up to floating error.
pub fn build_book(rows: &[RequestRow]) -> DemandBook {
    let mut book = DemandBook::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let idx = match index.get(&row.symbol) {
            Some(&i) => i,
            None => {
                book.symbols
                    .push(SymbolDemand::new(row.symbol.clone(), row.lot_size, Vec::new()));
                index.insert(row.symbol.clone(), book.symbols.len() - 1);
                book.symbols.len() - 1
            }
        };
        // Share is filled in once the symbol total is known.
        book.symbols[idx]
            .lines
            .push(DemandLine::new(row.client.clone(), row.requested, 0.0));
    }

    for sym in &mut book.symbols {
        let total: u64 = sym.lines.iter().map(|l| l.requested).sum();
        for line in &mut sym.lines {
            line.share = line.requested as f64 / total as f64;
        }
    }

    book
}

/// Parse a request file and aggregate it in one step.
pub fn load_demand(
    path: &Path,
    default_lot: u64,
) -> Result<(DemandBook, IngestReport), DemandError> {
    let (rows, report) = parse_requests_file(path, default_lot)?;
    Ok((build_book(&rows), report))
}

/// String-input variant of [`load_demand`] for tests.
pub fn demand_from_str(
    src: &str,
    default_lot: u64,
) -> Result<(DemandBook, IngestReport), DemandError> {
    let (rows, report) = parse_requests_str(src, default_lot)?;
    Ok((build_book(&rows), report))
}
