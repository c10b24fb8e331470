//! ldk-report
//!
//! Result emission for allocation runs:
//! - results CSV (one record per allocated (client, symbol) pair)
//! - append-only run log: JSON Lines, one record per run, with an optional
//!   hash chain (each record includes hash_prev + hash_self) so tampering
//!   with history is detectable

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use ldk_engine::{AllocationBook, Approvals, DemandBook};

// ---------------------------------------------------------------------------
// Results CSV
// ---------------------------------------------------------------------------

/// Write the allocation book as a results CSV.
///
/// Header: `client_name,symbol,number_of_locates_allocated`. One record per
/// (client, symbol) entry in the book, including explicit zeros; clients
/// whose symbol map is empty produce no records. Rows are emitted in the
/// book's deterministic (client, symbol) order.
pub fn write_allocations_csv(path: &Path, allocations: &AllocationBook) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create results csv '{}'", path.display()))?;

    writer
        .write_record(["client_name", "symbol", "number_of_locates_allocated"])
        .context("write results header")?;

    for (client, symbols) in allocations {
        for (symbol, quantity) in symbols {
            writer
                .write_record([client.as_str(), symbol.as_str(), &quantity.to_string()])
                .with_context(|| format!("write results row for '{client}'/'{symbol}'"))?;
        }
    }

    writer.flush().context("flush results csv")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Run log records
// ---------------------------------------------------------------------------

/// Per-symbol totals of one allocation run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTotals {
    pub symbol: String,
    pub requested: u64,
    /// 0 when the symbol received no approval entry.
    pub approved: u64,
    pub allocated: u64,
}

/// One allocation run, as appended to the run log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub ts_utc: DateTime<Utc>,
    /// Name of the approval source that supplied the run's approvals.
    pub source: String,
    /// SHA-256 of the demand file consumed by the run, hex-encoded.
    pub demand_digest: String,
    pub symbols: Vec<SymbolTotals>,
    /// hash_self of the previous record, None for the first record.
    pub hash_prev: Option<String>,
    /// SHA-256 over this record serialized with hash_self = None.
    pub hash_self: Option<String>,
}

impl RunRecord {
    pub fn new(source: &str, demand_digest: String, symbols: Vec<SymbolTotals>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            ts_utc: Utc::now(),
            source: source.to_string(),
            demand_digest,
            symbols,
            hash_prev: None,
            hash_self: None,
        }
    }
}

/// Build per-symbol totals from the run's inputs and output.
///
/// Symbols appear in demand-book order; unapproved symbols are included
/// with approved = allocated = 0 so the log shows the full picture.
pub fn summarize_run(
    book: &DemandBook,
    approvals: &Approvals,
    allocations: &AllocationBook,
) -> Vec<SymbolTotals> {
    book.symbols
        .iter()
        .map(|sym| {
            let allocated: u64 = allocations
                .values()
                .filter_map(|symbols| symbols.get(&sym.symbol))
                .sum();
            SymbolTotals {
                symbol: sym.symbol.clone(),
                requested: sym.total_requested(),
                approved: approvals.get(&sym.symbol).copied().unwrap_or(0),
                allocated,
            }
        })
        .collect()
}

/// SHA-256 of a file's bytes, hex-encoded.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("read for digest '{}'", path.display()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

// ---------------------------------------------------------------------------
// Run log writer
// ---------------------------------------------------------------------------

/// Append-only run log writer. Writes JSON Lines (one run per line) and
/// chains records: each record's hash_self covers its content plus the
/// previous record's hash.
pub struct RunLogWriter {
    path: PathBuf,
    last_hash: Option<String>,
}

impl RunLogWriter {
    /// Creates the writer and ensures parent dirs exist. When the log
    /// already has records, the chain resumes from the last one.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {parent:?}"))?;
            }
        }

        let last_hash = match fs::read_to_string(&path) {
            Ok(content) => match content.lines().filter(|l| !l.trim().is_empty()).last() {
                Some(line) => {
                    let record: RunRecord = serde_json::from_str(line)
                        .with_context(|| format!("parse last run-log line of {path:?}"))?;
                    record.hash_self
                }
                None => None,
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e).with_context(|| format!("read run log {path:?}")),
        };

        Ok(Self { path, last_hash })
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    /// Append one run record; returns its hash_self.
    pub fn append(&mut self, mut record: RunRecord) -> Result<String> {
        record.hash_prev = self.last_hash.clone();
        record.hash_self = None;

        let unhashed =
            serde_json::to_string(&record).context("serialize run record for hashing")?;
        let hash = hex::encode(Sha256::digest(unhashed.as_bytes()));
        record.hash_self = Some(hash.clone());

        let line = serde_json::to_string(&record).context("serialize run record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open run log {:?}", self.path))?;
        writeln!(file, "{line}").context("append run record")?;

        self.last_hash = Some(hash.clone());
        Ok(hash)
    }
}

/// Re-hash every record of a run log and verify the chain links up.
///
/// Returns the number of records on success; fails on a broken link or a
/// record whose hash does not match its content.
pub fn verify_run_log(path: &Path) -> Result<usize> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read run log '{}'", path.display()))?;

    let mut prev: Option<String> = None;
    let mut count = 0usize;

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: RunRecord =
            serde_json::from_str(line).with_context(|| format!("parse run-log line {}", i + 1))?;

        if record.hash_prev != prev {
            bail!("run-log line {}: hash_prev does not match preceding record", i + 1);
        }

        let mut unhashed = record.clone();
        let claimed = match unhashed.hash_self.take() {
            Some(h) => h,
            None => bail!("run-log line {}: missing hash_self", i + 1),
        };
        let serialized = serde_json::to_string(&unhashed)?;
        let recomputed = hex::encode(Sha256::digest(serialized.as_bytes()));
        if recomputed != claimed {
            bail!("run-log line {}: hash_self mismatch (content tampered?)", i + 1);
        }

        prev = Some(claimed);
        count += 1;
    }

    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
