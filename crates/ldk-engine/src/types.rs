use std::collections::BTreeMap;

/// One client's demand for one symbol, as the engine sees it.
///
/// `requested` is positive and a multiple of the symbol's lot size.
/// `share` is this client's fraction of total demand for the symbol, in
/// (0, 1]; shares across a symbol's lines sum to 1.0 within floating
/// tolerance. The engine trusts both properties (the demand aggregator
/// establishes them).
#[derive(Clone, Debug, PartialEq)]
pub struct DemandLine {
    pub client: String,
    pub requested: u64,
    pub share: f64,
}

impl DemandLine {
    pub fn new<S: Into<String>>(client: S, requested: u64, share: f64) -> Self {
        Self {
            client: client.into(),
            requested,
            share,
        }
    }
}

/// Demand book for a single symbol: lot size plus demand lines.
///
/// Line order is significant: the remainder reallocator breaks remainder
/// ties by input position (stable sort), so callers must preserve arrival
/// order when building the book.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolDemand {
    pub symbol: String,
    /// Minimum allocation increment; always > 0.
    pub lot_size: u64,
    pub lines: Vec<DemandLine>,
}

impl SymbolDemand {
    pub fn new<S: Into<String>>(symbol: S, lot_size: u64, lines: Vec<DemandLine>) -> Self {
        Self {
            symbol: symbol.into(),
            lot_size,
            lines,
        }
    }

    /// Total quantity requested across all clients for this symbol.
    pub fn total_requested(&self) -> u64 {
        self.lines.iter().map(|l| l.requested).sum()
    }
}

/// Full demand picture for one engine invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DemandBook {
    pub symbols: Vec<SymbolDemand>,
}

impl DemandBook {
    pub fn new(symbols: Vec<SymbolDemand>) -> Self {
        Self { symbols }
    }

    /// Aggregate requested quantity per symbol (the approval request).
    pub fn totals_by_symbol(&self) -> BTreeMap<String, u64> {
        self.symbols
            .iter()
            .map(|s| (s.symbol.clone(), s.total_requested()))
            .collect()
    }

    /// Requested quantity for a (client, symbol) pair, if present.
    pub fn requested(&self, client: &str, symbol: &str) -> Option<u64> {
        self.symbols
            .iter()
            .find(|s| s.symbol == symbol)?
            .lines
            .iter()
            .find(|l| l.client == client)
            .map(|l| l.requested)
    }
}

/// Canonical approvals map type (symbol -> approved total).
pub type Approvals = BTreeMap<String, u64>;

/// Engine output: client -> symbol -> allocated quantity.
///
/// Every client present in the demand book appears as a key, possibly with
/// an empty inner map (nothing approved for any of its symbols).
pub type AllocationBook = BTreeMap<String, BTreeMap<String, u64>>;

/// Helper to build an Approvals map with minimal boilerplate.
pub fn approvals<I, S>(items: I) -> Approvals
where
    I: IntoIterator<Item = (S, u64)>,
    S: Into<String>,
{
    let mut m = Approvals::new();
    for (sym, qty) in items {
        m.insert(sym.into(), qty);
    }
    m
}
