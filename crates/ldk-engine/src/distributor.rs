//! Distribution engine: proportional entitlements, request caps, and
//! lot-size realignment per symbol.

use std::collections::BTreeMap;

use crate::rounding::{realign_to_lots, round_half_down, ClientUnits, RealignError};
use crate::types::{AllocationBook, Approvals, DemandBook};

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors produced during distribution.
#[derive(Clone, Debug, PartialEq)]
pub enum DistributeError {
    /// A symbol arrived with a lot size of zero.
    ZeroLotSize { symbol: String },
    /// A share is NaN, infinite, or negative; entitlements would be garbage.
    InvalidShare { symbol: String, client: String },
    /// Lot realignment ran out of donors with units still owed. Upstream
    /// data violated the aggregator's invariants.
    DonorPoolExhausted { symbol: String, outstanding: u64 },
}

impl std::fmt::Display for DistributeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroLotSize { symbol } => {
                write!(f, "symbol '{symbol}': lot size must be > 0")
            }
            Self::InvalidShare { symbol, client } => {
                write!(f, "symbol '{symbol}': invalid share for client '{client}'")
            }
            Self::DonorPoolExhausted { symbol, outstanding } => {
                write!(
                    f,
                    "symbol '{symbol}': donor pool exhausted with {outstanding} units still to collect"
                )
            }
        }
    }
}

impl std::error::Error for DistributeError {}

// ─── Options ─────────────────────────────────────────────────────────────────

/// When the proportional pass flags a symbol for lot realignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReallocationTrigger {
    /// Realign whenever any client ends below its full request. This is the
    /// desk's historical behavior and fires even when the cap never clipped
    /// a rounded entitlement.
    AnyUnsatisfied,
    /// Realign only when the request cap actually clipped some client's
    /// rounded entitlement.
    CapClipped,
}

/// Tunable distribution behavior.
///
/// `recap_after_realign` re-applies the per-client request cap to the
/// realigned values. Off by default: the historical engine writes realigned
/// values through uncapped, which conserves the adjusted total but can hand
/// a round-up winner more than it requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistributorOptions {
    pub trigger: ReallocationTrigger,
    pub recap_after_realign: bool,
}

impl Default for DistributorOptions {
    fn default() -> Self {
        Self {
            trigger: ReallocationTrigger::AnyUnsatisfied,
            recap_after_realign: false,
        }
    }
}

// ─── Distributor ─────────────────────────────────────────────────────────────

/// Distribution engine: splits each symbol's approved total across its
/// demand lines.
///
/// # Algorithm, per symbol present in both demand and approvals
///
/// 1. `raw = share * approved_total` per line; round half-down.
/// 2. Cap at the line's requested quantity; the capped value is the
///    candidate allocation.
/// 3. Evaluate the reallocation trigger (see [`ReallocationTrigger`]).
/// 4. When triggered, realign the UNCAPPED rounded values to lot-size
///    multiples ([`realign_to_lots`]) and overwrite the candidate values for
///    every line the realignment touched; lines already on a lot boundary
///    keep their capped value.
/// 5. Optionally re-apply the request cap to the realigned values.
///
/// Symbols with no approval entry allocate nothing; approvals for symbols
/// with no demand are ignored. Output is fully deterministic.
pub struct Distributor {
    options: DistributorOptions,
}

impl Distributor {
    pub fn new(options: DistributorOptions) -> Self {
        Self { options }
    }

    /// Distributor with the historical defaults.
    pub fn with_defaults() -> Self {
        Self::new(DistributorOptions::default())
    }

    pub fn options(&self) -> &DistributorOptions {
        &self.options
    }

    /// Run distribution for every symbol in `book`.
    pub fn distribute(
        &self,
        book: &DemandBook,
        approvals: &Approvals,
    ) -> Result<AllocationBook, DistributeError> {
        // Every demanding client appears in the output, even when nothing
        // was approved for any of its symbols.
        let mut allocated: AllocationBook = BTreeMap::new();
        for sym in &book.symbols {
            for line in &sym.lines {
                allocated.entry(line.client.clone()).or_default();
            }
        }

        for sym in &book.symbols {
            let Some(&approved) = approvals.get(&sym.symbol) else {
                continue;
            };
            if sym.lot_size == 0 {
                return Err(DistributeError::ZeroLotSize {
                    symbol: sym.symbol.clone(),
                });
            }

            let mut proportional: Vec<ClientUnits> = Vec::with_capacity(sym.lines.len());
            let mut realign = false;

            for line in &sym.lines {
                if !line.share.is_finite() || line.share < 0.0 {
                    return Err(DistributeError::InvalidShare {
                        symbol: sym.symbol.clone(),
                        client: line.client.clone(),
                    });
                }

                let rounded = round_half_down(line.share * approved as f64);
                let capped = rounded.min(line.requested);
                proportional.push(ClientUnits::new(line.client.clone(), rounded));

                allocated
                    .entry(line.client.clone())
                    .or_default()
                    .insert(sym.symbol.clone(), capped);

                match self.options.trigger {
                    ReallocationTrigger::AnyUnsatisfied => {
                        if capped != line.requested {
                            realign = true;
                        }
                    }
                    ReallocationTrigger::CapClipped => {
                        if rounded > line.requested {
                            realign = true;
                        }
                    }
                }
            }

            if !realign {
                continue;
            }

            match realign_to_lots(&proportional, sym.lot_size) {
                Ok(Some(adjusted)) => {
                    for adj in adjusted {
                        let value = if self.options.recap_after_realign {
                            match book.requested(&adj.client, &sym.symbol) {
                                Some(req) => adj.units.min(req),
                                None => adj.units,
                            }
                        } else {
                            adj.units
                        };
                        allocated
                            .entry(adj.client)
                            .or_default()
                            .insert(sym.symbol.clone(), value);
                    }
                }
                Ok(None) => {}
                Err(RealignError::ZeroLotSize) => {
                    return Err(DistributeError::ZeroLotSize {
                        symbol: sym.symbol.clone(),
                    });
                }
                Err(RealignError::DonorPoolExhausted { outstanding }) => {
                    return Err(DistributeError::DonorPoolExhausted {
                        symbol: sym.symbol.clone(),
                        outstanding,
                    });
                }
            }
        }

        Ok(allocated)
    }
}

impl Default for Distributor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{approvals, Approvals, DemandBook, DemandLine, SymbolDemand};

    fn abc_book() -> DemandBook {
        DemandBook::new(vec![SymbolDemand::new(
            "ABC",
            100,
            vec![
                DemandLine::new("Client1", 300, 0.6),
                DemandLine::new("Client2", 200, 0.4),
            ],
        )])
    }

    #[test]
    fn splits_proportionally_and_realigns_to_lots() {
        let d = Distributor::with_defaults();
        let out = d.distribute(&abc_book(), &approvals([("ABC", 400)])).unwrap();
        assert_eq!(out["Client1"]["ABC"], 200);
        assert_eq!(out["Client2"]["ABC"], 200);
    }

    #[test]
    fn unapproved_symbol_allocates_nothing_but_client_is_listed() {
        let d = Distributor::with_defaults();
        let out = d.distribute(&abc_book(), &Approvals::new()).unwrap();
        assert!(out["Client1"].is_empty());
        assert!(out["Client2"].is_empty());
    }

    #[test]
    fn approval_for_unknown_symbol_is_ignored() {
        let d = Distributor::with_defaults();
        let out = d.distribute(&abc_book(), &approvals([("ZZZ", 500)])).unwrap();
        assert!(out["Client1"].is_empty());
        assert!(out["Client2"].is_empty());
    }

    #[test]
    fn full_request_passes_through_untouched() {
        let d = Distributor::with_defaults();
        let out = d.distribute(&abc_book(), &approvals([("ABC", 500)])).unwrap();
        assert_eq!(out["Client1"]["ABC"], 300);
        assert_eq!(out["Client2"]["ABC"], 200);
    }

    #[test]
    fn trigger_any_unsatisfied_realigns_even_without_clipping() {
        // 450 approved: rounded 270/180, nobody clipped, but neither client
        // is fully satisfied, so the historical trigger realigns.
        let d = Distributor::with_defaults();
        let out = d.distribute(&abc_book(), &approvals([("ABC", 450)])).unwrap();
        assert_eq!(out["Client1"]["ABC"], 250);
        assert_eq!(out["Client2"]["ABC"], 200);
    }

    #[test]
    fn trigger_cap_clipped_leaves_unclipped_symbols_alone() {
        let d = Distributor::new(DistributorOptions {
            trigger: ReallocationTrigger::CapClipped,
            recap_after_realign: false,
        });
        let out = d.distribute(&abc_book(), &approvals([("ABC", 450)])).unwrap();
        // Same input as above: without a clipped line the capped values stand.
        assert_eq!(out["Client1"]["ABC"], 270);
        assert_eq!(out["Client2"]["ABC"], 180);
    }

    fn skewed_book() -> DemandBook {
        // Shares deliberately out of line with requested quantities: the
        // engine trusts the share table it is handed.
        DemandBook::new(vec![SymbolDemand::new(
            "XYZ",
            100,
            vec![
                DemandLine::new("Big", 100, 0.75),
                DemandLine::new("Small", 300, 0.25),
            ],
        )])
    }

    #[test]
    fn realigned_winner_can_exceed_its_request_by_default() {
        // 200 approved: Big rounds to 150 (capped to 100), Small to 50.
        // Realignment lifts Big to 200, above its 100 request.
        let d = Distributor::with_defaults();
        let out = d.distribute(&skewed_book(), &approvals([("XYZ", 200)])).unwrap();
        assert_eq!(out["Big"]["XYZ"], 200);
        assert_eq!(out["Small"]["XYZ"], 0);
    }

    #[test]
    fn recap_after_realign_restores_request_cap() {
        let d = Distributor::new(DistributorOptions {
            trigger: ReallocationTrigger::AnyUnsatisfied,
            recap_after_realign: true,
        });
        let out = d.distribute(&skewed_book(), &approvals([("XYZ", 200)])).unwrap();
        assert_eq!(out["Big"]["XYZ"], 100);
        assert_eq!(out["Small"]["XYZ"], 0);
    }

    #[test]
    fn zero_lot_size_is_rejected() {
        let book = DemandBook::new(vec![SymbolDemand::new(
            "ABC",
            0,
            vec![DemandLine::new("Client1", 300, 1.0)],
        )]);
        let err = Distributor::with_defaults()
            .distribute(&book, &approvals([("ABC", 100)]))
            .unwrap_err();
        assert_eq!(
            err,
            DistributeError::ZeroLotSize {
                symbol: "ABC".to_string()
            }
        );
    }

    #[test]
    fn nan_share_is_rejected() {
        let book = DemandBook::new(vec![SymbolDemand::new(
            "ABC",
            100,
            vec![DemandLine::new("Client1", 300, f64::NAN)],
        )]);
        let err = Distributor::with_defaults()
            .distribute(&book, &approvals([("ABC", 100)]))
            .unwrap_err();
        assert_eq!(
            err,
            DistributeError::InvalidShare {
                symbol: "ABC".to_string(),
                client: "Client1".to_string()
            }
        );
    }

    #[test]
    fn lot_boundary_lines_keep_capped_values_during_realignment() {
        // .5/.3/.2 of 500 all land on lot boundaries, so realignment has
        // nothing to move (k = 0) and the capped values stand even though
        // the any-unsatisfied trigger fired.
        let book = DemandBook::new(vec![SymbolDemand::new(
            "DEF",
            100,
            vec![
                DemandLine::new("A", 400, 0.5),
                DemandLine::new("B", 300, 0.3),
                DemandLine::new("C", 200, 0.2),
            ],
        )]);
        let d = Distributor::with_defaults();
        let out = d.distribute(&book, &approvals([("DEF", 500)])).unwrap();
        assert_eq!(out["A"]["DEF"], 250);
        assert_eq!(out["B"]["DEF"], 150);
        assert_eq!(out["C"]["DEF"], 100);
    }

    #[test]
    fn distribution_error_display() {
        assert!(!DistributeError::ZeroLotSize {
            symbol: "X".into()
        }
        .to_string()
        .is_empty());
        assert!(DistributeError::DonorPoolExhausted {
            symbol: "X".into(),
            outstanding: 7
        }
        .to_string()
        .contains('7'));
    }
}
