//! Rounding primitives: half-down integer conversion and largest-remainder
//! realignment of allocations to lot-size multiples.
//!
//! `realign_to_lots` is the settlement half of a largest-remainder
//! (Hamilton) apportionment generalized from unit granularity to an
//! arbitrary lot size: the k largest remainders are rounded up first, then
//! exactly the amount added is collected back from the remaining lines so
//! the total is conserved.

use std::fmt;

// ─── Error ───────────────────────────────────────────────────────────────────

/// Errors produced during lot realignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RealignError {
    /// Lot size of zero would make every modulus undefined.
    ZeroLotSize,
    /// The donor pool ran out while `outstanding` units were still owed to
    /// the rounded-up lines. Indicates corrupt upstream data (shares or
    /// quantities violating the aggregator's invariants).
    DonorPoolExhausted { outstanding: u64 },
}

impl fmt::Display for RealignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealignError::ZeroLotSize => write!(f, "lot size must be > 0"),
            RealignError::DonorPoolExhausted { outstanding } => {
                write!(
                    f,
                    "donor pool exhausted with {outstanding} units still to collect"
                )
            }
        }
    }
}

impl std::error::Error for RealignError {}

// ─── Round half down ─────────────────────────────────────────────────────────

/// Round a non-negative `raw` value to an integer, rounding halves DOWN.
///
/// `floor(raw)`, plus one only when the fractional part strictly exceeds
/// 0.5. A fractional part of exactly 0.5 stays at the floor. This is the
/// desk's historical conversion rule, not standard round-half-up.
pub fn round_half_down(raw: f64) -> u64 {
    let floored = raw.floor();
    if raw - floored > 0.5 {
        floored as u64 + 1
    } else {
        floored as u64
    }
}

// ─── Lot realignment ─────────────────────────────────────────────────────────

/// A client's working quantity during lot realignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientUnits {
    pub client: String,
    pub units: u64,
}

impl ClientUnits {
    pub fn new<S: Into<String>>(client: S, units: u64) -> Self {
        Self {
            client: client.into(),
            units,
        }
    }
}

/// Realign `lines` so that as many as possible land on a `lot_size`
/// multiple, conserving the total across the adjusted lines.
///
/// 1. Lines already on a lot boundary do not participate.
/// 2. The rest are ordered by remainder descending; ties keep input order.
/// 3. `k = floor(sum of remainders / lot_size)`. `k == 0` means there is
///    nothing to redistribute: returns `Ok(None)`, caller keeps its values.
/// 4. The `k` largest-remainder lines are rounded up to the next lot
///    multiple; the amount added is collected back from the remaining
///    (donor) lines, lowest remainder first, in equal chunks, falling back
///    to single units round-robin when fewer units remain than donors.
///
/// Returns the adjusted lines (in remainder-descending order) or `None`
/// when no adjustment applies. A donor pool that empties while units are
/// still owed is reported as [`RealignError::DonorPoolExhausted`] instead
/// of an unchecked division by zero.
pub fn realign_to_lots(
    lines: &[ClientUnits],
    lot_size: u64,
) -> Result<Option<Vec<ClientUnits>>, RealignError> {
    if lot_size == 0 {
        return Err(RealignError::ZeroLotSize);
    }

    let mut held: Vec<ClientUnits> = lines
        .iter()
        .filter(|l| l.units % lot_size != 0)
        .cloned()
        .collect();
    // sort_by_key is stable: equal remainders keep input order.
    held.sort_by_key(|l| std::cmp::Reverse(l.units % lot_size));

    let total_remainder: u64 = held.iter().map(|l| l.units % lot_size).sum();
    let winners = (total_remainder / lot_size) as usize;
    if winners == 0 {
        return Ok(None);
    }

    // Round the winners up to the next lot boundary; tally what that costs.
    let mut grab: u64 = 0;
    for line in held.iter_mut().take(winners) {
        let topup = lot_size - line.units % lot_size;
        line.units += topup;
        grab += topup;
    }

    // Collect `grab` back from the donors, lowest remainder first.
    let mut emptied = 0usize;
    while grab > 0 {
        let live = held.len().saturating_sub(emptied + winners);
        if live == 0 {
            return Err(RealignError::DonorPoolExhausted { outstanding: grab });
        }
        let chunk = grab / live as u64;

        if chunk == 0 {
            // Fewer leftover units than donors: take one unit at a time,
            // round-robin from the lowest-remainder end.
            for i in 0..grab {
                let idx = winners + live - 1 - (i as usize % live);
                held[idx].units = held[idx]
                    .units
                    .checked_sub(1)
                    .ok_or(RealignError::DonorPoolExhausted { outstanding: grab - i })?;
            }
            grab = 0;
            break;
        }

        for idx in (winners..winners + live).rev() {
            let remainder = held[idx].units % lot_size;
            if remainder >= chunk {
                held[idx].units -= chunk;
                grab -= chunk;
                if held[idx].units % lot_size == 0 {
                    emptied += 1;
                }
            } else {
                // Donor cannot cover a full chunk: it gives its whole
                // remainder and the walk restarts with the donor count
                // recomputed.
                held[idx].units -= remainder;
                grab -= remainder;
                emptied += 1;
                break;
            }
        }
    }

    Ok(Some(held))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
