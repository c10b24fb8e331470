//! ldk-approval
//!
//! Approval boundary for locate allocation. This crate defines **only** the
//! approval-source contract and its two stock implementations:
//! - [`FixedApprovals`]: a fixed symbol -> quantity mapping (production runs
//!   driven from an approvals file, and tests)
//! - [`SimulatedDesk`]: a seedable stand-in for the upstream approval desk
//!
//! No CSV logic, no distribution logic. The engine never sees which
//! implementation produced its approvals.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors an [`ApprovalSource`] implementation may return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApprovalError {
    /// The approvals payload could not be read.
    Io(String),
    /// The approvals payload could not be decoded.
    Decode(String),
}

impl fmt::Display for ApprovalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalError::Io(msg) => write!(f, "approvals io error: {msg}"),
            ApprovalError::Decode(msg) => write!(f, "approvals decode error: {msg}"),
        }
    }
}

impl std::error::Error for ApprovalError {}

// ---------------------------------------------------------------------------
// ApprovalSource trait
// ---------------------------------------------------------------------------

/// Upstream approval decision contract.
///
/// `requested` maps each symbol to its aggregate requested quantity. The
/// returned map carries an entry per approved symbol; symbols without an
/// entry received no approval at all. Implementations must be object-safe
/// (callers hold `Box<dyn ApprovalSource>`) and `Send + Sync`.
pub trait ApprovalSource: Send + Sync {
    /// Human-readable name identifying this source (e.g. `"fixed"`).
    fn name(&self) -> &'static str;

    /// Decide the approved total per symbol.
    fn approve(
        &self,
        requested: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, u64>, ApprovalError>;
}

// ---------------------------------------------------------------------------
// FixedApprovals
// ---------------------------------------------------------------------------

/// Approval source backed by a fixed mapping.
///
/// Only symbols actually requested are echoed back; extra entries in the
/// mapping are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedApprovals {
    map: BTreeMap<String, u64>,
}

impl FixedApprovals {
    pub fn new(map: BTreeMap<String, u64>) -> Self {
        Self { map }
    }

    /// Load a JSON object file of the form `{"ABC": 400, "QQQ": 80}`.
    pub fn from_json_path(path: &Path) -> Result<Self, ApprovalError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ApprovalError::Io(format!("read '{}': {e}", path.display())))?;
        let map: BTreeMap<String, u64> = serde_json::from_str(&content)
            .map_err(|e| ApprovalError::Decode(format!("'{}': {e}", path.display())))?;
        Ok(Self { map })
    }
}

impl ApprovalSource for FixedApprovals {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn approve(
        &self,
        requested: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, u64>, ApprovalError> {
        let mut approved = BTreeMap::new();
        for symbol in requested.keys() {
            if let Some(&qty) = self.map.get(symbol) {
                approved.insert(symbol.clone(), qty);
            }
        }
        Ok(approved)
    }
}

// ---------------------------------------------------------------------------
// SimulatedDesk
// ---------------------------------------------------------------------------

/// Stand-in for the upstream approval desk.
///
/// Each symbol is approved with probability `approve_probability`; an
/// approved symbol receives a uniform fraction in [0.5, 1.0] of
/// `min(requested, max_per_symbol)`, truncated to whole locates. With a
/// `seed` the decision sequence is fully deterministic, which is what tests
/// and replayable demo runs want; without one the desk draws from OS
/// entropy.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedDesk {
    pub approve_probability: f64,
    pub max_per_symbol: u64,
    pub seed: Option<u64>,
}

impl SimulatedDesk {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

impl Default for SimulatedDesk {
    fn default() -> Self {
        Self {
            approve_probability: 0.7,
            max_per_symbol: 1000,
            seed: None,
        }
    }
}

impl ApprovalSource for SimulatedDesk {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn approve(
        &self,
        requested: &BTreeMap<String, u64>,
    ) -> Result<BTreeMap<String, u64>, ApprovalError> {
        let mut rng: StdRng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut approved = BTreeMap::new();
        for (symbol, &req) in requested {
            if rng.gen::<f64>() < self.approve_probability {
                let cap = req.min(self.max_per_symbol);
                let fraction: f64 = rng.gen_range(0.5..=1.0);
                approved.insert(symbol.clone(), (cap as f64 * fraction) as u64);
            }
        }
        Ok(approved)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
