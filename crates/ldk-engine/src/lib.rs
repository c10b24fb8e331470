//! ldk-engine
//!
//! Locate distribution engine:
//! - Proportional entitlement per client share of symbol demand
//! - Round-half-down integer conversion
//! - Per-client request cap
//! - Largest-remainder realignment to lot-size multiples
//! - Pure deterministic logic (no IO, no clock, no broker wiring)

mod distributor;
mod rounding;
mod types;

pub use distributor::{
    DistributeError, Distributor, DistributorOptions, ReallocationTrigger,
};
pub use rounding::{realign_to_lots, round_half_down, ClientUnits, RealignError};
pub use types::{
    approvals, AllocationBook, Approvals, DemandBook, DemandLine, SymbolDemand,
};
