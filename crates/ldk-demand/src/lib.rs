//! ldk-demand
//!
//! Demand-side boundary for locate requests. This crate owns:
//! - CSV request ingestion with per-row validation (bad rows are dropped
//!   and counted, never fatal)
//! - Structural file failures as named error kinds (those ARE fatal)
//! - Aggregation into the engine's demand book: per-client requested
//!   quantities, per-symbol share tables, per-symbol lot sizes
//!
//! It does **not** run the distribution itself and never talks to the
//! approval side; callers hand the resulting [`ldk_engine::DemandBook`] to
//! the engine.

mod book;
mod parse;

pub use book::{build_book, demand_from_str, load_demand};
pub use parse::{
    parse_requests_file, parse_requests_str, DemandError, DropReason, DroppedRow, IngestReport,
    RequestRow, DEFAULT_LOT_SIZE,
};
