//! Aggregation Module
//!
//! Reduces the entries matched by a scan to a single value without shipping them to the
//! caller. Each partition task accumulates into its own aggregator instance; the partials are
//! then combined and the final value read once.
//!
//! ## Submodules
//! - **`aggregator`**: The `Aggregator` contract (`accumulate` / `combine` / `aggregate`).
//! - **`domain`**: Numeric domains: which value types are accepted and how they are summed.
//! - **`builtin`**: The single state machine behind every catalog aggregator.
//! - **`catalog`**: `Aggregators`, the named constructors (count, distinct, sum, avg, min, max).

pub mod aggregator;
pub mod builtin;
pub mod catalog;
pub mod domain;

pub use aggregator::Aggregator;
pub use catalog::Aggregators;

#[cfg(test)]
mod tests;
