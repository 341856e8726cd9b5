//! Partition-Parallel Query Engine Library
//!
//! This library crate defines the core modules of the engine. It serves as the foundation
//! for the `queryd` binary (`main.rs`).
//!
//! ## Architecture Modules
//! - **`storage`**: Partitioned in-memory collections and the typed `Value` model. Exposes the
//!   single-partition scan primitive.
//! - **`query`**: Predicates, the fan-out scan executor (one pool task per partition under a
//!   shared deadline) and anchor-based paging of the merged result.
//! - **`aggregation`**: Mergeable aggregators (count, distinct, typed sum/avg/min/max) that
//!   run per partition and are combined afterwards.
//! - **`executor`**: The bounded worker pool plus cancellable tasks, locally and over HTTP.
//! - **`config`** / **`error`**: Engine settings and the shared error type.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod executor;
pub mod query;
pub mod storage;
