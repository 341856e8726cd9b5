//! Task Execution Module
//!
//! Runs units of work on a bounded pool and lets them be cancelled, locally or across nodes.
//!
//! ## Architecture Overview
//! 1. **Pool**: `BoundedTaskPool` caps how many tasks run at once. Every pooled task carries a
//!    `CancellationToken`; the partition scan fan-out is built on it as well.
//! 2. **Submission**: `TaskService` accepts a named task under a submitter-chosen `TaskId` and
//!    runs it through the `TaskHandlerRegistry`.
//! 3. **Cancellation**: every task lives in a `TaskCell` whose state transitions are atomic, so
//!    a cancel racing with the start of the work has exactly one winner. A cancel that arrives
//!    before its submit is remembered and the late submit never runs.
//! 4. **Remote access**: `RemoteExecutorClient` drives another node's task endpoints over HTTP.
//!
//! ## Submodules
//! - **`pool`**: Bounded worker slots and cancellable pooled futures.
//! - **`task`**: Per-task state machine and the caller-side `RemoteTaskHandle`.
//! - **`service`**: Task bookkeeping by id, including early cancels.
//! - **`registry`**: Maps string identifiers (e.g., "sleep") to executable Rust code.
//! - **`protocol`**: Defines the HTTP API contracts for inter-node communication.
//! - **`client`**: HTTP client for a remote node's task API.

pub mod client;
pub mod handlers;
pub mod pool;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod task;
pub mod types;
