//! Round-trip latency benchmark for the rendezvous channel in `common`.
//!
//! A server thread pinned to its own core answers every call with the time it
//! received it; the client measures how long each call took to reach the
//! server and how many cycles the whole round trip cost.

pub mod affinity;
pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod runtime;
pub mod server;

pub use config::{BenchConfig, RetryPolicy};
pub use error::BenchError;
pub use report::{Accumulator, Report};
pub use runtime::BenchContext;
