//! Estate planning core for will drafting.
//!
//! The `planning` module carries the domain logic: asset allocation
//! aggregation, inheritance rule validation, and the service facade the HTTP
//! layer exposes. `config`, `telemetry`, and `error` hold the shared
//! application plumbing.

pub mod config;
pub mod error;
pub mod planning;
pub mod telemetry;
