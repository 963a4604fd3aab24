//! Database access for the monitor. Callers work with `CheckRecord` and the
//! `CheckRepository` seam rather than with SQL or entities directly.

pub mod check_service;

pub use check_service::*;
