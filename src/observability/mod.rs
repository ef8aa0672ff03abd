//! Observability subsystem
//!
//! Structured, deterministic JSON logging for schema loading and query
//! compilation.
//!
//! # Usage
//!
//! ```ignore
//! use relquery::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! Logger::trace("FILTER_JOIN_ADDED", &[("alias", "qwert"), ("table", "users")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
