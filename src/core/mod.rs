//! Core business logic abstractions

pub mod config;
pub mod instrument;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use instrument::{Instrumented, LogSink, OperationMeta, wrap};
pub use rates::{FetchError, FetchRequest, RateResult, RatesProvider};
