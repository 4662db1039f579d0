//! Turning worker results into a verdict and a readable diagnostic listing

pub mod aggregate;
pub mod render;

pub use aggregate::{Aggregate, SeverityPolicy, Verdict, aggregate};
pub use render::{DiagnosticRenderer, report};
