//! rascal-build - parallel, resource-aware checking and compiling of Rascal projects
//!
//! This crate provides functionality to:
//! - Find stale modules and split them over as many workers as the host can carry
//! - Run the checker as child processes or as pooled in-process evaluators
//! - Merge the private outputs of every worker and report one sorted diagnostic listing
pub mod command;
pub mod config;
pub mod error;
pub mod goals;
pub mod libraries;
pub mod merge;
pub mod orchestrator;
pub mod partition;
pub mod report;
pub mod resources;
pub mod scanner;
pub mod types;
pub mod worker;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use types::*;

// Re-export main API components
pub use command::{CommandBuilder, CompilerCommand, Launcher};
pub use config::Config;
pub use goals::{Goal, GoalContext, GoalOutcome};
pub use orchestrator::{Batch, BatchOutcome, Orchestrator, OrchestratorOptions};
pub use report::{SeverityPolicy, Verdict};
pub use resources::ResourceEstimator;
pub use worker::{EvaluatorInvoker, ProcessInvoker, WorkerInvoker};
