use crate::{
    types::{Diagnostic, Severity},
    worker::{WorkerOutput, WorkerResult},
};
use serde::{Deserialize, Serialize};

/// Escalation and de-escalation applied to every diagnostic alike
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeverityPolicy {
    /// Warnings count toward failure
    #[serde(default)]
    pub warnings_as_errors: bool,
    /// Nothing fails the build; diagnostics are still reported as they are
    #[serde(default)]
    pub errors_as_warnings: bool,
}

impl SeverityPolicy {
    pub fn counts_as_error(&self, severity: Severity) -> bool {
        match severity {
            Severity::Error => true,
            Severity::Warning => self.warnings_as_errors,
            Severity::Info => false,
        }
    }
}

/// Pass/fail decision for a whole batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verdict {
    /// Diagnostics that count as errors under the policy
    pub error_count: usize,
    /// Workers that exited with a nonzero code
    pub failed_workers: usize,
    /// Sum of all worker exit codes
    pub exit_code_sum: i64,
    pub passed: bool,
}

impl Verdict {
    pub fn errors_found(&self) -> bool {
        self.error_count > 0 || self.failed_workers > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub verdict: Verdict,
    /// All diagnostics, by module and then by position
    pub diagnostics: Vec<Diagnostic>,
}

/// Combines the results of every worker of a batch.
///
/// Results are taken in worker creation order, so diagnostics at the same
/// position keep the order their workers were started in.
pub fn aggregate(results: &[WorkerResult], policy: SeverityPolicy) -> Aggregate {
    let mut verdict = Verdict::default();
    let mut diagnostics = Vec::new();

    for result in results {
        match &result.output {
            WorkerOutput::Exit { code, .. } => {
                verdict.exit_code_sum += i64::from(*code);
                if *code != 0 {
                    verdict.failed_workers += 1;
                }
            }
            WorkerOutput::Messages(messages) => {
                verdict.error_count += messages
                    .iter()
                    .filter(|d| policy.counts_as_error(d.severity))
                    .count();
                diagnostics.extend(messages.iter().cloned());
            }
        }
    }

    diagnostics.sort_by(Diagnostic::report_order);
    verdict.passed = policy.errors_as_warnings || !verdict.errors_found();

    Aggregate {
        verdict,
        diagnostics,
    }
}
