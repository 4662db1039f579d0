use super::CancellationToken;
use crate::types::Location;
use tracing::{info, warn};

/// Progress callbacks an embedded evaluator reports through
pub trait Monitor: Send + Sync {
    fn job_start(&self, name: &str, work_share: usize, _total_work: usize) {
        self.job_step(name, "", work_share);
    }

    fn job_step(&self, name: &str, message: &str, work_share: usize);

    fn job_end(&self, _name: &str, _succeeded: bool) -> usize {
        0
    }

    fn job_todo(&self, _name: &str, _work: usize) {}

    fn job_is_cancelled(&self, _name: &str) -> bool {
        false
    }

    fn warning(&self, message: &str, location: &Location);

    fn end_all_jobs(&self) {}
}

/// Writes progress to the log; job steps only when `chatty`
#[derive(Debug, Clone, Default)]
pub struct LogMonitor {
    chatty: bool,
    cancel: Option<CancellationToken>,
}

impl LogMonitor {
    pub fn new(chatty: bool) -> Self {
        Self {
            chatty,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl Monitor for LogMonitor {
    fn job_step(&self, name: &str, message: &str, _work_share: usize) {
        if self.chatty {
            info!("{}:{}", name, message);
        }
    }

    fn job_is_cancelled(&self, _name: &str) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn warning(&self, message: &str, location: &Location) {
        warn!("{}: {}", location.path.display(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_visible_to_evaluator() {
        let token = CancellationToken::new();
        let monitor = LogMonitor::new(false).with_cancellation(token.clone());

        assert!(!monitor.job_is_cancelled("checking"));
        token.cancel();
        assert!(monitor.job_is_cancelled("checking"));
        assert!(!LogMonitor::new(true).job_is_cancelled("checking"));
    }
}
