use std::time::Duration;

use log::{ debug, info, warn };
use tokio::time::{ sleep, Instant };

use crate::error::Result;
use crate::service::{ ExecutionStatus, IndexerStatus, SearchService };

/// Poll interval and wall-clock budget of the indexer wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// The indexer reached success, transientFailure or error.
    Completed(IndexerStatus),
    /// The budget ran out first; `last` is the most recent status seen, if any.
    TimedOut {
        last: Option<IndexerStatus>,
    },
}

impl WaitOutcome {
    pub fn status(&self) -> Option<&IndexerStatus> {
        match self {
            WaitOutcome::Completed(status) => Some(status),
            WaitOutcome::TimedOut { last } => last.as_ref(),
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut { .. })
    }
}

/// Polls the indexer's last-run status until it is terminal or the policy's timeout elapses.
/// A timeout is not an error; per-item indexing errors are logged and returned, never raised.
/// A status request that itself fails is a service error and ends the wait with `Err`, so
/// the run stops and goes straight to cleanup.
pub async fn wait_for_indexer(
    service: &dyn SearchService,
    indexer_name: &str,
    policy: &WaitPolicy
) -> Result<WaitOutcome> {
    let deadline = Instant::now() + policy.timeout;

    info!("Waiting for indexer {} (timeout {:?})", indexer_name, policy.timeout);
    loop {
        let status = service.indexer_status(indexer_name).await?;
        debug!("Indexer {} status: {:?}", indexer_name, status.last_result);

        if status.last_result.is_terminal() {
            report_issues(indexer_name, &status);
            info!(
                "Indexer {} finished with {:?} ({} processed, {} failed)",
                indexer_name,
                status.last_result,
                status.items_processed,
                status.items_failed
            );
            return Ok(WaitOutcome::Completed(status));
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("Indexer {} did not finish within {:?}; fetching what is there", indexer_name, policy.timeout);
            return Ok(WaitOutcome::TimedOut { last: Some(status) });
        }
        sleep(policy.poll_interval.min(deadline - now)).await;
    }
}

fn report_issues(indexer_name: &str, status: &IndexerStatus) {
    if status.last_result == ExecutionStatus::Success && status.errors.is_empty() {
        return;
    }
    for issue in &status.errors {
        warn!(
            "Indexer {} item error{}: {}",
            indexer_name,
            issue.key.as_deref().map(|k| format!(" ({})", k)).unwrap_or_default(),
            issue.message
        );
    }
    for issue in &status.warnings {
        debug!("Indexer {} item warning: {}", indexer_name, issue.message);
    }
}
