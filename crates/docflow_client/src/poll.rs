use std::sync::Arc;
use std::time::Duration;

use client_logging::client_debug;
use tokio_util::sync::CancellationToken;

use crate::transport::DocumentApi;
use crate::{ClientError, PollObservation, StatusReport};

/// Default spacing between status fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Repeatedly fetches a job's status until a terminal state is observed.
///
/// One poller run per job id: callers must not start a second loop for
/// the same id while one is outstanding.
pub struct StatusPoller {
    api: Arc<dyn DocumentApi>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: Arc<dyn DocumentApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Fetch, deliver, wait, repeat. The wait sits strictly between
    /// observations so the request rate stays bounded. Resolves with the
    /// final report once `completed` or `failed` is observed; a `failed`
    /// status is a normal terminal observation, not an error.
    ///
    /// A failed fetch ends the loop immediately and surfaces unchanged;
    /// restarting is the caller's decision. Cancelling the token stops
    /// the loop at the next wait with `ClientError::Cancelled`.
    pub async fn run<F>(
        &self,
        document_id: &str,
        cancel: &CancellationToken,
        mut observe: F,
    ) -> Result<StatusReport, ClientError>
    where
        F: FnMut(PollObservation),
    {
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            let report = self.api.fetch_status(document_id).await?;
            client_debug!(
                "poll {}: status={:?} pages={} tables={}",
                document_id,
                report.status,
                report.page_count,
                report.table_count
            );
            let terminal = report.status.is_terminal();
            observe(PollObservation::from_report(&report));
            if terminal {
                return Ok(report);
            }
            // Sleep one interval, ending early only on cancellation.
            if tokio::time::timeout(self.interval, cancel.cancelled())
                .await
                .is_ok()
            {
                return Err(ClientError::Cancelled);
            }
        }
    }
}
