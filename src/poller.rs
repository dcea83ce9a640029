//! Background status polling. Each poller runs on its own thread and hands
//! results to the runtime through a delivery callback.

use crate::api::{JobSnapshot, JobSource, JobSummary};
use crate::cancellation::CancellationToken;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    Job(JobSnapshot),
    Jobs(Vec<JobSummary>),
}

/// Poll one job until it reaches a terminal status, the token is cancelled,
/// or `deliver` returns `false`.
///
/// Transport failures are logged and the next tick proceeds.
pub fn run_job_poller<S, F>(
    source: &S,
    job_id: &str,
    interval: Duration,
    cancel: &CancellationToken,
    mut deliver: F,
) where
    S: JobSource + ?Sized,
    F: FnMut(PollUpdate) -> bool,
{
    info!(job_id, interval_ms = interval.as_millis() as u64, "Job poller started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match source.job_status(job_id) {
            Ok(snapshot) => {
                let terminal = snapshot.is_terminal();
                let status = snapshot.effective_status();
                if !deliver(PollUpdate::Job(snapshot)) {
                    break;
                }
                if terminal {
                    info!(job_id, %status, "Job reached terminal status; polling stopped");
                    break;
                }
            }
            Err(err) => warn!(job_id, "Job status poll failed: {err:#}"),
        }
        if !cancel.sleep(interval) {
            break;
        }
    }
    debug!(job_id, "Job poller exited");
}

/// Poll the active job list for as long as the token is live.
pub fn run_sidebar_poller<S, F>(
    source: &S,
    interval: Duration,
    cancel: &CancellationToken,
    mut deliver: F,
) where
    S: JobSource + ?Sized,
    F: FnMut(PollUpdate) -> bool,
{
    debug!(interval_ms = interval.as_millis() as u64, "Sidebar poller started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        match source.jobs_status() {
            Ok(jobs) => {
                if !deliver(PollUpdate::Jobs(jobs)) {
                    break;
                }
            }
            Err(err) => debug!("Job list poll failed: {err:#}"),
        }
        if !cancel.sleep(interval) {
            break;
        }
    }
    debug!("Sidebar poller exited");
}

pub fn spawn_job_poller<S, F>(
    source: S,
    job_id: String,
    interval: Duration,
    cancel: CancellationToken,
    deliver: F,
) -> JoinHandle<()>
where
    S: JobSource + Send + 'static,
    F: FnMut(PollUpdate) -> bool + Send + 'static,
{
    thread::spawn(move || run_job_poller(&source, &job_id, interval, &cancel, deliver))
}

pub fn spawn_sidebar_poller<S, F>(
    source: S,
    interval: Duration,
    cancel: CancellationToken,
    deliver: F,
) -> JoinHandle<()>
where
    S: JobSource + Send + 'static,
    F: FnMut(PollUpdate) -> bool + Send + 'static,
{
    thread::spawn(move || run_sidebar_poller(&source, interval, &cancel, deliver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use anyhow::{Result, anyhow};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedSource {
        replies: RefCell<VecDeque<Result<JobSnapshot>>>,
        job_lists: RefCell<VecDeque<Result<Vec<JobSummary>>>>,
        calls: RefCell<usize>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<JobSnapshot>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                job_lists: RefCell::new(VecDeque::new()),
                calls: RefCell::new(0),
            }
        }

        fn with_job_lists(job_lists: Vec<Result<Vec<JobSummary>>>) -> Self {
            Self {
                replies: RefCell::new(VecDeque::new()),
                job_lists: RefCell::new(job_lists.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl JobSource for ScriptedSource {
        fn job_status(&self, _job_id: &str) -> Result<JobSnapshot> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }

        fn jobs_status(&self) -> Result<Vec<JobSummary>> {
            *self.calls.borrow_mut() += 1;
            self.job_lists
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn snapshot(status: JobStatus) -> JobSnapshot {
        JobSnapshot {
            status,
            ..JobSnapshot::default()
        }
    }

    #[test]
    fn stops_after_done() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(JobStatus::Processing)),
            Ok(snapshot(JobStatus::Done)),
            Ok(snapshot(JobStatus::Done)),
        ]);
        let mut seen = Vec::new();
        run_job_poller(
            &source,
            "j",
            Duration::from_millis(1),
            &CancellationToken::new(),
            |update| {
                seen.push(update);
                true
            },
        );
        assert_eq!(seen.len(), 2);
        assert_eq!(*source.calls.borrow(), 2);
    }

    #[test]
    fn transport_errors_do_not_stop_polling() {
        let source = ScriptedSource::new(vec![
            Err(anyhow!("timeout")),
            Ok(snapshot(JobStatus::Error)),
        ]);
        let mut seen = Vec::new();
        run_job_poller(
            &source,
            "j",
            Duration::from_millis(1),
            &CancellationToken::new(),
            |update| {
                seen.push(update);
                true
            },
        );
        assert_eq!(seen, vec![PollUpdate::Job(snapshot(JobStatus::Error))]);
    }

    #[test]
    fn receiver_gone_stops_polling() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(JobStatus::Processing)),
            Ok(snapshot(JobStatus::Processing)),
        ]);
        run_job_poller(
            &source,
            "j",
            Duration::from_millis(1),
            &CancellationToken::new(),
            |_| false,
        );
        assert_eq!(*source.calls.borrow(), 1);
    }

    #[test]
    fn sidebar_poller_swallows_failures() {
        let source = ScriptedSource::with_job_lists(vec![
            Err(anyhow!("connection refused")),
            Ok(Vec::new()),
        ]);
        let mut delivered = 0;
        run_sidebar_poller(
            &source,
            Duration::from_millis(1),
            &CancellationToken::new(),
            |_| {
                delivered += 1;
                false
            },
        );
        assert_eq!(delivered, 1);
        assert_eq!(*source.calls.borrow(), 2);
    }

    #[test]
    fn cancelled_pollers_do_not_request() {
        let source = ScriptedSource::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_sidebar_poller(&source, Duration::from_millis(1), &cancel, |_| true);
        run_job_poller(&source, "j", Duration::from_millis(1), &cancel, |_| true);
        assert_eq!(*source.calls.borrow(), 0);
    }
}
