//! Job list shown next to the viewer: conversion and playback progress per
//! job plus the rename/delete actions with local rollback.

use crate::api::{JobStatus, JobSummary};
use crate::timeline::format_duration;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum SidebarStatus {
    Completed { duration_secs: f64 },
    Remaining { secs: f64 },
    InProgress {
        status: JobStatus,
        processed: usize,
        total: usize,
    },
}

impl SidebarStatus {
    pub fn text(&self) -> String {
        match self {
            SidebarStatus::Completed { duration_secs } => {
                format!("Completed · {}", format_duration(*duration_secs))
            }
            SidebarStatus::Remaining { secs } => {
                format!("{} remaining", format_duration(*secs))
            }
            SidebarStatus::InProgress {
                status,
                processed,
                total,
            } => format!("{status} {processed}/{total}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SidebarItem {
    pub id: String,
    pub title: String,
    pub status: SidebarStatus,
    pub fully_played: bool,
    /// Shown only while the backend is still converting.
    pub conversion_pct: Option<f64>,
    /// Shown once something was played and until the job is fully played.
    pub playback_pct: Option<f64>,
}

pub fn is_fully_played(job: &JobSummary) -> bool {
    job.total > 0 && job.last_played_index >= job.total as i64 - 1
}

pub fn sidebar_item(job: &JobSummary, title: &str) -> SidebarItem {
    let fully_played = is_fully_played(job);
    let total = job.total as f64;

    let status = if fully_played {
        SidebarStatus::Completed {
            duration_secs: job.total_duration,
        }
    } else if job.status != JobStatus::Done {
        SidebarStatus::InProgress {
            status: job.status,
            processed: job.processed,
            total: job.total,
        }
    } else {
        let left = (job.total as i64 - (job.last_played_index + 1)).max(0) as f64;
        let per_chunk = if job.total > 0 {
            job.total_duration / total
        } else {
            0.0
        };
        SidebarStatus::Remaining {
            secs: left * per_chunk,
        }
    };

    let playback_pct = if job.total > 0 {
        Some(((job.last_played_index + 1) as f64 / total * 100.0).clamp(0.0, 100.0))
    } else {
        None
    }
    .filter(|pct| !fully_played && *pct > 0.0);

    let conversion_pct =
        (job.status != JobStatus::Done).then(|| (job.progress * 100.0).clamp(0.0, 100.0));

    SidebarItem {
        id: job.id.clone(),
        title: title.to_string(),
        status,
        fully_played,
        conversion_pct,
        playback_pct,
    }
}

#[derive(Debug, Clone)]
struct Entry {
    job: JobSummary,
    title: String,
}

/// Entry taken out by an optimistic delete; hand it back to
/// [`Sidebar::restore`] if the backend refuses.
#[derive(Debug, Clone)]
pub struct RemovedJob {
    position: usize,
    entry: Entry,
}

#[derive(Debug, Clone, Default)]
pub struct Sidebar {
    entries: Vec<Entry>,
    /// Jobs removed locally whose delete the backend has not answered yet.
    deleting: HashSet<String>,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn items(&self) -> Vec<SidebarItem> {
        self.entries
            .iter()
            .map(|entry| sidebar_item(&entry.job, &entry.title))
            .collect()
    }

    pub fn item(&self, id: &str) -> Option<SidebarItem> {
        self.position(id)
            .map(|idx| sidebar_item(&self.entries[idx].job, &self.entries[idx].title))
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.position(id).map(|idx| self.entries[idx].title.as_str())
    }

    /// Merge the backend's active-job list. Jobs that dropped out of it have
    /// finished converting and are shown as done.
    pub fn apply_active_jobs(&mut self, jobs: Vec<JobSummary>) {
        let jobs: Vec<JobSummary> = jobs
            .into_iter()
            .filter(|job| !self.deleting.contains(&job.id))
            .collect();
        for entry in &mut self.entries {
            if entry.job.status != JobStatus::Done
                && !jobs.iter().any(|job| job.id == entry.job.id)
            {
                debug!(job_id = %entry.job.id, "Job left the active list; marking done");
                entry.job.status = JobStatus::Done;
                entry.job.progress = 1.0;
                entry.job.processed = entry.job.total;
            }
        }
        for job in jobs {
            match self.position(&job.id) {
                Some(idx) => self.entries[idx].job = job,
                None => {
                    let title = job.id.clone();
                    self.entries.push(Entry { job, title });
                }
            }
        }
    }

    /// Apply a rename locally. Returns the previous title for rollback.
    pub fn rename_optimistic(&mut self, id: &str, title: &str) -> Option<String> {
        let idx = self.position(id)?;
        let previous = std::mem::replace(&mut self.entries[idx].title, title.to_string());
        Some(previous)
    }

    pub fn rollback_rename(&mut self, id: &str, previous: String) {
        if let Some(idx) = self.position(id) {
            debug!(job_id = id, title = %previous, "Rolling back rename");
            self.entries[idx].title = previous;
        }
    }

    /// Take a job out ahead of the backend delete. Polls keep it hidden
    /// until [`Sidebar::finish_delete`] or [`Sidebar::restore`].
    pub fn remove(&mut self, id: &str) -> Option<RemovedJob> {
        self.deleting.insert(id.to_string());
        let position = self.position(id)?;
        let entry = self.entries.remove(position);
        Some(RemovedJob { position, entry })
    }

    pub fn finish_delete(&mut self, id: &str) {
        self.deleting.remove(id);
    }

    pub fn restore(&mut self, removed: RemovedJob) {
        self.deleting.remove(&removed.entry.job.id);
        if self.position(&removed.entry.job.id).is_some() {
            return;
        }
        debug!(job_id = %removed.entry.job.id, "Restoring deleted job");
        let position = removed.position.min(self.entries.len());
        self.entries.insert(position, removed.entry);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.job.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, status: JobStatus, total: usize, last: i64) -> JobSummary {
        JobSummary {
            id: id.to_string(),
            status,
            progress: 0.5,
            processed: total / 2,
            total,
            last_played_index: last,
            total_duration: 40.0,
        }
    }

    #[test]
    fn last_chunk_played_means_completed() {
        let item = sidebar_item(&job("a", JobStatus::Done, 4, 3), "A");
        assert!(item.fully_played);
        assert_eq!(item.status, SidebarStatus::Completed { duration_secs: 40.0 });
        assert_eq!(item.playback_pct, None);
        assert_eq!(item.conversion_pct, None);
    }

    #[test]
    fn partially_played_job_shows_remaining_time() {
        let item = sidebar_item(&job("a", JobStatus::Done, 4, 1), "A");
        assert!(!item.fully_played);
        assert_eq!(item.status, SidebarStatus::Remaining { secs: 20.0 });
        assert_eq!(item.playback_pct, Some(50.0));
        assert_eq!(item.status.text(), "20s remaining");
    }

    #[test]
    fn unplayed_job_has_no_playback_bar() {
        let item = sidebar_item(&job("a", JobStatus::Done, 4, -1), "A");
        assert_eq!(item.playback_pct, None);
    }

    #[test]
    fn converting_job_shows_conversion_bar() {
        let item = sidebar_item(&job("a", JobStatus::Processing, 4, -1), "A");
        assert_eq!(item.conversion_pct, Some(50.0));
        assert_eq!(item.status.text(), "processing 2/4");
    }

    #[test]
    fn empty_job_is_never_completed() {
        assert!(!is_fully_played(&job("a", JobStatus::Done, 0, 5)));
    }

    #[test]
    fn jobs_leaving_active_list_become_done() {
        let mut sidebar = Sidebar::new();
        sidebar.apply_active_jobs(vec![
            job("a", JobStatus::Processing, 4, -1),
            job("b", JobStatus::Queued, 2, -1),
        ]);
        sidebar.apply_active_jobs(vec![job("b", JobStatus::Processing, 2, -1)]);

        let a = sidebar.item("a").expect("kept");
        assert_eq!(a.conversion_pct, None);
        assert!(matches!(a.status, SidebarStatus::Remaining { .. }));
        assert!(sidebar.item("b").expect("kept").conversion_pct.is_some());
    }

    #[test]
    fn fully_played_job_is_completed_while_still_converting() {
        let item = sidebar_item(&job("a", JobStatus::Processing, 4, 3), "A");
        assert_eq!(item.status, SidebarStatus::Completed { duration_secs: 40.0 });
        assert_eq!(item.playback_pct, None);
        assert_eq!(item.conversion_pct, Some(50.0));
    }

    #[test]
    fn pending_delete_is_not_brought_back_by_polls() {
        let mut sidebar = Sidebar::new();
        sidebar.apply_active_jobs(vec![
            job("a", JobStatus::Processing, 4, -1),
            job("b", JobStatus::Processing, 2, -1),
        ]);
        sidebar.remove("a").expect("known job");

        sidebar.apply_active_jobs(vec![
            job("a", JobStatus::Processing, 4, -1),
            job("b", JobStatus::Processing, 2, -1),
        ]);
        sidebar.apply_active_jobs(vec![job("b", JobStatus::Processing, 2, -1)]);
        sidebar.finish_delete("a");
        sidebar.apply_active_jobs(vec![job("b", JobStatus::Processing, 2, -1)]);

        let ids: Vec<String> = sidebar.items().into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn restored_job_is_polled_again() {
        let mut sidebar = Sidebar::new();
        sidebar.apply_active_jobs(vec![job("a", JobStatus::Processing, 4, -1)]);
        let removed = sidebar.remove("a").expect("known job");
        sidebar.restore(removed);

        let mut update = job("a", JobStatus::Processing, 4, -1);
        update.processed = 3;
        sidebar.apply_active_jobs(vec![update]);
        assert_eq!(
            sidebar.item("a").expect("restored").status.text(),
            "processing 3/4"
        );
    }

    #[test]
    fn failed_rename_rolls_back() {
        let mut sidebar = Sidebar::new();
        sidebar.apply_active_jobs(vec![job("a", JobStatus::Processing, 4, -1)]);
        let previous = sidebar.rename_optimistic("a", "New title").expect("known job");
        assert_eq!(sidebar.title("a"), Some("New title"));

        sidebar.rollback_rename("a", previous);
        assert_eq!(sidebar.title("a"), Some("a"));
    }

    #[test]
    fn failed_delete_restores_position() {
        let mut sidebar = Sidebar::new();
        sidebar.apply_active_jobs(vec![
            job("a", JobStatus::Processing, 4, -1),
            job("b", JobStatus::Processing, 4, -1),
            job("c", JobStatus::Processing, 4, -1),
        ]);
        let removed = sidebar.remove("b").expect("known job");
        assert_eq!(sidebar.len(), 2);

        sidebar.restore(removed);
        let ids: Vec<String> = sidebar.items().into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
