//! Wire models for the conversion backend. Every field tolerates being
//! missing or `null`; the backend has shipped several response shapes.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum JobStatus {
    #[default]
    Queued,
    Processing,
    Converting,
    Done,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Converting => "converting",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `GET /status/{job_id}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub done: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub estimated_duration: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_duration: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk_durations: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk_urls: Vec<Option<String>>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobSnapshot {
    /// An `error` field marks the job failed whatever `status` says.
    pub fn effective_status(&self) -> JobStatus {
        if self.error.is_some() {
            JobStatus::Error
        } else {
            self.status
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.effective_status().is_terminal()
    }
}

/// One entry of `GET /api/jobs/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: JobStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: usize,
    #[serde(default = "unplayed", deserialize_with = "null_as_unplayed")]
    pub last_played_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_duration: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobsResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<JobSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressRequest<'a> {
    pub conversion_id: &'a str,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameRequest<'a> {
    pub conversion_id: &'a str,
    pub title: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteRequest<'a> {
    pub conversion_id: &'a str,
}

/// Reply shape shared by rename and delete.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl MutationResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("ok")
    }

    pub fn error_message(&self) -> String {
        self.error.clone().unwrap_or_else(|| "Unknown".to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullAudioResponse {
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn unplayed() -> i64 {
    -1
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_unplayed<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(-1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_payload() {
        let snapshot: JobSnapshot = serde_json::from_str(
            r#"{
                "status": "processing",
                "done": 2,
                "total": 4,
                "progress": 0.5,
                "estimated_duration": 12.0,
                "total_duration": null,
                "chunk_durations": [1.5, 2.0, null, null],
                "chunk_urls": ["/static/jobs/j/part_0.wav", "/static/jobs/j/part_1.wav", null, null],
                "provider": "local"
            }"#,
        )
        .expect("valid payload");

        assert_eq!(snapshot.status, JobStatus::Processing);
        assert_eq!(snapshot.done, 2);
        assert_eq!(snapshot.total_duration, 0.0);
        assert_eq!(snapshot.chunk_durations, vec![Some(1.5), Some(2.0), None, None]);
        assert_eq!(snapshot.chunk_urls[2], None);
        assert!(!snapshot.is_terminal());
    }

    #[test]
    fn minimal_status_payload_uses_defaults() {
        let snapshot: JobSnapshot =
            serde_json::from_str(r#"{"status":"done","total":1,"done":1}"#).expect("valid");
        assert!(snapshot.chunk_urls.is_empty());
        assert!(snapshot.is_terminal());
    }

    #[test]
    fn error_field_forces_error_status() {
        let snapshot: JobSnapshot =
            serde_json::from_str(r#"{"error":"Unknown job ID"}"#).expect("valid");
        assert_eq!(snapshot.effective_status(), JobStatus::Error);
        assert!(snapshot.is_terminal());
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        let snapshot: JobSnapshot =
            serde_json::from_str(r#"{"status":"paused"}"#).expect("valid");
        assert_eq!(snapshot.status, JobStatus::Unknown);
        assert!(!snapshot.is_terminal());
    }

    #[test]
    fn job_summary_defaults_last_played_to_unplayed() {
        let jobs: JobsResponse = serde_json::from_str(
            r#"{"jobs":[
                {"id":"a","status":"queued","progress":0,"processed":0,"total":3},
                {"id":"b","status":"done","progress":1,"processed":3,"total":3,"last_played_index":null,"total_duration":9.5}
            ]}"#,
        )
        .expect("valid");
        assert_eq!(jobs.jobs[0].last_played_index, -1);
        assert_eq!(jobs.jobs[1].last_played_index, -1);
        assert_eq!(jobs.jobs[1].total_duration, 9.5);
    }

    #[test]
    fn mutation_response_reports_error_text() {
        let ok: MutationResponse = serde_json::from_str(r#"{"status":"ok"}"#).expect("valid");
        assert!(ok.is_ok());
        let failed: MutationResponse =
            serde_json::from_str(r#"{"error":"Missing data"}"#).expect("valid");
        assert!(!failed.is_ok());
        assert_eq!(failed.error_message(), "Missing data");
    }

    #[test]
    fn progress_request_matches_wire_names() {
        let body = serde_json::to_value(ProgressRequest {
            conversion_id: "j",
            index: 4,
        })
        .expect("serializes");
        assert_eq!(body, serde_json::json!({"conversion_id": "j", "index": 4}));
    }
}
