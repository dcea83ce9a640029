use super::models::{
    DeleteRequest, FullAudioResponse, JobSnapshot, JobSummary, JobsResponse, MutationResponse,
    ProgressRequest, RenameRequest,
};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use reqwest::blocking::Client;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Blocking client for the conversion backend. Cheap to clone; clones share
/// the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base =
            Url::parse(base_url).with_context(|| format!("Invalid server URL {base_url}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Building HTTP client")?;
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a backend path or chunk URL the way a browser resolves it
    /// against the page origin.
    pub fn resolve(&self, path_or_url: &str) -> Result<Url> {
        self.base
            .join(path_or_url)
            .with_context(|| format!("Resolving {path_or_url} against {}", self.base))
    }

    fn endpoint(&self, relative: &str) -> Result<Url> {
        self.resolve(relative.trim_start_matches('/'))
    }

    pub fn job_status(&self, job_id: &str) -> Result<JobSnapshot> {
        let url = self.endpoint(&format!("status/{job_id}"))?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        let body = response.text().context("Reading job status body")?;
        match serde_json::from_str::<JobSnapshot>(&body) {
            Ok(snapshot) if status.is_success() || snapshot.error.is_some() => Ok(snapshot),
            Ok(_) => bail!("GET {url} returned {status}"),
            Err(err) if status.is_success() => {
                Err(anyhow!(err).context(format!("Decoding job status from {url}")))
            }
            Err(_) => bail!("GET {url} returned {status}"),
        }
    }

    pub fn jobs_status(&self) -> Result<Vec<JobSummary>> {
        let url = self.endpoint("api/jobs/status")?;
        let response = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        let jobs: JobsResponse = response.json().context("Decoding job list")?;
        Ok(jobs.jobs)
    }

    pub fn save_progress(&self, job_id: &str, index: usize) -> Result<()> {
        let url = self.endpoint("api/progress")?;
        self.http
            .post(url.clone())
            .json(&ProgressRequest {
                conversion_id: job_id,
                index,
            })
            .send()
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url}"))?;
        debug!(job_id, index, "Saved playback progress");
        Ok(())
    }

    /// Ask the backend to build (or locate) the concatenated audio file.
    pub fn generate_full(&self, job_id: &str) -> Result<String> {
        let url = self.endpoint(&format!("generate_full/{job_id}"))?;
        let response = self
            .http
            .post(url.clone())
            .send()
            .with_context(|| format!("POST {url}"))?;
        let status = response.status();
        let body: FullAudioResponse = response
            .json()
            .with_context(|| format!("Decoding full audio reply ({status})"))?;
        match (body.audio_url, body.error) {
            (Some(audio_url), _) if status.is_success() => {
                info!(job_id, %audio_url, "Full audio available");
                Ok(audio_url)
            }
            (_, Some(error)) => bail!("Full audio generation failed: {error}"),
            _ => bail!("Full audio generation returned {status} without a URL"),
        }
    }

    pub fn rename(&self, job_id: &str, title: &str) -> Result<()> {
        let url = self.endpoint("api/rename")?;
        let reply = self.post_mutation(
            &url,
            &RenameRequest {
                conversion_id: job_id,
                title,
            },
        )?;
        if !reply.is_ok() {
            bail!("{}", reply.error_message());
        }
        info!(job_id, title, "Renamed conversion");
        Ok(())
    }

    pub fn delete(&self, job_id: &str) -> Result<()> {
        let url = self.endpoint("api/delete")?;
        let reply = self.post_mutation(
            &url,
            &DeleteRequest {
                conversion_id: job_id,
            },
        )?;
        if !reply.is_ok() {
            bail!("{}", reply.error_message());
        }
        info!(job_id, "Deleted conversion");
        Ok(())
    }

    fn post_mutation<T: serde::Serialize>(&self, url: &Url, body: &T) -> Result<MutationResponse> {
        let response = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .with_context(|| format!("POST {url}"))?;
        // Error replies still carry a JSON body with the reason.
        response
            .json::<MutationResponse>()
            .with_context(|| format!("Decoding reply from {url}"))
    }

    /// Download `url` to `dest`, writing through a temporary file so a
    /// partial download never looks like a cached clip.
    pub fn download(&self, url: &Url, dest: &Path) -> Result<()> {
        let bytes = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?
            .bytes()
            .with_context(|| format!("Reading body of {url}"))?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).context("Creating audio cache directory")?;
        }
        let partial = dest.with_extension("part");
        {
            let mut file = fs::File::create(&partial)
                .with_context(|| format!("Creating {}", partial.display()))?;
            file.write_all(&bytes).context("Writing downloaded audio")?;
        }
        fs::rename(&partial, dest).with_context(|| format!("Moving audio to {}", dest.display()))?;
        debug!(%url, path = %dest.display(), bytes = bytes.len(), "Downloaded chunk audio");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiClient;
    use std::time::Duration;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(1)).expect("valid base")
    }

    #[test]
    fn absolute_chunk_paths_resolve_against_origin() {
        let api = client("http://127.0.0.1:5000");
        let url = api.resolve("/static/jobs/j/part_0.wav").expect("resolves");
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/static/jobs/j/part_0.wav");
    }

    #[test]
    fn endpoints_keep_base_path_prefix() {
        let api = client("http://host/tts");
        assert_eq!(api.base_url().as_str(), "http://host/tts/");
        let url = api.endpoint("/api/jobs/status").expect("resolves");
        assert_eq!(url.as_str(), "http://host/tts/api/jobs/status");
    }

    #[test]
    fn full_urls_pass_through() {
        let api = client("http://host");
        let url = api.resolve("https://cdn.example/a.wav").expect("resolves");
        assert_eq!(url.as_str(), "https://cdn.example/a.wav");
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    }
}
