//! On-disk cache for downloaded chunk audio.
//!
//! Each job gets a directory named by a hash of its id; clips inside are named
//! by a hash of their resolved URL so query strings and odd path characters
//! never reach the filesystem.

use reqwest::Url;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

const DEFAULT_AUDIO_EXT: &str = "wav";

pub fn job_dir(cache_root: &Path, job_id: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(job_id.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    cache_root.join(hash)
}

pub fn chunk_audio_path(job_dir: &Path, url: &Url) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    job_dir.join(format!("tts-{hash}.{}", audio_extension(url)))
}

/// Extension of the URL's last path segment, kept so the decoder can sniff
/// the container from the file name.
fn audio_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_AUDIO_EXT.to_string())
}
