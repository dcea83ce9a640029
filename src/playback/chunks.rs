use tracing::{debug, trace};

/// One sentence of the job and whatever the backend has produced for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub audio_url: Option<String>,
    pub duration: Option<f64>,
}

/// Dense `0..N` list of chunks. Audio URLs and durations only ever get set,
/// never cleared.
#[derive(Debug, Clone, Default)]
pub struct ChunkList {
    chunks: Vec<Chunk>,
    total_chars: usize,
}

impl ChunkList {
    pub fn from_sentences(sentences: Vec<String>) -> Self {
        let chunks: Vec<Chunk> = sentences
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                index,
                text,
                audio_url: None,
                duration: None,
            })
            .collect();
        let total_chars = chunks.iter().map(|chunk| char_len(&chunk.text)).sum();
        Self {
            chunks,
            total_chars,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn url(&self, index: usize) -> Option<&str> {
        self.chunks
            .get(index)
            .and_then(|chunk| chunk.audio_url.as_deref())
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.url(index).is_some()
    }

    pub fn ready_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.audio_url.is_some())
            .count()
    }

    /// Record a chunk's audio URL. Returns `true` when the chunk had no URL
    /// before this call.
    pub fn merge_url(&mut self, index: usize, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        let Some(chunk) = self.chunks.get_mut(index) else {
            debug!(index, "Ignoring audio URL for chunk outside the text");
            return false;
        };
        let newly_ready = chunk.audio_url.is_none();
        if chunk.audio_url.as_deref() != Some(url) {
            trace!(index, url, "Recorded chunk audio URL");
            chunk.audio_url = Some(url.to_string());
        }
        newly_ready
    }

    /// Record an authoritative duration; non-positive values are ignored.
    pub fn merge_duration(&mut self, index: usize, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds <= 0.0 {
            return false;
        }
        let Some(chunk) = self.chunks.get_mut(index) else {
            return false;
        };
        let changed = chunk.duration != Some(seconds);
        chunk.duration = Some(seconds);
        changed
    }

    pub fn authoritative_duration(&self, index: usize) -> Option<f64> {
        self.chunks
            .get(index)
            .and_then(|chunk| chunk.duration)
            .filter(|secs| *secs > 0.0)
    }

    pub fn char_len(&self, index: usize) -> usize {
        self.chunks
            .get(index)
            .map(|chunk| char_len(&chunk.text))
            .unwrap_or(0)
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
