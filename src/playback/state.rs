use crate::api::JobStatus;
use crate::timeline::DurationDisplay;
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PlaybackState {
    /// No audio loaded.
    #[default]
    Idle,
    /// Source handed to the output, waiting for it to start.
    Loading,
    Playing,
    Paused,
    /// The cursor sits on a chunk whose audio the backend has not produced.
    Buffering,
}

impl PlaybackState {
    /// Whether the output is (or is about to be) audibly running.
    pub fn is_running(self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing)
    }

    /// Label for the play/pause control.
    pub fn control_label(self) -> &'static str {
        match self {
            PlaybackState::Buffering => "Buffering",
            PlaybackState::Loading | PlaybackState::Playing => "Pause",
            PlaybackState::Idle | PlaybackState::Paused => "Play",
        }
    }
}

/// Per-chunk styling. When several apply, `Playing` beats `Played` beats
/// `Ready` beats `Converting` beats `Pending`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ChunkVisual {
    Pending,
    Converting,
    Ready,
    Playing,
    Played,
}

/// Facts the visual state of one chunk depends on.
#[derive(Debug, Clone, Copy)]
pub struct VisualContext {
    pub state: PlaybackState,
    pub current_index: Option<usize>,
    pub played_until: i64,
    /// Backend's count of finished chunks, i.e. the next index it produces.
    pub backend_done: usize,
    pub backend_total: usize,
}

pub fn chunk_visual(index: usize, ready: bool, ctx: &VisualContext) -> ChunkVisual {
    if ctx.state.is_running() && ctx.current_index == Some(index) {
        return ChunkVisual::Playing;
    }
    if (index as i64) <= ctx.played_until {
        return ChunkVisual::Played;
    }
    if ready {
        return ChunkVisual::Ready;
    }
    if index == ctx.backend_done && index < ctx.backend_total {
        return ChunkVisual::Converting;
    }
    ChunkVisual::Pending
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ChunkView {
    pub index: usize,
    pub text: String,
    pub visual: ChunkVisual,
    /// First sentence of a paragraph other than the first one.
    pub starts_paragraph: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct JobProgressView {
    pub status: JobStatus,
    pub done: usize,
    pub total: usize,
    pub progress_pct: f64,
    /// Chunks with audio known to the viewer.
    pub chunks_ready: usize,
    pub error: Option<String>,
    pub full_audio_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ControllerSnapshot {
    pub job_id: String,
    pub state: PlaybackState,
    pub control_label: String,
    pub can_play: bool,
    pub current_index: Option<usize>,
    pub played_until: i64,
    pub speed: f32,
    pub volume: f32,
    pub chunks: Vec<ChunkView>,
    pub job: JobProgressView,
    pub duration: DurationDisplay,
}

impl ControllerSnapshot {
    pub fn playing_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|chunk| chunk.visual == ChunkVisual::Playing)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(state: PlaybackState) -> VisualContext {
        VisualContext {
            state,
            current_index: Some(2),
            played_until: 2,
            backend_done: 4,
            backend_total: 6,
        }
    }

    #[test]
    fn playing_beats_played() {
        let ctx = ctx(PlaybackState::Playing);
        assert_eq!(chunk_visual(2, true, &ctx), ChunkVisual::Playing);
        assert_eq!(chunk_visual(1, true, &ctx), ChunkVisual::Played);
    }

    #[test]
    fn paused_current_chunk_is_not_playing() {
        let ctx = ctx(PlaybackState::Paused);
        assert_eq!(chunk_visual(2, true, &ctx), ChunkVisual::Played);
    }

    #[test]
    fn ready_beats_converting_beats_pending() {
        let ctx = ctx(PlaybackState::Idle);
        assert_eq!(chunk_visual(4, true, &ctx), ChunkVisual::Ready);
        assert_eq!(chunk_visual(4, false, &ctx), ChunkVisual::Converting);
        assert_eq!(chunk_visual(5, false, &ctx), ChunkVisual::Pending);
    }

    #[test]
    fn converting_requires_index_below_total() {
        let mut ctx = ctx(PlaybackState::Idle);
        ctx.backend_done = 6;
        assert_eq!(chunk_visual(6, false, &ctx), ChunkVisual::Pending);
    }

    #[test]
    fn control_labels_follow_state() {
        assert_eq!(PlaybackState::Buffering.control_label(), "Buffering");
        assert_eq!(PlaybackState::Loading.control_label(), "Pause");
        assert_eq!(PlaybackState::Paused.control_label(), "Play");
    }
}
