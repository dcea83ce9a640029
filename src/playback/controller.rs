use super::chunks::ChunkList;
use super::output::{AudioOutput, OutputEvent};
use super::state::{
    ChunkView, ControllerSnapshot, JobProgressView, PlaybackState, VisualContext, chunk_visual,
};
use crate::api::{JobSnapshot, JobStatus};
use crate::config::{AppConfig, clamp_speed, clamp_volume};
use crate::error::ViewerError;
use crate::page::PageConfig;
use crate::segmenter::{self, Segment};
use crate::timeline::{self, DisplayInputs, Timeline};
use anyhow::{Result, bail};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use ts_rs::TS;

/// Work the runtime performs on behalf of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// View state changed; re-render.
    StateChanged,
    /// A chunk started; save it as the listener's position. Best effort.
    PersistProgress { index: usize },
    /// The job finished and no concatenated file is known yet.
    RequestFullAudio,
    Error(ViewerError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerCommand {
    GetSnapshot,
    TogglePlay,
    Stop,
    SelectChunk { index: usize },
    Seek { secs: f64 },
    SetSpeed { speed: f32 },
    SetVolume { volume: f32 },
}

impl ControllerCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "playback_get_snapshot",
            Self::TogglePlay => "playback_toggle",
            Self::Stop => "playback_stop",
            Self::SelectChunk { .. } => "playback_select_chunk",
            Self::Seek { .. } => "playback_seek",
            Self::SetSpeed { .. } => "playback_set_speed",
            Self::SetVolume { .. } => "playback_set_volume",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerEvent {
    pub action: &'static str,
    pub effects: Vec<Effect>,
    pub snapshot: ControllerSnapshot,
}

/// Hover readout for a position on the global timeline.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SeekPreview {
    pub index: usize,
    pub offset_secs: f64,
    pub chunk_start_secs: f64,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
struct JobProgress {
    status: JobStatus,
    done: usize,
    total: usize,
    progress: f64,
    estimated_duration: f64,
    total_duration: f64,
    error: Option<String>,
    full_audio_url: Option<String>,
    full_audio_requested: bool,
}

/// Drives one audio output through a job's chunks in order, waiting on
/// chunks the backend has not produced yet.
pub struct PlaybackController<O: AudioOutput> {
    job_id: String,
    chunks: ChunkList,
    paragraph_starts: Vec<bool>,
    output: O,
    state: PlaybackState,
    current_index: Option<usize>,
    played_until: i64,
    loaded: Option<usize>,
    request_id: u64,
    speed: f32,
    volume: f32,
    job: JobProgress,
}

impl<O: AudioOutput> PlaybackController<O> {
    pub fn create(page: &PageConfig, config: &AppConfig, mut output: O) -> Result<Self> {
        if !page.activates_playback() {
            bail!(
                "Page mode {:?} with job {:?} does not activate playback",
                page.mode,
                page.job_id
            );
        }
        let layout = segmenter::segment(&page.full_text);
        let paragraph_starts = paragraph_starts(&layout);
        let chunks = ChunkList::from_sentences(segmenter::logical_sentences(&layout));
        let count = segmenter::logical_sentence_count(&layout);

        let (played_until, current_index) =
            if config.resume_from_last_played && page.last_played_index >= 0 && count > 0 {
                let last = page.last_played_index.min(count as i64 - 1);
                let next = (last + 1) as usize;
                (last, Some(if next < count { next } else { 0 }))
            } else {
                (-1, None)
            };

        let speed = clamp_speed(config.playback_speed);
        let volume = clamp_volume(config.playback_volume);
        output.set_rate(speed);
        output.set_volume(volume);

        info!(
            job_id = %page.job_id,
            chunks = count,
            played_until,
            "Created playback controller"
        );
        Ok(Self {
            job_id: page.job_id.clone(),
            chunks,
            paragraph_starts,
            output,
            state: PlaybackState::Idle,
            current_index,
            played_until,
            loaded: None,
            request_id: 0,
            speed,
            volume,
            job: JobProgress::default(),
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn played_until(&self) -> i64 {
        self.played_until
    }

    pub fn chunks(&self) -> &ChunkList {
        &self.chunks
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn timeline(&self) -> Timeline<'_> {
        Timeline::new(
            &self.chunks,
            timeline::total_estimate(self.job.estimated_duration, self.job.total_duration),
        )
    }

    pub fn apply_command(&mut self, command: ControllerCommand) -> ControllerEvent {
        let action = command.action();
        let effects = match command {
            ControllerCommand::GetSnapshot => Vec::new(),
            ControllerCommand::TogglePlay => self.request_play(),
            ControllerCommand::Stop => self.stop(),
            ControllerCommand::SelectChunk { index } => self.request_select_chunk(index),
            ControllerCommand::Seek { secs } => self.request_seek(secs),
            ControllerCommand::SetSpeed { speed } => self.set_speed(speed),
            ControllerCommand::SetVolume { volume } => self.set_volume(volume),
        };
        ControllerEvent {
            action,
            effects,
            snapshot: self.snapshot(),
        }
    }

    /// Play/pause toggle.
    pub fn request_play(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.state.is_running() {
            self.output.pause();
            self.state = PlaybackState::Paused;
            info!(index = ?self.current_index, "Paused playback");
            effects.push(Effect::StateChanged);
            return effects;
        }
        if self.chunks.is_empty() {
            debug!("Play requested with no chunks");
            return effects;
        }

        let target = self.play_target();
        if self.state == PlaybackState::Paused && self.loaded == Some(target) {
            self.output.play();
            self.state = PlaybackState::Playing;
            info!(index = target, "Resumed playback");
        } else if !self.start_chunk(target, &mut effects) {
            self.enter_buffering(target);
        }
        effects.push(Effect::StateChanged);
        effects
    }

    /// Jump to chunk `index`, rewinding the played frontier to just before it.
    pub fn request_select_chunk(&mut self, index: usize) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.chunks.is_ready(index) {
            debug!(index, "Ignoring selection of chunk without audio");
            effects.push(Effect::Error(ViewerError::NotReady { index }));
            return effects;
        }
        self.played_until = index as i64 - 1;
        self.start_chunk(index, &mut effects);
        effects.push(Effect::StateChanged);
        effects
    }

    pub fn report_chunk_ready(
        &mut self,
        index: usize,
        url: &str,
        duration: Option<f64>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        let newly_ready = self.chunks.merge_url(index, url);
        let duration_changed = duration
            .map(|secs| self.chunks.merge_duration(index, secs))
            .unwrap_or(false);
        if newly_ready || duration_changed {
            effects.push(Effect::StateChanged);
        }
        self.resume_if_buffering(&mut effects);
        effects
    }

    /// Fold one poll of the job's status into the controller.
    pub fn apply_snapshot(&mut self, snapshot: &JobSnapshot) -> Vec<Effect> {
        let mut effects = Vec::new();
        for (index, url) in snapshot.chunk_urls.iter().enumerate() {
            if let Some(url) = url {
                self.chunks.merge_url(index, url);
            }
        }
        for (index, secs) in snapshot.chunk_durations.iter().enumerate() {
            if let Some(secs) = secs {
                self.chunks.merge_duration(index, *secs);
            }
        }

        let status = snapshot.effective_status();
        self.job.status = status;
        self.job.done = snapshot.done;
        self.job.total = snapshot.total;
        self.job.progress = snapshot.progress.clamp(0.0, 1.0);
        self.job.estimated_duration = snapshot.estimated_duration;
        self.job.total_duration = snapshot.total_duration;
        effects.push(Effect::StateChanged);

        self.resume_if_buffering(&mut effects);

        match status {
            JobStatus::Error => {
                let message = snapshot
                    .error
                    .clone()
                    .unwrap_or_else(|| "Conversion failed".to_string());
                if self.job.error.as_deref() != Some(message.as_str()) {
                    warn!(job_id = %self.job_id, error = %message, "Job reported an error");
                    self.job.error = Some(message.clone());
                    effects.push(Effect::Error(ViewerError::Job(message)));
                }
            }
            JobStatus::Done => {
                if self.job.full_audio_url.is_none() && !self.job.full_audio_requested {
                    self.job.full_audio_requested = true;
                    effects.push(Effect::RequestFullAudio);
                }
            }
            _ => {}
        }
        effects
    }

    pub fn set_full_audio_url(&mut self, url: String) -> Vec<Effect> {
        info!(job_id = %self.job_id, %url, "Full audio ready");
        self.job.full_audio_url = Some(url);
        vec![Effect::StateChanged]
    }

    /// Seek on the global timeline. Within the loaded chunk this seeks the
    /// output; anything else restarts the target chunk from its beginning.
    pub fn request_seek(&mut self, target_secs: f64) -> Vec<Effect> {
        let Some(target) = self.timeline().time_to_chunk(target_secs) else {
            debug!(target_secs, "Seek target does not map to a chunk");
            return Vec::new();
        };
        if self.loaded == Some(target.index) && self.current_index == Some(target.index) {
            let offset = Duration::try_from_secs_f64(target.offset_secs).unwrap_or_default();
            self.output.seek(offset);
            debug!(index = target.index, offset_secs = target.offset_secs, "Seeked within chunk");
            return vec![Effect::StateChanged];
        }
        // TODO: carry the offset across chunk loads once outputs report seekability.
        self.request_select_chunk(target.index)
    }

    pub fn preview_seek(&self, target_secs: f64) -> Option<SeekPreview> {
        let timeline = self.timeline();
        let target = timeline.time_to_chunk(target_secs)?;
        let chunk = self.chunks.get(target.index)?;
        Some(SeekPreview {
            index: target.index,
            offset_secs: target.offset_secs,
            chunk_start_secs: timeline.chunk_start(target.index),
            text: chunk.text.clone(),
        })
    }

    pub fn set_speed(&mut self, speed: f32) -> Vec<Effect> {
        self.speed = clamp_speed(speed);
        self.output.set_rate(self.speed);
        debug!(speed = self.speed, "Playback speed set");
        vec![Effect::StateChanged]
    }

    pub fn set_volume(&mut self, volume: f32) -> Vec<Effect> {
        self.volume = clamp_volume(volume);
        self.output.set_volume(self.volume);
        debug!(volume = self.volume, "Playback volume set");
        vec![Effect::StateChanged]
    }

    /// Stop the output and go idle. The cursor stays where it is.
    pub fn stop(&mut self) -> Vec<Effect> {
        self.output.stop();
        self.loaded = None;
        self.state = PlaybackState::Idle;
        info!(index = ?self.current_index, "Stopped playback");
        vec![Effect::StateChanged]
    }

    /// Drain the output's pending notifications.
    pub fn poll_output(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        for event in self.output.poll_events() {
            effects.extend(self.handle_output_event(event));
        }
        effects
    }

    pub fn handle_output_event(&mut self, event: OutputEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        if event.request_id() != self.request_id {
            debug!(
                event_request = event.request_id(),
                current_request = self.request_id,
                "Ignoring stale output event"
            );
            return effects;
        }
        match event {
            OutputEvent::Started { .. } => {
                if self.state == PlaybackState::Loading {
                    self.state = PlaybackState::Playing;
                    effects.push(Effect::StateChanged);
                }
            }
            OutputEvent::Ended { .. } => {
                if self.state.is_running() {
                    self.handle_chunk_ended(&mut effects);
                } else if self.state == PlaybackState::Paused
                    && self.loaded.is_some()
                    && self.loaded == self.current_index
                {
                    self.handle_paused_chunk_ended(&mut effects);
                }
            }
            OutputEvent::Failed { message, .. } => {
                warn!(index = ?self.current_index, %message, "Audio output failed");
                self.output.stop();
                self.loaded = None;
                self.state = PlaybackState::Paused;
                effects.push(Effect::Error(ViewerError::Output(message)));
                effects.push(Effect::StateChanged);
            }
        }
        effects
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let ctx = VisualContext {
            state: self.state,
            current_index: self.current_index,
            played_until: self.played_until,
            backend_done: self.job.done,
            backend_total: self.job.total,
        };
        let chunks = self
            .chunks
            .iter()
            .map(|chunk| ChunkView {
                index: chunk.index,
                text: chunk.text.clone(),
                visual: chunk_visual(chunk.index, chunk.audio_url.is_some(), &ctx),
                starts_paragraph: self
                    .paragraph_starts
                    .get(chunk.index)
                    .copied()
                    .unwrap_or(false),
            })
            .collect();

        let position_secs = self
            .state
            .is_running()
            .then(|| self.output.position().as_secs_f64());
        let duration = timeline::duration_display(
            &self.chunks,
            DisplayInputs {
                estimated_duration: self.job.estimated_duration,
                total_duration: self.job.total_duration,
                done: self.job.done,
                current_index: self.current_index,
                position_secs,
                speed: self.speed,
            },
        );

        let can_play = !self.chunks.is_empty()
            && (self.state.is_running() || self.chunks.is_ready(self.play_target()));

        ControllerSnapshot {
            job_id: self.job_id.clone(),
            state: self.state,
            control_label: self.state.control_label().to_string(),
            can_play,
            current_index: self.current_index,
            played_until: self.played_until,
            speed: self.speed,
            volume: self.volume,
            chunks,
            job: JobProgressView {
                status: self.job.status,
                done: self.job.done,
                total: self.job.total,
                progress_pct: self.job.progress * 100.0,
                chunks_ready: self.chunks.ready_count(),
                error: self.job.error.clone(),
                full_audio_url: self.job.full_audio_url.clone(),
            },
            duration,
        }
    }

    /// Release the output.
    pub fn dispose(mut self) {
        self.output.stop();
        info!(job_id = %self.job_id, "Disposed playback controller");
    }

    fn play_target(&self) -> usize {
        match self.current_index {
            Some(index) if index < self.chunks.len() => index,
            _ => 0,
        }
    }

    fn start_chunk(&mut self, index: usize, effects: &mut Vec<Effect>) -> bool {
        let Some(url) = self.chunks.url(index).map(str::to_string) else {
            debug!(index, "Chunk audio not ready");
            return false;
        };
        self.request_id += 1;
        self.current_index = Some(index);
        self.output.load(self.request_id, &url);
        // Loading resets the output's rate.
        self.output.set_rate(self.speed);
        self.output.set_volume(self.volume);
        self.output.play();
        self.loaded = Some(index);
        self.state = PlaybackState::Loading;
        info!(index, request_id = self.request_id, %url, "Starting chunk");
        effects.push(Effect::PersistProgress { index });
        true
    }

    fn enter_buffering(&mut self, index: usize) {
        self.output.stop();
        self.loaded = None;
        self.current_index = Some(index);
        self.state = PlaybackState::Buffering;
        info!(index, "Waiting for chunk audio");
    }

    fn resume_if_buffering(&mut self, effects: &mut Vec<Effect>) {
        if self.state != PlaybackState::Buffering {
            return;
        }
        let Some(index) = self.current_index else {
            return;
        };
        if self.start_chunk(index, effects) {
            effects.push(Effect::StateChanged);
        }
    }

    fn handle_chunk_ended(&mut self, effects: &mut Vec<Effect>) {
        let Some(current) = self.current_index else {
            return;
        };
        self.played_until = self.played_until.max(current as i64);
        let next = current + 1;
        if next >= self.chunks.len() {
            self.output.stop();
            self.loaded = None;
            self.current_index = Some(0);
            self.state = PlaybackState::Idle;
            info!(job_id = %self.job_id, "Reached end of job");
        } else if !self.start_chunk(next, effects) {
            self.enter_buffering(next);
        }
        effects.push(Effect::StateChanged);
    }

    /// The source ran dry after a pause landed. Move the cursor past the
    /// finished chunk without starting the next one; the next play loads it.
    fn handle_paused_chunk_ended(&mut self, effects: &mut Vec<Effect>) {
        let Some(current) = self.current_index else {
            return;
        };
        self.played_until = self.played_until.max(current as i64);
        self.output.stop();
        self.loaded = None;
        let next = current + 1;
        if next >= self.chunks.len() {
            self.current_index = Some(0);
            self.state = PlaybackState::Idle;
            info!(job_id = %self.job_id, "Reached end of job while paused");
        } else {
            self.current_index = Some(next);
            debug!(index = next, "Chunk ended while paused");
        }
        effects.push(Effect::StateChanged);
    }
}

/// Per chunk, whether it opens a paragraph after the first.
fn paragraph_starts(layout: &[Segment]) -> Vec<bool> {
    let mut starts = Vec::new();
    let mut after_break = false;
    for segment in layout {
        match segment {
            Segment::ParagraphBreak => after_break = true,
            Segment::Sentence(_) => {
                starts.push(after_break);
                after_break = false;
            }
        }
    }
    starts
}
