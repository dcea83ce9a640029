//! Duration estimation and seek mapping over the chunk sequence.
//!
//! Durations reported by the backend are authoritative. Until they arrive a
//! chunk's duration is its character share of the job's total estimate; the
//! estimate is recomputed on every call so it is superseded as soon as real
//! durations or a better total estimate come in.

use crate::playback::ChunkList;
use serde::Serialize;
use ts_rs::TS;

/// Duration of chunk `index` given the job-wide duration estimate.
pub fn chunk_duration(chunks: &ChunkList, index: usize, total_estimate: f64) -> f64 {
    if index >= chunks.len() {
        return 0.0;
    }
    if let Some(secs) = chunks.authoritative_duration(index) {
        return secs;
    }
    let total_estimate = if total_estimate.is_finite() {
        total_estimate.max(0.0)
    } else {
        0.0
    };
    let total_chars = chunks.total_chars();
    if total_chars == 0 {
        return total_estimate / chunks.len() as f64;
    }
    chunks.char_len(index) as f64 / total_chars as f64 * total_estimate
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct SeekTarget {
    pub index: usize,
    pub offset_secs: f64,
}

/// Read-only view pairing the chunk list with the current total estimate.
#[derive(Debug, Clone, Copy)]
pub struct Timeline<'a> {
    chunks: &'a ChunkList,
    total_estimate: f64,
}

impl<'a> Timeline<'a> {
    pub fn new(chunks: &'a ChunkList, total_estimate: f64) -> Self {
        Self {
            chunks,
            total_estimate,
        }
    }

    pub fn chunk_duration(&self, index: usize) -> f64 {
        chunk_duration(self.chunks, index, self.total_estimate)
    }

    /// Cumulative duration of every chunk before `index`.
    pub fn chunk_start(&self, index: usize) -> f64 {
        (0..index.min(self.chunks.len()))
            .map(|idx| self.chunk_duration(idx))
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.chunk_start(self.chunks.len())
    }

    /// Map a global position to the chunk whose `[start, end)` range covers
    /// it. Positions before zero clamp to the start; positions at or past the
    /// end land on the last chunk at its end offset.
    pub fn time_to_chunk(&self, target_secs: f64) -> Option<SeekTarget> {
        if self.chunks.is_empty() || target_secs.is_nan() {
            return None;
        }
        let target = target_secs.max(0.0);
        let mut start = 0.0;
        let mut last_duration = 0.0;
        for index in 0..self.chunks.len() {
            let duration = self.chunk_duration(index);
            let end = start + duration;
            if target < end {
                return Some(SeekTarget {
                    index,
                    offset_secs: target - start,
                });
            }
            start = end;
            last_duration = duration;
        }
        if start <= 0.0 {
            return None;
        }
        Some(SeekTarget {
            index: self.chunks.len() - 1,
            offset_secs: last_duration,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DurationLabel {
    Estimated,
    Total,
}

impl std::fmt::Display for DurationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DurationLabel::Estimated => "Estimated",
            DurationLabel::Total => "Total",
        };
        write!(f, "{}", label)
    }
}

/// Listening-time figures, already divided by the playback speed.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct DurationDisplay {
    pub label: DurationLabel,
    pub total_secs: f64,
    pub remaining_secs: Option<f64>,
}

impl DurationDisplay {
    pub fn text(&self) -> String {
        let mut text = format!("{}: {}", self.label, format_duration(self.total_secs));
        if let Some(remaining) = self.remaining_secs {
            text.push_str(&format!(" | Remaining: ~{}", format_duration(remaining)));
        }
        text
    }
}

/// Inputs for the elapsed/remaining readout.
#[derive(Debug, Clone, Copy)]
pub struct DisplayInputs {
    pub estimated_duration: f64,
    pub total_duration: f64,
    pub done: usize,
    pub current_index: Option<usize>,
    /// Offset inside the current chunk; only set while audio is running.
    pub position_secs: Option<f64>,
    pub speed: f32,
}

/// The total estimate the timeline should use for non-authoritative chunks.
pub fn total_estimate(estimated_duration: f64, total_duration: f64) -> f64 {
    if total_duration > 0.0 {
        total_duration
    } else {
        estimated_duration.max(0.0)
    }
}

pub fn duration_display(chunks: &ChunkList, inputs: DisplayInputs) -> DurationDisplay {
    let sentence_count = chunks.len();
    let (label, display_secs) = if inputs.total_duration > 0.0 && inputs.done >= sentence_count {
        (DurationLabel::Total, inputs.total_duration)
    } else {
        (DurationLabel::Estimated, inputs.estimated_duration.max(0.0))
    };

    let timeline = Timeline::new(
        chunks,
        total_estimate(inputs.estimated_duration, inputs.total_duration),
    );
    let current = inputs.current_index.unwrap_or(0);
    let played = timeline.chunk_start(current) + inputs.position_secs.unwrap_or(0.0);
    let remaining = (display_secs - played).max(0.0);

    let speed = if inputs.speed.is_finite() && inputs.speed > 0.0 {
        inputs.speed as f64
    } else {
        1.0
    };
    let remaining_secs = inputs
        .current_index
        .filter(|idx| *idx < sentence_count)
        .map(|_| remaining / speed);

    DurationDisplay {
        label,
        total_secs: display_secs / speed,
        remaining_secs,
    }
}

/// Unpadded readout: `"4m 5s"`, `"42s"`, `"0s"`.
pub fn format_duration(seconds: f64) -> String {
    if !(seconds > 0.0) || !seconds.is_finite() {
        return "0s".to_string();
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
