//! Chunked playback: the chunk list, the controller state machine and the
//! audio output it drives.

mod chunks;
mod controller;
mod output;
mod rodio_output;
mod state;

pub use chunks::{Chunk, ChunkList};
pub use controller::{ControllerCommand, ControllerEvent, Effect, PlaybackController, SeekPreview};
pub use output::{AudioOutput, OutputEvent};
pub use rodio_output::RodioOutput;
pub use state::{
    ChunkView, ChunkVisual, ControllerSnapshot, JobProgressView, PlaybackState, VisualContext,
    chunk_visual,
};

#[cfg(test)]
pub(crate) use output::testing;
