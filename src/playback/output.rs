use std::time::Duration;

/// Notifications from the audio output. `request_id` ties each event to the
/// `load` that produced it so events from a replaced source can be dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEvent {
    Started { request_id: u64 },
    Ended { request_id: u64 },
    Failed { request_id: u64, message: String },
}

impl OutputEvent {
    pub fn request_id(&self) -> u64 {
        match self {
            OutputEvent::Started { request_id }
            | OutputEvent::Ended { request_id }
            | OutputEvent::Failed { request_id, .. } => *request_id,
        }
    }
}

/// The single audio handle the controller drives through the chunk sequence.
///
/// Calls never block on I/O; fetching and decoding happen behind the trait and
/// report back through [`AudioOutput::poll_events`].
pub trait AudioOutput {
    /// Replace the current source. Resets position and playback rate.
    fn load(&mut self, request_id: u64, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    /// Stop and detach the current source.
    fn stop(&mut self);
    fn set_rate(&mut self, rate: f32);
    fn set_volume(&mut self, volume: f32);
    fn seek(&mut self, offset: Duration);
    /// Position inside the current source, in audio time.
    fn position(&self) -> Duration;
    fn poll_events(&mut self) -> Vec<OutputEvent>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AudioOutput, OutputEvent};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Load { request_id: u64, url: String },
        Play,
        Pause,
        Stop,
        Rate(f32),
        Volume(f32),
        Seek(Duration),
    }

    /// Output fake that records calls and hands back queued events.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingOutput {
        pub(crate) calls: Vec<Call>,
        pub(crate) queued: Vec<OutputEvent>,
        pub(crate) position: Duration,
        pub(crate) last_request_id: u64,
    }

    impl RecordingOutput {
        pub(crate) fn loads(&self) -> Vec<String> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Load { url, .. } => Some(url.clone()),
                    _ => None,
                })
                .collect()
        }

        pub(crate) fn last_rate(&self) -> Option<f32> {
            self.calls.iter().rev().find_map(|call| match call {
                Call::Rate(rate) => Some(*rate),
                _ => None,
            })
        }
    }

    impl AudioOutput for RecordingOutput {
        fn load(&mut self, request_id: u64, url: &str) {
            self.last_request_id = request_id;
            self.position = Duration::ZERO;
            self.calls.push(Call::Load {
                request_id,
                url: url.to_string(),
            });
        }

        fn play(&mut self) {
            self.calls.push(Call::Play);
        }

        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }

        fn stop(&mut self) {
            self.calls.push(Call::Stop);
        }

        fn set_rate(&mut self, rate: f32) {
            self.calls.push(Call::Rate(rate));
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.push(Call::Volume(volume));
        }

        fn seek(&mut self, offset: Duration) {
            self.position = offset;
            self.calls.push(Call::Seek(offset));
        }

        fn position(&self) -> Duration {
            self.position
        }

        fn poll_events(&mut self) -> Vec<OutputEvent> {
            std::mem::take(&mut self.queued)
        }
    }
}
