//! Speaker output backed by `rodio`.
//!
//! Chunk audio is fetched into the job's cache directory on a worker thread
//! and decoded from disk once present. Position is tracked with a wall clock
//! scaled by the playback rate since the sink does not report it.

use super::output::{AudioOutput, OutputEvent};
use crate::api::ApiClient;
use crate::cache;
use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct Download {
    request_id: u64,
    result: std::result::Result<PathBuf, String>,
}

#[derive(Debug, Clone, Copy)]
struct PlayClock {
    base: Duration,
    resumed_at: Option<Instant>,
    rate: f32,
}

impl PlayClock {
    fn new(rate: f32) -> Self {
        Self {
            base: Duration::ZERO,
            resumed_at: None,
            rate,
        }
    }

    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.base + at.elapsed().mul_f32(self.rate),
            None => self.base,
        }
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.resumed_at = None;
    }

    fn set_rate(&mut self, rate: f32) {
        let running = self.resumed_at.is_some();
        self.pause();
        self.rate = rate;
        if running {
            self.resume();
        }
    }

    fn seek(&mut self, offset: Duration) {
        let running = self.resumed_at.is_some();
        self.base = offset;
        self.resumed_at = running.then(Instant::now);
    }
}

pub struct RodioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    client: ApiClient,
    job_dir: PathBuf,
    downloads_tx: Sender<Download>,
    downloads_rx: Receiver<Download>,
    request_id: u64,
    pending: Option<u64>,
    want_playing: bool,
    rate: f32,
    volume: f32,
    clock: PlayClock,
    events: Vec<OutputEvent>,
}

impl RodioOutput {
    pub fn new(client: ApiClient, cache_root: &Path, job_id: &str) -> Result<Self> {
        let (_stream, handle) = OutputStream::try_default().context("Opening audio output")?;
        let job_dir = cache::job_dir(cache_root, job_id);
        let (downloads_tx, downloads_rx) = mpsc::channel();
        info!(cache = %job_dir.display(), "Opened audio output");
        Ok(Self {
            _stream,
            handle,
            sink: None,
            client,
            job_dir,
            downloads_tx,
            downloads_rx,
            request_id: 0,
            pending: None,
            want_playing: false,
            rate: 1.0,
            volume: 1.0,
            clock: PlayClock::new(1.0),
            events: Vec::new(),
        })
    }

    fn fail(&mut self, message: String) {
        warn!(request_id = self.request_id, %message, "Chunk audio unavailable");
        self.events.push(OutputEvent::Failed {
            request_id: self.request_id,
            message,
        });
    }

    fn start_source(&mut self, path: &Path) {
        match self.open_sink(path) {
            Ok(sink) => {
                if self.want_playing {
                    sink.play();
                    self.clock.resume();
                }
                self.sink = Some(sink);
                debug!(request_id = self.request_id, path = %path.display(), "Chunk source started");
                self.events.push(OutputEvent::Started {
                    request_id: self.request_id,
                });
            }
            Err(err) => self.fail(format!("{err:#}")),
        }
    }

    fn open_sink(&self, path: &Path) -> Result<Sink> {
        let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
        let source = Decoder::new(BufReader::new(file))
            .with_context(|| format!("Decoding {}", path.display()))?;
        let sink = Sink::try_new(&self.handle).context("Creating sink")?;
        sink.pause();
        sink.set_speed(self.rate);
        sink.set_volume(self.volume);
        sink.append(source);
        Ok(sink)
    }

    fn drop_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, request_id: u64, url: &str) {
        self.drop_sink();
        self.request_id = request_id;
        self.rate = 1.0;
        self.clock = PlayClock::new(self.rate);

        let url = match self.client.resolve(url) {
            Ok(url) => url,
            Err(err) => {
                self.fail(format!("{err:#}"));
                return;
            }
        };
        let path = cache::chunk_audio_path(&self.job_dir, &url);
        self.pending = Some(request_id);
        if path.exists() {
            debug!(request_id, path = %path.display(), "Chunk audio cache hit");
            let _ = self.downloads_tx.send(Download {
                request_id,
                result: Ok(path),
            });
            return;
        }

        let client = self.client.clone();
        let tx = self.downloads_tx.clone();
        debug!(request_id, %url, "Fetching chunk audio");
        thread::spawn(move || {
            let result = client
                .download(&url, &path)
                .map(|_| path)
                .map_err(|err| format!("{err:#}"));
            let _ = tx.send(Download { request_id, result });
        });
    }

    fn play(&mut self) {
        self.want_playing = true;
        if let Some(sink) = &self.sink {
            sink.play();
            self.clock.resume();
        }
    }

    fn pause(&mut self) {
        self.want_playing = false;
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.clock.pause();
    }

    fn stop(&mut self) {
        self.drop_sink();
        self.pending = None;
        self.want_playing = false;
        self.clock = PlayClock::new(self.rate);
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.clock.set_rate(rate);
        if let Some(sink) = &self.sink {
            sink.set_speed(rate);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn seek(&mut self, offset: Duration) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.try_seek(offset) {
            Ok(()) => self.clock.seek(offset),
            Err(err) => warn!(?err, offset_ms = offset.as_millis() as u64, "Seek not supported"),
        }
    }

    fn position(&self) -> Duration {
        self.clock.position()
    }

    fn poll_events(&mut self) -> Vec<OutputEvent> {
        while let Ok(download) = self.downloads_rx.try_recv() {
            if self.pending != Some(download.request_id) {
                debug!(request_id = download.request_id, "Dropping superseded download");
                continue;
            }
            self.pending = None;
            match download.result {
                Ok(path) => self.start_source(&path),
                Err(message) => self.fail(message),
            }
        }

        let finished = self.sink.as_ref().map(|sink| sink.empty()).unwrap_or(false);
        if finished {
            self.drop_sink();
            self.clock.pause();
            self.events.push(OutputEvent::Ended {
                request_id: self.request_id,
            });
        }
        std::mem::take(&mut self.events)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        self.drop_sink();
    }
}

#[cfg(test)]
mod tests {
    use super::PlayClock;
    use std::time::Duration;

    #[test]
    fn paused_clock_holds_position() {
        let mut clock = PlayClock::new(2.0);
        clock.seek(Duration::from_secs(3));
        assert_eq!(clock.position(), Duration::from_secs(3));
        clock.pause();
        assert_eq!(clock.position(), Duration::from_secs(3));
    }

    #[test]
    fn running_clock_advances() {
        let mut clock = PlayClock::new(1.0);
        clock.resume();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.position() > Duration::ZERO);
        clock.pause();
        let held = clock.position();
        clock.set_rate(2.0);
        assert_eq!(clock.position(), held);
    }
}
