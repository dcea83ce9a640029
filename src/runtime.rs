//! The viewer's event loop.
//!
//! Owns the playback controller and sidebar and is the only thread that
//! mutates them. Pollers, network calls and the input reader run elsewhere
//! and report back through [`Message`]s.

use crate::api::ApiClient;
use crate::cancellation::CancellationToken;
use crate::config::AppConfig;
use crate::error::ViewerError;
use crate::playback::{
    AudioOutput, ControllerCommand, ControllerSnapshot, Effect, PlaybackController,
};
use crate::poller::{self, PollUpdate};
use crate::sidebar::{RemovedJob, Sidebar};
use crate::timeline::format_duration;
use anyhow::{Context, Result, anyhow, bail};
use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use tracing::{debug, error, info, warn};

pub const COMMAND_HELP: &str = "commands: p (play/pause), s (stop), c <n> (select chunk), \
seek <secs>, peek <secs>, speed <x>, vol <x>, jobs, rename <job-id> <title>, \
delete <job-id>, q (quit)";

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    TogglePlay,
    Stop,
    Select(usize),
    Seek(f64),
    Peek(f64),
    Speed(f32),
    Volume(f32),
    Jobs,
    Rename { job_id: String, title: String },
    Delete { job_id: String },
    Quit,
}

impl FromStr for UserCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let command = match head {
            "p" | "play" | "pause" => UserCommand::TogglePlay,
            "s" | "stop" => UserCommand::Stop,
            "c" | "chunk" => UserCommand::Select(parse_arg(head, rest)?),
            "seek" => UserCommand::Seek(parse_arg(head, rest)?),
            "peek" => UserCommand::Peek(parse_arg(head, rest)?),
            "speed" => UserCommand::Speed(parse_arg(head, rest)?),
            "vol" | "volume" => UserCommand::Volume(parse_arg(head, rest)?),
            "jobs" => UserCommand::Jobs,
            "rename" => {
                let Some((job_id, title)) = rest.split_once(char::is_whitespace) else {
                    bail!("usage: rename <job-id> <title>");
                };
                let title = title.trim();
                if title.is_empty() {
                    bail!("usage: rename <job-id> <title>");
                }
                UserCommand::Rename {
                    job_id: job_id.to_string(),
                    title: title.to_string(),
                }
            }
            "delete" => {
                if rest.is_empty() {
                    bail!("usage: delete <job-id>");
                }
                UserCommand::Delete {
                    job_id: rest.to_string(),
                }
            }
            "q" | "quit" | "exit" => UserCommand::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command {other:?}"),
        };
        Ok(command)
    }
}

fn parse_arg<T: FromStr>(command: &str, arg: &str) -> Result<T> {
    arg.parse()
        .map_err(|_| anyhow!("{command}: invalid argument {arg:?}"))
}

/// Optimistic sidebar change awaiting the backend's verdict.
#[derive(Debug, Clone)]
pub enum PendingMutation {
    Rename {
        job_id: String,
        previous: Option<String>,
    },
    Delete {
        job_id: String,
        removed: Option<RemovedJob>,
    },
}

impl PendingMutation {
    fn action(&self) -> &'static str {
        match self {
            PendingMutation::Rename { .. } => "rename",
            PendingMutation::Delete { .. } => "delete",
        }
    }
}

#[derive(Debug)]
pub enum Message {
    Poll(PollUpdate),
    FullAudioReady(String),
    FullAudioFailed(String),
    Input(UserCommand),
    MutationDone {
        mutation: PendingMutation,
        result: std::result::Result<(), String>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Runtime<O: AudioOutput> {
    controller: PlaybackController<O>,
    sidebar: Sidebar,
    client: ApiClient,
    config: AppConfig,
    tx: Sender<Message>,
    rx: Receiver<Message>,
    cancel: CancellationToken,
    last_status: Option<String>,
}

impl<O: AudioOutput> Runtime<O> {
    pub fn new(controller: PlaybackController<O>, client: ApiClient, config: AppConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            controller,
            sidebar: Sidebar::new(),
            client,
            config,
            tx,
            rx,
            cancel: CancellationToken::new(),
            last_status: None,
        }
    }

    pub fn sender(&self) -> Sender<Message> {
        self.tx.clone()
    }

    /// Run until the user quits or a shutdown message arrives.
    pub fn run(mut self) -> Result<()> {
        self.spawn_pollers();
        self.execute(vec![Effect::StateChanged]);
        info!(job_id = %self.controller.job_id(), "Viewer running");

        let tick = self.config.output_tick();
        loop {
            match self.rx.recv_timeout(tick) {
                Ok(Message::Shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
                Ok(message) => {
                    if self.handle_message(message) == Flow::Quit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let effects = self.controller.poll_output();
            self.execute(effects);
        }

        self.dispose();
        Ok(())
    }

    fn spawn_pollers(&self) {
        let tx = self.tx.clone();
        poller::spawn_job_poller(
            self.client.clone(),
            self.controller.job_id().to_string(),
            self.config.job_poll_interval(),
            self.cancel.clone(),
            move |update| tx.send(Message::Poll(update)).is_ok(),
        );
        let tx = self.tx.clone();
        poller::spawn_sidebar_poller(
            self.client.clone(),
            self.config.sidebar_poll_interval(),
            self.cancel.clone(),
            move |update| tx.send(Message::Poll(update)).is_ok(),
        );
    }

    fn handle_message(&mut self, message: Message) -> Flow {
        match message {
            Message::Poll(PollUpdate::Job(snapshot)) => {
                let effects = self.controller.apply_snapshot(&snapshot);
                self.execute(effects);
            }
            Message::Poll(PollUpdate::Jobs(jobs)) => {
                debug!(count = jobs.len(), "Active jobs updated");
                self.sidebar.apply_active_jobs(jobs);
            }
            Message::FullAudioReady(url) => {
                let shown = self
                    .client
                    .resolve(&url)
                    .map(|resolved| resolved.to_string())
                    .unwrap_or_else(|_| url.clone());
                println!("Full audio: {shown}");
                let effects = self.controller.set_full_audio_url(url);
                self.execute(effects);
            }
            Message::FullAudioFailed(message) => {
                report_error(&ViewerError::Transport(format!("full audio: {message}")));
            }
            Message::Input(command) => return self.handle_command(command),
            Message::MutationDone { mutation, result } => self.finish_mutation(mutation, result),
            Message::Shutdown => return Flow::Quit,
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: UserCommand) -> Flow {
        let controller_command = match command {
            UserCommand::TogglePlay => ControllerCommand::TogglePlay,
            UserCommand::Stop => ControllerCommand::Stop,
            UserCommand::Select(index) => ControllerCommand::SelectChunk { index },
            UserCommand::Seek(secs) => ControllerCommand::Seek { secs },
            UserCommand::Speed(speed) => ControllerCommand::SetSpeed { speed },
            UserCommand::Volume(volume) => ControllerCommand::SetVolume { volume },
            UserCommand::Peek(secs) => {
                match self.controller.preview_seek(secs) {
                    Some(preview) => println!(
                        "{} → chunk {} (+{:.1}s): {}",
                        format_duration(secs),
                        preview.index,
                        preview.offset_secs,
                        preview.text
                    ),
                    None => println!("Nothing to preview yet"),
                }
                return Flow::Continue;
            }
            UserCommand::Jobs => {
                print_jobs(&self.sidebar);
                return Flow::Continue;
            }
            UserCommand::Rename { job_id, title } => {
                self.start_rename(job_id, title);
                return Flow::Continue;
            }
            UserCommand::Delete { job_id } => {
                self.start_delete(job_id);
                return Flow::Continue;
            }
            UserCommand::Quit => return Flow::Quit,
        };
        let event = self.controller.apply_command(controller_command);
        debug!(action = event.action, state = ?event.snapshot.state, "Applied command");
        self.execute(event.effects);
        Flow::Continue
    }

    fn start_rename(&mut self, job_id: String, title: String) {
        let previous = self.sidebar.rename_optimistic(&job_id, &title);
        let mutation = PendingMutation::Rename {
            job_id: job_id.clone(),
            previous,
        };
        let client = self.client.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = client
                .rename(&job_id, &title)
                .map_err(|err| format!("{err:#}"));
            let _ = tx.send(Message::MutationDone { mutation, result });
        });
    }

    fn start_delete(&mut self, job_id: String) {
        let removed = self.sidebar.remove(&job_id);
        let mutation = PendingMutation::Delete {
            job_id: job_id.clone(),
            removed,
        };
        let client = self.client.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = client.delete(&job_id).map_err(|err| format!("{err:#}"));
            let _ = tx.send(Message::MutationDone { mutation, result });
        });
    }

    fn finish_mutation(
        &mut self,
        mutation: PendingMutation,
        result: std::result::Result<(), String>,
    ) {
        let action = mutation.action();
        let message = match result {
            Ok(()) => {
                if let PendingMutation::Delete { job_id, .. } = &mutation {
                    self.sidebar.finish_delete(job_id);
                }
                println!("{action} succeeded");
                return;
            }
            Err(message) => message,
        };
        match mutation {
            PendingMutation::Rename {
                job_id,
                previous: Some(previous),
            } => self.sidebar.rollback_rename(&job_id, previous),
            PendingMutation::Rename { .. } => {}
            PendingMutation::Delete {
                removed: Some(removed),
                ..
            } => self.sidebar.restore(removed),
            PendingMutation::Delete {
                job_id,
                removed: None,
            } => self.sidebar.finish_delete(&job_id),
        }
        self.execute(vec![Effect::Error(ViewerError::Mutation { action, message })]);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        let mut render = false;
        for effect in effects {
            match effect {
                Effect::StateChanged => render = true,
                Effect::PersistProgress { index } => {
                    let client = self.client.clone();
                    let job_id = self.controller.job_id().to_string();
                    thread::spawn(move || {
                        if let Err(err) = client.save_progress(&job_id, index) {
                            report_error(&ViewerError::Transport(format!(
                                "saving progress for chunk {index}: {err:#}"
                            )));
                        }
                    });
                }
                Effect::RequestFullAudio => {
                    let client = self.client.clone();
                    let job_id = self.controller.job_id().to_string();
                    let tx = self.tx.clone();
                    thread::spawn(move || {
                        let message = match client.generate_full(&job_id) {
                            Ok(url) => Message::FullAudioReady(url),
                            Err(err) => Message::FullAudioFailed(format!("{err:#}")),
                        };
                        let _ = tx.send(message);
                    });
                }
                Effect::Error(err) => report_error(&err),
            }
        }
        if render {
            self.render_status();
        }
    }

    fn render_status(&mut self) {
        let line = status_line(&self.controller.snapshot());
        if self.last_status.as_deref() != Some(line.as_str()) {
            println!("{line}");
            self.last_status = Some(line);
        }
    }

    fn dispose(self) {
        self.cancel.cancel();
        self.controller.dispose();
    }
}

fn report_error(err: &ViewerError) {
    match err {
        _ if err.is_surfaced() => {
            error!(%err, "Viewer error");
            eprintln!("error: {err}");
        }
        ViewerError::Transport(_) => warn!(%err, "Best-effort request failed"),
        _ => debug!(%err, "Ignored viewer error"),
    }
}

pub fn status_line(snapshot: &ControllerSnapshot) -> String {
    let position = match snapshot.current_index {
        Some(index) if index < snapshot.chunks.len() => {
            format!("chunk {}/{}", index + 1, snapshot.chunks.len())
        }
        _ => format!("{} chunks", snapshot.chunks.len()),
    };
    format!(
        "[{}] {} | {} | ready {}/{} | job {} {}/{} ({:.0}%) | {:.2}x",
        snapshot.control_label,
        position,
        snapshot.duration.text(),
        snapshot.job.chunks_ready,
        snapshot.chunks.len(),
        snapshot.job.status,
        snapshot.job.done,
        snapshot.job.total,
        snapshot.job.progress_pct,
        snapshot.speed
    )
}

pub fn print_jobs(sidebar: &Sidebar) {
    if sidebar.is_empty() {
        println!("No jobs");
        return;
    }
    for item in sidebar.items() {
        let mut line = format!("{}  {}  {}", item.id, item.title, item.status.text());
        if let Some(pct) = item.conversion_pct {
            line.push_str(&format!("  converting {pct:.0}%"));
        }
        if let Some(pct) = item.playback_pct {
            line.push_str(&format!("  played {pct:.0}%"));
        }
        println!("{line}");
    }
}

/// Forward stdin lines as commands. End of input quits the viewer.
pub fn spawn_input_reader(tx: Sender<Message>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line.context("Reading stdin") {
                Ok(line) => line,
                Err(err) => {
                    warn!("{err:#}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<UserCommand>() {
                Ok(command) => {
                    let quit = command == UserCommand::Quit;
                    if tx.send(Message::Input(command)).is_err() || quit {
                        return;
                    }
                }
                Err(err) => eprintln!("{err}\n{COMMAND_HELP}"),
            }
        }
        let _ = tx.send(Message::Shutdown);
    });
}
