//! Entry point for the TTS viewer.
//!
//! Parses the subcommand, loads `conf/config.toml`, then either runs the
//! interactive viewer for one job or performs a one-shot job-list action.

use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};
use tts_viewer::api::ApiClient;
use tts_viewer::config::{AppConfig, load_config};
use tts_viewer::page::PageConfig;
use tts_viewer::playback::{PlaybackController, RodioOutput};
use tts_viewer::runtime::{self, COMMAND_HELP, Message, Runtime};
use tts_viewer::sidebar::Sidebar;

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage:
  tts-viewer view <job-id> <text-file> [last-played-index]
  tts-viewer jobs
  tts-viewer rename <job-id> <title>
  tts-viewer delete <job-id>";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    View {
        job_id: String,
        text_path: String,
        last_played_index: i64,
    },
    Jobs,
    Rename {
        job_id: String,
        title: String,
    },
    Delete {
        job_id: String,
    },
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let command = parse_args(env::args().skip(1).collect())?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    let client = ApiClient::new(&config.server_url, config.request_timeout())?;
    info!(
        server = %client.base_url(),
        level = %config.log_level,
        "Starting TTS viewer"
    );

    match command {
        Command::View {
            job_id,
            text_path,
            last_played_index,
        } => run_viewer(config, client, job_id, &text_path, last_played_index),
        Command::Jobs => {
            let mut sidebar = Sidebar::new();
            sidebar.apply_active_jobs(client.jobs_status()?);
            runtime::print_jobs(&sidebar);
            Ok(())
        }
        Command::Rename { job_id, title } => {
            client.rename(&job_id, &title).context("rename failed")?;
            println!("Renamed {job_id} to {title:?}");
            Ok(())
        }
        Command::Delete { job_id } => {
            client.delete(&job_id).context("delete failed")?;
            println!("Deleted {job_id}");
            Ok(())
        }
    }
}

fn run_viewer(
    config: AppConfig,
    client: ApiClient,
    job_id: String,
    text_path: &str,
    last_played_index: i64,
) -> Result<()> {
    let text = fs::read_to_string(text_path)
        .with_context(|| format!("Reading text file {text_path}"))?;
    let page = PageConfig::view(job_id, text, last_played_index);
    let output = RodioOutput::new(client.clone(), Path::new(&config.cache_dir), &page.job_id)?;
    let controller = PlaybackController::create(&page, &config, output)?;
    info!(
        job_id = %page.job_id,
        chunks = controller.chunks().len(),
        "Opened job"
    );

    let viewer = Runtime::new(controller, client, config);
    let tx = viewer.sender();
    let ctrlc_tx = tx.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Message::Shutdown);
    }) {
        warn!("Failed to install Ctrl-C handler: {err}");
    }
    runtime::spawn_input_reader(tx);
    println!("{COMMAND_HELP}");
    viewer.run()
}

fn parse_args(args: Vec<String>) -> Result<Command> {
    let mut args = args.into_iter();
    let sub = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
    let command = match sub.as_str() {
        "view" => {
            let job_id = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
            let text_path = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
            let last_played_index = match args.next() {
                Some(raw) => raw
                    .parse::<i64>()
                    .with_context(|| format!("Invalid last-played index {raw:?}"))?,
                None => -1,
            };
            Command::View {
                job_id,
                text_path,
                last_played_index,
            }
        }
        "jobs" => Command::Jobs,
        "rename" => {
            let job_id = args.next().ok_or_else(|| anyhow!("{USAGE}"))?;
            let title = args.collect::<Vec<_>>().join(" ");
            if title.trim().is_empty() {
                bail!("{USAGE}");
            }
            Command::Rename { job_id, title }
        }
        "delete" => Command::Delete {
            job_id: args.next().ok_or_else(|| anyhow!("{USAGE}"))?,
        },
        other => bail!("Unknown command {other:?}\n{USAGE}"),
    };
    Ok(command)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn view_defaults_to_unplayed() {
        let command = parse_args(args(&["view", "job", "book.txt"])).expect("valid");
        assert_eq!(
            command,
            Command::View {
                job_id: "job".into(),
                text_path: "book.txt".into(),
                last_played_index: -1
            }
        );
    }

    #[test]
    fn rename_joins_title_words() {
        let command = parse_args(args(&["rename", "job", "A", "Title"])).expect("valid");
        assert_eq!(
            command,
            Command::Rename {
                job_id: "job".into(),
                title: "A Title".into()
            }
        );
    }

    #[test]
    fn rejects_missing_and_unknown_commands() {
        assert!(parse_args(Vec::new()).is_err());
        assert!(parse_args(args(&["view", "job"])).is_err());
        assert!(parse_args(args(&["view", "job", "t.txt", "x"])).is_err());
        assert!(parse_args(args(&["launch"])).is_err());
    }
}
