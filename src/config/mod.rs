//! Configuration loading for the playback client.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! defaults so the client can still start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{
    AppConfig, LogLevel, MAX_PLAYBACK_SPEED, MAX_PLAYBACK_VOLUME, MIN_PLAYBACK_SPEED,
    MIN_PLAYBACK_VOLUME, MIN_POLL_INTERVAL_MS, clamp_speed, clamp_volume,
};
