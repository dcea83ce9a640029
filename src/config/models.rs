use serde::Deserialize;
use std::time::Duration;

/// Limits applied to runtime-adjustable settings.
pub const MIN_PLAYBACK_SPEED: f32 = 0.25;
pub const MAX_PLAYBACK_SPEED: f32 = 4.0;
pub const MIN_PLAYBACK_VOLUME: f32 = 0.0;
pub const MAX_PLAYBACK_VOLUME: f32 = 2.0;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Flat client configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_server_url")]
    pub server_url: String,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: f32,
    #[serde(default = "crate::config::defaults::default_job_poll_interval_ms")]
    pub job_poll_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_sidebar_poll_interval_ms")]
    pub sidebar_poll_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_output_tick_ms")]
    pub output_tick_ms: u64,
    #[serde(default = "crate::config::defaults::default_playback_speed")]
    pub playback_speed: f32,
    #[serde(default = "crate::config::defaults::default_playback_volume")]
    pub playback_volume: f32,
    #[serde(default = "crate::config::defaults::default_resume_from_last_played")]
    pub resume_from_last_played: bool,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_url: crate::config::defaults::default_server_url(),
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            job_poll_interval_ms: crate::config::defaults::default_job_poll_interval_ms(),
            sidebar_poll_interval_ms: crate::config::defaults::default_sidebar_poll_interval_ms(),
            output_tick_ms: crate::config::defaults::default_output_tick_ms(),
            playback_speed: crate::config::defaults::default_playback_speed(),
            playback_volume: crate::config::defaults::default_playback_volume(),
            resume_from_last_played: crate::config::defaults::default_resume_from_last_played(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    /// Keep values that feed timers and the audio output within usable bounds,
    /// whatever the config file says.
    pub fn clamped(mut self) -> Self {
        self.playback_speed = clamp_speed(self.playback_speed);
        self.playback_volume = clamp_volume(self.playback_volume);
        self.job_poll_interval_ms = self.job_poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
        self.sidebar_poll_interval_ms = self.sidebar_poll_interval_ms.max(MIN_POLL_INTERVAL_MS);
        self.output_tick_ms = self.output_tick_ms.clamp(10, 1000);
        if !self.request_timeout_secs.is_finite() || self.request_timeout_secs <= 0.0 {
            self.request_timeout_secs = crate::config::defaults::default_request_timeout_secs();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.request_timeout_secs)
    }

    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_ms)
    }

    pub fn sidebar_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sidebar_poll_interval_ms)
    }

    pub fn output_tick(&self) -> Duration {
        Duration::from_millis(self.output_tick_ms)
    }
}

pub fn clamp_speed(speed: f32) -> f32 {
    if !speed.is_finite() {
        return crate::config::defaults::default_playback_speed();
    }
    speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
}

pub fn clamp_volume(volume: f32) -> f32 {
    if !volume.is_finite() {
        return crate::config::defaults::default_playback_volume();
    }
    volume.clamp(MIN_PLAYBACK_VOLUME, MAX_PLAYBACK_VOLUME)
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
