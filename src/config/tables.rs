use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// On-disk layout of `conf/config.toml`, one table per concern.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    polling: PollingConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            server_url: tables.server.url,
            request_timeout_secs: tables.server.request_timeout_secs,
            job_poll_interval_ms: tables.polling.job_interval_ms,
            sidebar_poll_interval_ms: tables.polling.sidebar_interval_ms,
            output_tick_ms: tables.playback.output_tick_ms,
            playback_speed: tables.playback.speed,
            playback_volume: tables.playback.volume,
            resume_from_last_played: tables.playback.resume_from_last_played,
            cache_dir: tables.cache.dir,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            server: ServerConfig {
                url: config.server_url.clone(),
                request_timeout_secs: config.request_timeout_secs,
            },
            polling: PollingConfig {
                job_interval_ms: config.job_poll_interval_ms,
                sidebar_interval_ms: config.sidebar_poll_interval_ms,
            },
            playback: PlaybackConfig {
                speed: config.playback_speed,
                volume: config.playback_volume,
                resume_from_last_played: config.resume_from_last_played,
                output_tick_ms: config.output_tick_ms,
            },
            cache: CacheConfig {
                dir: config.cache_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ServerConfig {
    #[serde(default = "defaults::default_server_url")]
    url: String,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: f32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: defaults::default_server_url(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PollingConfig {
    #[serde(default = "defaults::default_job_poll_interval_ms")]
    job_interval_ms: u64,
    #[serde(default = "defaults::default_sidebar_poll_interval_ms")]
    sidebar_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            job_interval_ms: defaults::default_job_poll_interval_ms(),
            sidebar_interval_ms: defaults::default_sidebar_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_playback_speed")]
    speed: f32,
    #[serde(default = "defaults::default_playback_volume")]
    volume: f32,
    #[serde(default = "defaults::default_resume_from_last_played")]
    resume_from_last_played: bool,
    #[serde(default = "defaults::default_output_tick_ms")]
    output_tick_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            speed: defaults::default_playback_speed(),
            volume: defaults::default_playback_volume(),
            resume_from_last_played: defaults::default_resume_from_last_played(),
            output_tick_ms: defaults::default_output_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct CacheConfig {
    #[serde(default = "defaults::default_cache_dir")]
    dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
