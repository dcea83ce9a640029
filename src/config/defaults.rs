pub(crate) fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

pub(crate) fn default_request_timeout_secs() -> f32 {
    10.0
}

pub(crate) fn default_job_poll_interval_ms() -> u64 {
    1000
}

pub(crate) fn default_sidebar_poll_interval_ms() -> u64 {
    2000
}

pub(crate) fn default_output_tick_ms() -> u64 {
    50
}

pub(crate) fn default_playback_speed() -> f32 {
    1.0
}

pub(crate) fn default_playback_volume() -> f32 {
    1.0
}

pub(crate) fn default_resume_from_last_played() -> bool {
    true
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
