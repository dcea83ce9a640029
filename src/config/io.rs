use super::models::AppConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const TABLE_KEYS: [&str; 5] = ["server", "polling", "playback", "cache", "logging"];

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            AppConfig::default()
        }
    }
}

/// Parse either the sectioned layout or a flat list of `AppConfig` keys.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let table: toml::Table = toml::from_str(contents).context("Parsing config TOML")?;
    let sectioned = TABLE_KEYS.iter().any(|key| table.contains_key(*key));
    let config = if sectioned {
        let tables: ConfigTables =
            toml::from_str(contents).context("Reading sectioned config tables")?;
        AppConfig::from(tables)
    } else {
        toml::from_str::<AppConfig>(contents).context("Reading flat config keys")?
    };
    Ok(config.clamped())
}

pub fn serialize_config(config: &AppConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Serializing config")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn sectioned_config_maps_onto_flat_fields() {
        let cfg = parse_config(
            r#"
            [server]
            url = "http://tts.local:8080"

            [polling]
            job_interval_ms = 500

            [playback]
            speed = 1.5

            [logging]
            log_level = "debug"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.server_url, "http://tts.local:8080");
        assert_eq!(cfg.job_poll_interval_ms, 500);
        assert_eq!(cfg.sidebar_poll_interval_ms, 2000);
        assert!((cfg.playback_speed - 1.5).abs() < f32::EPSILON);
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn flat_config_is_still_accepted() {
        let cfg = parse_config("server_url = \"http://flat:1\"\nplayback_volume = 0.5\n")
            .expect("valid config");
        assert_eq!(cfg.server_url, "http://flat:1");
        assert!((cfg.playback_volume - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = parse_config(
            r#"
            [polling]
            job_interval_ms = 5
            [playback]
            speed = 9.0
            volume = -1.0
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.job_poll_interval_ms, 100);
        assert!((cfg.playback_speed - 4.0).abs() < f32::EPSILON);
        assert!(cfg.playback_volume.abs() < f32::EPSILON);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = AppConfig::default();
        cfg.server_url = "http://example:9".to_string();
        cfg.playback_speed = 2.0;
        let text = serialize_config(&cfg).expect("serializes");
        assert!(text.contains("[server]"));
        let parsed = parse_config(&text).expect("parses");
        assert_eq!(parsed.server_url, cfg.server_url);
        assert!((parsed.playback_speed - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("does/not/exist.toml"));
        assert_eq!(cfg.server_url, AppConfig::default().server_url);
    }
}
