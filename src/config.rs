//! Application-level configuration loading for the game engine timings.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "DICE_TRIVIA_BACK_CONFIG_PATH";
/// Environment variable that supplies the admin API key.
const ADMIN_KEY_ENV: &str = "ADMIN_KEY";

/// Default answering window when finalize does not override it.
const DEFAULT_ANSWER_DURATION_MS: i64 = 60_000;
/// Default evaluating window granted once answering closes.
const DEFAULT_EVALUATION_WINDOW_MS: i64 = 300_000;
/// Default pause imposed between the end of one round and the next roll.
const DEFAULT_COOLDOWN_MS: i64 = 30_000;
/// Ceiling applied to a team's currency balance after each award.
const DEFAULT_CURRENCY_CAP: i64 = 1_000;
/// Default interval at which the MongoDB backend polls watched documents.
const DEFAULT_WATCH_POLL_INTERVAL_MS: u64 = 1_500;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Length of the answering window, unless finalize overrides it.
    pub answer_duration_ms: i64,
    /// Length of the evaluating window granted at begin_evaluation.
    pub evaluation_window_ms: i64,
    /// Pause between the end of one round and the next roll.
    pub cooldown_ms: i64,
    /// Ceiling applied to team currency after each award.
    pub currency_cap: i64,
    /// Interval at which polling store backends re-read watched documents.
    pub watch_poll_interval_ms: u64,
    /// Shared secret required on admin routes; `None` leaves them open.
    pub admin_key: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults. The admin key always comes from the environment so it never
    /// lands in a config file on disk.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded engine timings from config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.admin_key = env::var(ADMIN_KEY_ENV).ok().filter(|key| !key.is_empty());
        if config.admin_key.is_none() {
            warn!("no admin key configured; admin routes are open");
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            answer_duration_ms: DEFAULT_ANSWER_DURATION_MS,
            evaluation_window_ms: DEFAULT_EVALUATION_WINDOW_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            currency_cap: DEFAULT_CURRENCY_CAP,
            watch_poll_interval_ms: DEFAULT_WATCH_POLL_INTERVAL_MS,
            admin_key: None,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    answer_duration_ms: Option<i64>,
    evaluation_window_ms: Option<i64>,
    cooldown_ms: Option<i64>,
    currency_cap: Option<i64>,
    watch_poll_interval_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            answer_duration_ms: raw.answer_duration_ms.unwrap_or(defaults.answer_duration_ms),
            evaluation_window_ms: raw
                .evaluation_window_ms
                .unwrap_or(defaults.evaluation_window_ms),
            cooldown_ms: raw.cooldown_ms.unwrap_or(defaults.cooldown_ms),
            currency_cap: raw.currency_cap.unwrap_or(defaults.currency_cap),
            watch_poll_interval_ms: raw
                .watch_poll_interval_ms
                .unwrap_or(defaults.watch_poll_interval_ms),
            admin_key: None,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
