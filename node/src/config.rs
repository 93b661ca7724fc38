use std::env;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Quiescence window before a local typing change is written.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_millis(500);

/// Runtime configuration for the node service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub build_id: String,
    /// Directory of the sled database.
    pub data_dir: PathBuf,
    pub typing_debounce: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let build_id =
            env::var("DUOCHAT_BUILD_ID").unwrap_or_else(|_| Uuid::new_v4().to_string());
        let data_dir = env::var("DUOCHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/node"));
        let typing_debounce = match env::var("DUOCHAT_TYPING_DEBOUNCE_MS") {
            Ok(raw) => Duration::from_millis(raw.parse().map_err(|e| {
                anyhow::anyhow!("DUOCHAT_TYPING_DEBOUNCE_MS must be milliseconds: {e}")
            })?),
            Err(_) => DEFAULT_TYPING_DEBOUNCE,
        };
        Ok(Self {
            host,
            port,
            build_id,
            data_dir,
            typing_debounce,
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default().with_typing_debounce(self.typing_debounce)
    }
}

/// Per-conversation engine settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub typing_debounce: Duration,
}

impl SessionConfig {
    pub fn with_typing_debounce(mut self, window: Duration) -> Self {
        self.typing_debounce = window;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            typing_debounce: DEFAULT_TYPING_DEBOUNCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_carries_typing_window() {
        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            build_id: "test".into(),
            data_dir: PathBuf::from("unused"),
            typing_debounce: Duration::from_millis(250),
        };
        assert_eq!(
            config.session_config().typing_debounce,
            Duration::from_millis(250)
        );
        assert_eq!(
            SessionConfig::default().typing_debounce,
            DEFAULT_TYPING_DEBOUNCE
        );
    }
}
