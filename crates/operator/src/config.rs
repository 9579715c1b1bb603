use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub drive: DriveConfig,
    pub capture: CaptureConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

/// Slack incoming webhook settings handed to the notifier at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: Option<String>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    pub credentials_path: PathBuf,
    pub folder_id: String,
}

impl DriveConfig {
    /// Browsable folder link reported for remediations that carry no dump.
    pub fn folder_link(&self) -> String {
        format!("https://drive.google.com/drive/u/0/folders/{}", self.folder_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub output_dir: PathBuf,
    pub command_timeout_secs: u64,
    pub retention_hours: i64,
    /// Offset of the artifact store's reference clock, in minutes east of UTC.
    pub store_utc_offset_minutes: i32,
}

impl CaptureConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("/tmp"),
            command_timeout_secs: 600,
            retention_hours: 48,
            store_utc_offset_minutes: 330,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            queue_capacity: 64,
        }
    }
}

/// Per-request bounds for the Drive, token and Slack HTTP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn client(&self) -> crate::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .connect_timeout(self.connect_timeout())
            .build()
            .map_err(|e| crate::Error::Config(format!("cannot build HTTP client: {}", e)))
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `None` logs to stdout.
    pub file_path: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> crate::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| crate::Error::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = CaptureConfig::default();
        let worker_defaults = WorkerConfig::default();
        let http_defaults = HttpConfig::default();

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:80".to_string()),
            },
            slack: SlackConfig {
                webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok().filter(|s| !s.is_empty()),
                channel: std::env::var("CHANNEL_NAME").ok().filter(|s| !s.is_empty()),
            },
            drive: DriveConfig {
                credentials_path: std::env::var("DRIVE_CREDENTIALS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("pg-devops-infra.json")),
                folder_id: std::env::var("DRIVE_FOLDER_ID").unwrap_or_default(),
            },
            capture: CaptureConfig {
                output_dir: std::env::var("DUMP_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.output_dir),
                command_timeout_secs: env_parse(
                    "CAPTURE_COMMAND_TIMEOUT_SECS",
                    defaults.command_timeout_secs,
                )?,
                retention_hours: env_parse("RETENTION_HOURS", defaults.retention_hours)?,
                store_utc_offset_minutes: env_parse(
                    "STORE_UTC_OFFSET_MINUTES",
                    defaults.store_utc_offset_minutes,
                )?,
            },
            workers: WorkerConfig {
                pool_size: env_parse("WORKER_POOL_SIZE", worker_defaults.pool_size)?,
                queue_capacity: env_parse("WORKER_QUEUE_CAPACITY", worker_defaults.queue_capacity)?,
            },
            http: HttpConfig {
                timeout_secs: env_parse("HTTP_TIMEOUT_SECS", http_defaults.timeout_secs)?,
                connect_timeout_secs: env_parse(
                    "HTTP_CONNECT_TIMEOUT_SECS",
                    http_defaults.connect_timeout_secs,
                )?,
            },
            log: LogConfig {
                file_path: std::env::var("LOG_FILE_PATH")
                    .ok()
                    .filter(|p| !p.is_empty() && p != "/dev/stdout")
                    .map(PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.drive.folder_id.is_empty() {
            return Err(crate::Error::Config(
                "DRIVE_FOLDER_ID must be set to upload diagnostic dumps".to_string(),
            ));
        }
        if self.workers.pool_size == 0 {
            return Err(crate::Error::Config("WORKER_POOL_SIZE must be at least 1".to_string()));
        }
        if self.workers.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "WORKER_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 || self.http.connect_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "HTTP_TIMEOUT_SECS and HTTP_CONNECT_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        if self.capture.retention_hours <= 0 {
            return Err(crate::Error::Config("RETENTION_HOURS must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:80".to_string(),
            },
            slack: SlackConfig::default(),
            drive: DriveConfig {
                credentials_path: PathBuf::from("pg-devops-infra.json"),
                folder_id: "selfheal-dumps".to_string(),
            },
            capture: CaptureConfig::default(),
            workers: WorkerConfig::default(),
            http: HttpConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers.pool_size, 5);
        assert_eq!(config.capture.retention(), chrono::Duration::hours(48));
        assert_eq!(config.capture.command_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn missing_folder_is_rejected() {
        let mut config = Config::default();
        config.drive.folder_id.clear();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut config = Config::default();
        config.workers.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn http_requests_are_bounded_by_default() {
        let config = Config::default();
        assert_eq!(config.http.timeout(), Duration::from_secs(60));
        assert_eq!(config.http.connect_timeout(), Duration::from_secs(10));
        assert!(config.http.client().is_ok());

        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn folder_link_uses_folder_id() {
        let config = Config::default();
        assert_eq!(
            config.drive.folder_link(),
            "https://drive.google.com/drive/u/0/folders/selfheal-dumps"
        );
    }
}
