use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use vidtrack_core::ReconnectPolicy;
use vidtrack_engine::{ChannelSettings, EngineConfig, UploadSettings};

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid server url {url:?}: {message}")]
    InvalidServer { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum ReconnectConfig {
    Fixed { delay_ms: u64 },
    Exponential { base_ms: u64, max_ms: u64 },
}

impl From<ReconnectConfig> for ReconnectPolicy {
    fn from(config: ReconnectConfig) -> Self {
        match config {
            ReconnectConfig::Fixed { delay_ms } => {
                ReconnectPolicy::Fixed(Duration::from_millis(delay_ms))
            }
            ReconnectConfig::Exponential { base_ms, max_ms } => ReconnectPolicy::Exponential {
                base: Duration::from_millis(base_ms),
                max: Duration::from_millis(max_ms.max(base_ms)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Client settings, read from a RON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct ClientConfig {
    pub server: String,
    pub upload_path: String,
    pub socket_path: String,
    pub reconnect: ReconnectConfig,
    pub connect_timeout_ms: u64,
    pub upload_timeout_ms: u64,
    pub log: LogTarget,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:8000".to_string(),
            upload_path: "/upload/".to_string(),
            socket_path: "/ws/".to_string(),
            reconnect: ReconnectConfig::Fixed { delay_ms: 3000 },
            connect_timeout_ms: 10_000,
            upload_timeout_ms: 300_000,
            log: LogTarget::File,
            log_level: LogLevel::Info,
            log_file: None,
        }
    }
}

impl ClientConfig {
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidServer {
            url: self.server.clone(),
            message,
        };
        let url = Url::parse(&self.server).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(url)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let server = self.server_url()?;

        let mut upload = UploadSettings::for_server(&server, &self.upload_path).map_err(|err| {
            ConfigError::InvalidServer {
                url: self.server.clone(),
                message: err.to_string(),
            }
        })?;
        upload.connect_timeout = Duration::from_millis(self.connect_timeout_ms);
        upload.request_timeout = Duration::from_millis(self.upload_timeout_ms);

        let mut channel = ChannelSettings::new(server);
        channel.socket_path = self.socket_path.clone();
        channel.reconnect = self.reconnect.into();
        channel.connect_timeout = Duration::from_millis(self.connect_timeout_ms);

        Ok(EngineConfig { upload, channel })
    }
}

/// Load the config at `path`, or defaults when no path is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ClientConfig = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    engine_info!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("vidtrack.ron");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_path_gives_defaults() {
        assert_eq!(load_config(None).unwrap(), ClientConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"(
                server: "https://videos.example.com",
                reconnect: Exponential(base_ms: 500, max_ms: 8000),
                log: Both,
            )"#,
        );

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server, "https://videos.example.com");
        assert_eq!(
            config.reconnect,
            ReconnectConfig::Exponential {
                base_ms: 500,
                max_ms: 8000
            }
        );
        assert_eq!(config.log, LogTarget::Both);
        assert_eq!(config.upload_path, "/upload/");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn missing_file_and_bad_syntax_are_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_config(Some(&dir.path().join("absent.ron"))),
            Err(ConfigError::Io { .. })
        ));

        let path = write_config(&dir, "(server: ");
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn engine_config_derives_endpoints() {
        let config = ClientConfig {
            server: "https://videos.example.com:8443".to_string(),
            reconnect: ReconnectConfig::Fixed { delay_ms: 1500 },
            ..ClientConfig::default()
        };
        let engine = config.engine_config().unwrap();

        assert_eq!(
            engine.upload.endpoint.as_str(),
            "https://videos.example.com:8443/upload/"
        );
        assert_eq!(
            engine.channel.reconnect,
            ReconnectPolicy::Fixed(Duration::from_millis(1500))
        );
        assert_eq!(engine.channel.socket_path, "/ws/");
    }

    #[test]
    fn non_http_server_is_rejected() {
        let config = ClientConfig {
            server: "ftp://videos.example.com".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.engine_config(),
            Err(ConfigError::InvalidServer { .. })
        ));
    }
}
