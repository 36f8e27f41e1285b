use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Unknown DATA_SOURCE '{0}' (expected 'file' or 'table')")]
    UnknownDataSource(String),
}

/// Where readings are stored
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// Local CSV file with a `date,volume` header
    File { path: PathBuf },
    /// Hosted table service speaking JSON over HTTP
    Table { url: String, api_key: Option<String> },
}

#[derive(Clone)]
pub struct Config {
    pub data_source: DataSource,
    pub access_password: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub refresh_interval_minutes: u64,
    /// Sessions with no request for this long are ended
    pub session_idle_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_source = match env::var("DATA_SOURCE")
            .unwrap_or_else(|_| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => DataSource::File {
                path: env::var("READINGS_FILE")
                    .unwrap_or_else(|_| "eau.csv".to_string())
                    .into(),
            },
            "table" => DataSource::Table {
                url: env::var("TABLE_URL").map_err(|_| ConfigError::Missing("TABLE_URL"))?,
                api_key: non_empty_var("TABLE_API_KEY"),
            },
            other => return Err(ConfigError::UnknownDataSource(other.to_string())),
        };

        Ok(Config {
            data_source,
            access_password: non_empty_var("ACCESS_PASSWORD"),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            refresh_interval_minutes: env::var("REFRESH_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            session_idle_minutes: env::var("SESSION_IDLE_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

// Secrets stay out of startup logs
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data_source = match &self.data_source {
            DataSource::File { path } => format!("file({})", path.display()),
            DataSource::Table { url, api_key } => format!(
                "table({}, api_key={})",
                url,
                if api_key.is_some() { "set" } else { "unset" }
            ),
        };
        f.debug_struct("Config")
            .field("data_source", &data_source)
            .field("access_password", &self.access_password.as_ref().map(|_| "***"))
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("session_idle_minutes", &self.session_idle_minutes)
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
