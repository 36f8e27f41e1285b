// Environment-driven configuration tests
// Serialized because they mutate process environment variables

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use water_tracker_service::app::{Application, MAX_PERIOD_MINUTES};
use water_tracker_service::config::{Config, ConfigError, DataSource};
use water_tracker_service::store::ReadingStore;

const VARS: [&str; 9] = [
    "DATA_SOURCE",
    "READINGS_FILE",
    "TABLE_URL",
    "TABLE_API_KEY",
    "ACCESS_PASSWORD",
    "SERVER_HOST",
    "SERVER_PORT",
    "REFRESH_INTERVAL_MINUTES",
    "SESSION_IDLE_MINUTES",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(
        config.data_source,
        DataSource::File {
            path: PathBuf::from("eau.csv")
        }
    );
    assert_eq!(config.access_password, None);
    assert_eq!(config.server_addr(), "0.0.0.0:8080");
    assert_eq!(config.refresh_interval_minutes, 5);
    assert_eq!(config.session_idle_minutes, 60);
}

#[test]
#[serial]
fn test_table_source() {
    clear_env();
    env::set_var("DATA_SOURCE", "Table");
    env::set_var("TABLE_URL", "https://sheets.example.com/api/rows");
    env::set_var("TABLE_API_KEY", "key-123");
    env::set_var("ACCESS_PASSWORD", "s3cret");

    let config = Config::from_env().unwrap();

    assert_eq!(
        config.data_source,
        DataSource::Table {
            url: "https://sheets.example.com/api/rows".to_string(),
            api_key: Some("key-123".to_string()),
        }
    );
    assert_eq!(config.access_password.as_deref(), Some("s3cret"));
    let debug = format!("{:?}", config);
    assert!(!debug.contains("s3cret"));
    assert!(!debug.contains("key-123"));
    clear_env();
}

#[test]
#[serial]
fn test_table_source_requires_url() {
    clear_env();
    env::set_var("DATA_SOURCE", "table");

    let result = Config::from_env();

    assert!(matches!(result, Err(ConfigError::Missing("TABLE_URL"))));
    clear_env();
}

#[test]
#[serial]
fn test_unknown_source() {
    clear_env();
    env::set_var("DATA_SOURCE", "ftp");

    let result = Config::from_env();

    assert!(matches!(result, Err(ConfigError::UnknownDataSource(s)) if s == "ftp"));
    clear_env();
}

#[test]
#[serial]
fn test_unparseable_numbers_fall_back() {
    clear_env();
    env::set_var("SERVER_PORT", "eighty");
    env::set_var("REFRESH_INTERVAL_MINUTES", "soon");
    env::set_var("SESSION_IDLE_MINUTES", "-3");
    env::set_var("ACCESS_PASSWORD", "   ");

    let config = Config::from_env().unwrap();

    assert_eq!(config.server_port, 8080);
    assert_eq!(config.refresh_interval_minutes, 5);
    assert_eq!(config.session_idle_minutes, 60);
    assert_eq!(config.access_password, None);
    clear_env();
}

#[test]
#[serial]
fn test_state_from_config() {
    clear_env();
    env::set_var("READINGS_FILE", "/tmp/readings.csv");
    env::set_var("REFRESH_INTERVAL_MINUTES", "0");

    let config = Config::from_env().unwrap();
    let state = Application::state_from_config(&config);

    assert!(state.gate.is_open());
    assert_eq!(state.refresh_interval.as_secs(), 60);
    assert_eq!(state.sessions.idle_timeout().as_secs(), 60 * 60);
    assert!(matches!(
        state.dashboard_service.store(),
        ReadingStore::File(store) if store.path() == std::path::Path::new("/tmp/readings.csv")
    ));

    // Values that would overflow a seconds count are capped, not wrapped
    env::set_var("REFRESH_INTERVAL_MINUTES", (u64::MAX / 30).to_string());
    env::set_var("SESSION_IDLE_MINUTES", u64::MAX.to_string());
    let config = Config::from_env().unwrap();
    let state = Application::state_from_config(&config);

    assert_eq!(state.refresh_interval.as_secs(), MAX_PERIOD_MINUTES * 60);
    assert_eq!(state.sessions.idle_timeout().as_secs(), MAX_PERIOD_MINUTES * 60);
    clear_env();
}
