use loglens_connector::app::{Config, ConfigError, LogFormat, LogLevel};
use serial_test::serial;
use std::{env, io::Write, time::Duration};
use tempfile::NamedTempFile;

// Clap reads these too, so every test that parses starts from a clean slate
fn clean_all_env_vars() {
    let env_vars = [
        "LOGLENS_ENDPOINT",
        "LOGLENS_TOKEN",
        "LOGLENS_CATEGORY",
        "LOGLENS_INDEX",
        "LOGLENS_DEBUG",
        "MAX_BATCH_SIZE",
        "MAX_QUEUE_SIZE",
        "REQUEST_TIMEOUT_SECS",
        "CONNECT_TIMEOUT_SECS",
        "HEALTH_PATH",
        "ENABLE_COMPRESSION",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "CONFIG_FILE",
    ];

    unsafe {
        for var in &env_vars {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_config_from_args() {
    clean_all_env_vars();

    let args = vec![
        "loglens-connector",
        "--endpoint",
        "https://collector.example.com/v1/logs",
        "--token",
        "abc123",
        "--category",
        "payments",
        "--index",
        "prod-logs",
        "--max-batch-size",
        "50",
        "--max-queue-size",
        "1000",
        "--log-level",
        "debug",
        "--log-format",
        "json",
    ];

    let config = Config::from_args(args).unwrap();

    assert_eq!(config.endpoint, "https://collector.example.com/v1/logs");
    assert_eq!(config.token, "abc123");
    assert_eq!(config.category, "payments");
    assert_eq!(config.index, "prod-logs");
    assert_eq!(config.max_batch_size, 50);
    assert_eq!(config.max_queue_size, 1000);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(!config.debug);
}

#[test]
#[serial]
fn test_defaults_match_connector_limits() {
    clean_all_env_vars();

    let config = Config::from_args(["loglens-connector", "--token", "t"]).unwrap();

    assert_eq!(config.max_batch_size, 20);
    assert_eq!(config.max_queue_size, 5000);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.connect_timeout, Duration::from_secs(10));

    let connector = config.connector_config();
    assert_eq!(connector.category, "loglens");
    assert_eq!(connector.worker.max_batch_size, 20);
    assert_eq!(connector.worker.max_queue_size, 5000);

    let sink = config.sink_config();
    assert_eq!(sink.token, "t");
    assert_eq!(sink.request_timeout, Duration::from_secs(30));
    assert!(sink.health_path.is_none());
}

#[test]
#[serial]
fn test_token_required_unless_debug() {
    clean_all_env_vars();

    let result = Config::from_args(["loglens-connector"]);
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

    let config = Config::from_args(["loglens-connector", "--debug"]).unwrap();
    assert!(config.debug);
    assert!(config.token.is_empty());
}

#[test]
#[serial]
fn test_config_from_environment() {
    clean_all_env_vars();
    unsafe {
        env::set_var("LOGLENS_ENDPOINT", "http://collector:9000/ingest");
        env::set_var("LOGLENS_TOKEN", "env-token");
        env::set_var("LOGLENS_CATEGORY", "worker");
        env::set_var("MAX_BATCH_SIZE", "10");
        env::set_var("ENABLE_COMPRESSION", "true");
        env::set_var("HEALTH_PATH", "/healthz");
        env::set_var("LOG_LEVEL", "warn");
        env::set_var("LOG_FORMAT", "json");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(config.endpoint, "http://collector:9000/ingest");
    assert_eq!(config.token, "env-token");
    assert_eq!(config.category, "worker");
    assert_eq!(config.max_batch_size, 10);
    assert!(config.enable_compression);
    assert_eq!(config.health_path.as_deref(), Some("/healthz"));
    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.log_format, LogFormat::Json);

    clean_all_env_vars();
}

#[test]
#[serial]
fn test_invalid_environment_values() {
    clean_all_env_vars();
    unsafe {
        env::set_var("LOGLENS_TOKEN", "t");
        env::set_var("MAX_BATCH_SIZE", "lots");
    }
    assert!(matches!(Config::from_env(), Err(ConfigError::EnvError(_))));

    unsafe {
        env::remove_var("MAX_BATCH_SIZE");
        env::set_var("LOG_FORMAT", "xml");
    }
    assert!(matches!(Config::from_env(), Err(ConfigError::EnvError(_))));

    clean_all_env_vars();
}

#[test]
fn test_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
endpoint = "https://collector.internal/v1/logs"
token = "file-token"
index = "staging"
max_batch_size = 25
max_queue_size = 2500
request_timeout_secs = 5
enable_compression = true
log_level = "trace"
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.endpoint, "https://collector.internal/v1/logs");
    assert_eq!(config.token, "file-token");
    assert_eq!(config.index, "staging");
    assert_eq!(config.max_batch_size, 25);
    assert_eq!(config.max_queue_size, 2500);
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    // Unset keys fall back to defaults
    assert_eq!(config.category, "loglens");
    assert_eq!(config.connect_timeout, Duration::from_secs(10));
    assert!(config.enable_compression);
    assert_eq!(config.log_level, LogLevel::Trace);
}

#[test]
#[serial]
fn test_config_file_flag_loads_file() {
    clean_all_env_vars();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "token = \"from-file\"\ncategory = \"batch-jobs\"").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let config = Config::load([
        "loglens-connector",
        "--token",
        "from-cli",
        "--config-file",
        path.as_str(),
    ])
    .unwrap();

    assert_eq!(config.token, "from-file");
    assert_eq!(config.category, "batch-jobs");
}

#[test]
#[serial]
fn test_token_supplied_only_by_config_file() {
    clean_all_env_vars();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "token = \"from-file\"").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let config = Config::load(["loglens-connector", "--config-file", path.as_str()]).unwrap();
    assert_eq!(config.token, "from-file");
}

#[test]
#[serial]
fn test_config_file_without_token_is_rejected() {
    clean_all_env_vars();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "category = \"no-credentials\"").unwrap();
    let path = file.path().to_string_lossy().to_string();

    let result = Config::load([
        "loglens-connector",
        "--token",
        "from-cli",
        "--config-file",
        path.as_str(),
    ]);
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_batch_size = \"twenty\"").unwrap();

    assert!(matches!(
        Config::from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_validation() {
    let valid = Config {
        token: "t".to_string(),
        ..Config::default()
    };
    valid.validate().unwrap();

    let bad_scheme = Config {
        endpoint: "ftp://collector/logs".to_string(),
        ..valid.clone()
    };
    assert!(matches!(
        bad_scheme.validate(),
        Err(ConfigError::InvalidUrl(_))
    ));

    let zero_batch = Config {
        max_batch_size: 0,
        ..valid.clone()
    };
    assert!(zero_batch.validate().is_err());

    let queue_smaller_than_batch = Config {
        max_batch_size: 100,
        max_queue_size: 50,
        ..valid.clone()
    };
    assert!(queue_smaller_than_batch.validate().is_err());

    let empty_category = Config {
        category: String::new(),
        ..valid.clone()
    };
    assert!(empty_category.validate().is_err());

    let zero_timeout = Config {
        request_timeout_secs: 0,
        ..valid
    };
    assert!(zero_timeout.validate().is_err());
}

#[test]
fn test_log_level_conversion() {
    assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warn);
    assert!("verbose".parse::<LogLevel>().is_err());
    assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
}
