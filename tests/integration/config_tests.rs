use clap::Parser;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use neardupe::cli::{Cli, Commands};
use neardupe::config::{Config, ConfigError};
use neardupe::similarity::HashMetric;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // No Env provider here to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config = Config::from_figment(figment).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("NEARDUPE_CFGTEST_NAME_THRESHOLD", "0.75");
    std::env::set_var("NEARDUPE_CFGTEST_HASH_METRIC", "fuzzy");
    std::env::set_var("NEARDUPE_CFGTEST_STRICT", "true");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("NEARDUPE_CFGTEST_"));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.name_threshold, 0.75);
    assert_eq!(config.hash_metric, HashMetric::FuzzyScore);
    assert!(config.strict);

    std::env::remove_var("NEARDUPE_CFGTEST_NAME_THRESHOLD");
    std::env::remove_var("NEARDUPE_CFGTEST_HASH_METRIC");
    std::env::remove_var("NEARDUPE_CFGTEST_STRICT");
}

#[test]
fn test_config_load_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("neardupe.toml");
    fs::write(
        &config_path,
        r#"
name_threshold = 0.6
hash_threshold = 0.4
size_threshold = 0.2
follow_symlinks = true
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.name_threshold, 0.6);
    assert_eq!(config.hash_threshold, 0.4);
    assert_eq!(config.size_threshold, 0.2);
    assert!(config.follow_symlinks);
}

#[test]
fn test_config_file_out_of_range_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("neardupe.toml");
    fs::write(&config_path, "hash_threshold = -0.5\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ThresholdOutOfRange {
            option: "hash_threshold",
            ..
        }
    ));
}

#[test]
fn test_cli_overrides_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("neardupe.toml");
    fs::write(&config_path, "name_threshold = 0.6\nsize_threshold = 0.3\n").unwrap();

    let cli = Cli::try_parse_from(["neardupe", "scan", "/tmp", "-n", "0.95", "--threads", "3"])
        .unwrap();
    let Commands::Scan(args) = cli.command;

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&config_path));
    let config = Config::from_figment(figment)
        .unwrap()
        .merge_cli(&args)
        .unwrap();

    assert_eq!(config.name_threshold, 0.95);
    assert_eq!(config.size_threshold, 0.3);
    assert_eq!(config.threads, Some(3));

    let finder_config = config.finder_config().unwrap();
    assert_eq!(finder_config.policy.name(), 0.95);
    assert_eq!(finder_config.workers_for(10_000), 3);
}

#[test]
fn test_cli_zero_threads_rejected() {
    let cli = Cli::try_parse_from(["neardupe", "scan", "/tmp", "--threads", "0"]).unwrap();
    let Commands::Scan(args) = cli.command;
    let err = Config::default().merge_cli(&args).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidThreads));
}
