// ABOUTME: Integration tests for configuration loading and environment overrides.
// ABOUTME: Uses temp-env so overrides never leak between tests.

use std::time::Duration;

use cutover::config::{CONFIG_FILENAME, Config, resolve_deploy_dir};
use cutover::error::Error;
use cutover::types::{RotatableService, ServiceKind, StatefulService, Version};

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    temp_env::with_vars_unset(
        ["CUTOVER_REGISTRY", "CUTOVER_HEALTH_TIMEOUT", "CUTOVER_DRAIN_TIMEOUT"],
        || {
            let config = Config::load(dir.path()).unwrap();
            assert_eq!(config.project, "cutover");
            assert_eq!(config.health.timeout, Duration::from_secs(180));
            assert_eq!(config.drain, Duration::from_secs(30));
            assert_eq!(config.network_name(), "cutover-network");
        },
    );
}

#[test]
fn file_values_are_read_from_the_deploy_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILENAME),
        "project: acme\nregistry: ghcr.io/acme\ndrain: 5s\nhealth:\n  timeout: 1m\n",
    )
    .unwrap();

    temp_env::with_vars_unset(
        ["CUTOVER_REGISTRY", "CUTOVER_HEALTH_TIMEOUT", "CUTOVER_DRAIN_TIMEOUT"],
        || {
            let config = Config::load(dir.path()).unwrap();
            assert_eq!(config.project, "acme");
            assert_eq!(config.drain, Duration::from_secs(5));
            assert_eq!(config.health.timeout, Duration::from_secs(60));
            let image = config
                .rotatable_image(RotatableService::Platform, &Version::new("2.1.0").unwrap())
                .unwrap();
            assert_eq!(image.to_string(), "ghcr.io/acme/platform:2.1.0");
        },
    );
}

#[test]
fn environment_overrides_the_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILENAME),
        "registry: ghcr.io/acme\ndrain: 5s\n",
    )
    .unwrap();

    temp_env::with_vars(
        [
            ("CUTOVER_REGISTRY", Some("registry.local:5000/acme")),
            ("CUTOVER_HEALTH_TIMEOUT", Some("45")),
            ("CUTOVER_DRAIN_TIMEOUT", Some("0")),
        ],
        || {
            let config = Config::load(dir.path()).unwrap();
            assert_eq!(config.registry, "registry.local:5000/acme");
            assert_eq!(config.health.timeout, Duration::from_secs(45));
            assert!(config.drain.is_zero());
            let image = config
                .stateful_image(StatefulService::Db, &Version::new("1.0.0").unwrap())
                .unwrap();
            assert_eq!(image.to_string(), "registry.local:5000/acme/db:1.0.0");
        },
    );
}

#[test]
fn non_numeric_timeout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    temp_env::with_var("CUTOVER_HEALTH_TIMEOUT", Some("soon"), || {
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    });
}

#[test]
fn malformed_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILENAME), "drain: [not a duration").unwrap();

    let err = Config::load(dir.path()).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert!(err.to_string().contains(CONFIG_FILENAME));
}

#[test]
fn http_health_is_per_service() {
    let config = Config::from_yaml(
        "services:\n  platform:\n    http_health: http://acme-platform-{color}:3000/health\n  db:\n    http_health: http://127.0.0.1:7474/\n",
    )
    .unwrap();

    assert_eq!(
        config.http_health(ServiceKind::Rotatable(RotatableService::Platform)),
        Some("http://acme-platform-{color}:3000/health")
    );
    assert_eq!(config.http_health(ServiceKind::Rotatable(RotatableService::Rag)), None);
    assert_eq!(
        config.http_health_url(ServiceKind::Stateful(StatefulService::Db), None, "acme-db").as_deref(),
        Some("http://127.0.0.1:7474/")
    );
}

#[test]
fn rotatable_services_cannot_bind_host_ports() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILENAME),
        "services:\n  platform:\n    ports:\n      - \"8080:3000\"\n",
    )
    .unwrap();

    let err = temp_env::with_vars_unset(
        ["CUTOVER_REGISTRY", "CUTOVER_HEALTH_TIMEOUT", "CUTOVER_DRAIN_TIMEOUT"],
        || Config::load(dir.path()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(ref m) if m.contains("services.platform.ports")));
}

#[test]
fn deploy_dir_flag_beats_environment() {
    let explicit = std::path::Path::new("/srv/deploy");
    temp_env::with_var("CUTOVER_DEPLOY_DIR", Some("/var/lib/cutover"), || {
        assert_eq!(resolve_deploy_dir(Some(explicit)).unwrap(), explicit);
        assert_eq!(
            resolve_deploy_dir(None).unwrap(),
            std::path::PathBuf::from("/var/lib/cutover")
        );
    });
}

#[test]
fn deploy_dir_defaults_under_home() {
    temp_env::with_vars(
        [("CUTOVER_DEPLOY_DIR", None), ("HOME", Some("/home/ops"))],
        || {
            assert_eq!(
                resolve_deploy_dir(None).unwrap(),
                std::path::PathBuf::from("/home/ops/.local/state/cutover")
            );
        },
    );
}
