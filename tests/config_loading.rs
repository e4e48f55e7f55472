//! Integration tests for config loading across file formats and layering.

use pswproxy::config::model::{ProxyConfig, Protocol};
use pswproxy::config::validation::validate;
use pswproxy::config::{load_file, parse_config_str, resolve, ConfigOverrides};
use pswproxy::error::ProxyError;

fn load_example(name: &str) -> String {
    let path = format!("example/{name}");
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

#[test]
fn yaml_example_loads_and_validates() {
    let content = load_example("pswproxy.yaml");
    let config = parse_config_str("yaml", &content, "pswproxy.yaml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.listen.port, 6749);
    assert_eq!(config.upstream.protocol, Protocol::Https);
    assert_eq!(config.upstream.host, "pswww.slac.stanford.edu");
    assert!(config.change_origin);
}

#[test]
fn yaml_full_example_loads_and_validates() {
    let content = load_example("full.yaml");
    let config = parse_config_str("yaml", &content, "full.yaml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.upstream.path_prefix, "/ws");
    assert_eq!(config.admin.port, Some(6750));
    assert_eq!(config.timeouts.response_ms, 45_000);
}

#[cfg(feature = "json")]
#[test]
fn json_example_loads_and_validates() {
    let content = load_example("pswproxy.json");
    let config = parse_config_str("json", &content, "pswproxy.json").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.upstream.host, "pswww.slac.stanford.edu");
}

#[cfg(feature = "toml")]
#[test]
fn toml_example_loads_and_validates() {
    let content = load_example("pswproxy.toml");
    let config = parse_config_str("toml", &content, "pswproxy.toml").unwrap();
    validate(&config).unwrap();
    assert_eq!(config.upstream.host, "pswww.slac.stanford.edu");
}

#[cfg(all(feature = "json", feature = "toml"))]
#[test]
fn all_formats_produce_equivalent_configs() {
    let yaml = parse_config_str("yaml", &load_example("pswproxy.yaml"), "yaml").unwrap();
    let json = parse_config_str("json", &load_example("pswproxy.json"), "json").unwrap();
    let toml = parse_config_str("toml", &load_example("pswproxy.toml"), "toml").unwrap();

    assert_eq!(yaml, json);
    assert_eq!(yaml, toml);
}

#[tokio::test]
async fn missing_file_is_reported() {
    let err = load_file(std::path::Path::new("example/does-not-exist.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::ConfigFileNotFound { .. }));
}

#[tokio::test]
async fn flags_override_loaded_file() {
    let file = load_file(std::path::Path::new("example/full.yaml"))
        .await
        .unwrap();
    let overrides = ConfigOverrides {
        port: Some(7557),
        upstream: Some("http://127.0.0.1:8080".into()),
        ..ConfigOverrides::default()
    };

    let config = resolve(Some(file), &overrides).unwrap();
    assert_eq!(config.listen.port, 7557);
    assert_eq!(config.upstream.protocol, Protocol::Http);
    assert_eq!(config.upstream.path_prefix, "");
    // Untouched file values survive
    assert_eq!(config.admin.port, Some(6750));
}

#[test]
fn invalid_config_fails_validation() {
    let json = r#"{"upstream": {"host": "", "path_prefix": "ws"}}"#;
    let config: ProxyConfig = serde_json::from_str(json).unwrap();
    let errors = validate(&config).unwrap_err();
    assert_eq!(errors.len(), 2);
}
