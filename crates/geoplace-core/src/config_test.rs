use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "GEOPLACE_ENV"));
}

#[test]
fn build_app_config_defaults_with_empty_env() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "warn");
    assert_eq!(cfg.region, "us-east-1");
    assert!(cfg.api_key.is_none());
    assert!(cfg.endpoint.is_none());
    assert_eq!(cfg.request_timeout_secs, 15);
    assert_eq!(cfg.connect_timeout_secs, 15);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.retry_backoff_base_ms, 500);
    assert_eq!(cfg.base_url(), "https://places.geo.us-east-1.amazonaws.com");
}

#[test]
fn build_app_config_reads_overrides() {
    let mut map = HashMap::new();
    map.insert("AWS_REGION", "us-west-2");
    map.insert("AWS_LOCATION_API_KEY", "v1.public.abc");
    map.insert("GEOPLACE_ENDPOINT", "http://127.0.0.1:9000/");
    map.insert("GEOPLACE_MAX_RETRIES", "1");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.region, "us-west-2");
    assert_eq!(cfg.api_key.as_deref(), Some("v1.public.abc"));
    assert_eq!(cfg.max_retries, 1);
    assert_eq!(cfg.base_url(), "http://127.0.0.1:9000");
}

#[test]
fn blank_api_key_counts_as_absent() {
    let mut map = HashMap::new();
    map.insert("AWS_LOCATION_API_KEY", "   ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.api_key.is_none());
}

#[test]
fn production_requires_api_key() {
    let mut map = HashMap::new();
    map.insert("GEOPLACE_ENV", "production");
    let err = build_app_config(lookup_from_map(&map)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "AWS_LOCATION_API_KEY"));

    map.insert("AWS_LOCATION_API_KEY", "v1.public.abc");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
}

#[test]
fn build_app_config_rejects_too_many_retries() {
    let mut map = HashMap::new();
    map.insert("GEOPLACE_MAX_RETRIES", "10");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GEOPLACE_MAX_RETRIES"),
        "expected InvalidEnvVar(GEOPLACE_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_timeout() {
    let mut map = HashMap::new();
    map.insert("GEOPLACE_REQUEST_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GEOPLACE_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(GEOPLACE_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_numeric_timeout() {
    let mut map = HashMap::new();
    map.insert("GEOPLACE_CONNECT_TIMEOUT_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GEOPLACE_CONNECT_TIMEOUT_SECS"),
        "expected InvalidEnvVar(GEOPLACE_CONNECT_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_http_endpoint() {
    let mut map = HashMap::new();
    map.insert("GEOPLACE_ENDPOINT", "ftp://example.com");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GEOPLACE_ENDPOINT"
    ));
}

#[test]
fn level_name_aliases_are_mapped() {
    assert_eq!(normalize_log_level("WARNING"), "warn");
    assert_eq!(normalize_log_level("CRITICAL"), "error");
    assert_eq!(normalize_log_level("debug"), "debug");
}

#[test]
fn debug_output_redacts_api_key() {
    let mut map = HashMap::new();
    map.insert("AWS_LOCATION_API_KEY", "super-secret");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("[redacted]"));
}
