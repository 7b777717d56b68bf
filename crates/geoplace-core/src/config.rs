use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound on transport-level retries for a single upstream call.
const MAX_TRANSPORT_RETRIES: u32 = 3;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("GEOPLACE_ENV", "development"))?;
    let log_level = normalize_log_level(&or_default("GEOPLACE_LOG_LEVEL", "warn"));

    let region = or_default("AWS_REGION", "us-east-1");
    if region.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "AWS_REGION".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    let api_key = optional("AWS_LOCATION_API_KEY");
    // Outside production a missing key is reported per request instead.
    if env == Environment::Production && api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("AWS_LOCATION_API_KEY".to_string()));
    }
    let endpoint = optional("GEOPLACE_ENDPOINT");
    if let Some(endpoint) = &endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEnvVar {
                var: "GEOPLACE_ENDPOINT".to_string(),
                reason: format!("'{endpoint}' is not an http(s) URL"),
            });
        }
    }

    let request_timeout_secs = parse_u64("GEOPLACE_REQUEST_TIMEOUT_SECS", "15")?;
    let connect_timeout_secs = parse_u64("GEOPLACE_CONNECT_TIMEOUT_SECS", "15")?;
    for (var, value) in [
        ("GEOPLACE_REQUEST_TIMEOUT_SECS", request_timeout_secs),
        ("GEOPLACE_CONNECT_TIMEOUT_SECS", connect_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
    }

    let max_retries = parse_u32("GEOPLACE_MAX_RETRIES", "3")?;
    if max_retries > MAX_TRANSPORT_RETRIES {
        return Err(ConfigError::InvalidEnvVar {
            var: "GEOPLACE_MAX_RETRIES".to_string(),
            reason: format!("must be at most {MAX_TRANSPORT_RETRIES}, got {max_retries}"),
        });
    }
    let retry_backoff_base_ms = parse_u64("GEOPLACE_RETRY_BACKOFF_BASE_MS", "500")?;
    let user_agent = or_default("GEOPLACE_USER_AGENT", "geoplace/0.1 (places-facade)");

    Ok(AppConfig {
        env,
        log_level,
        region,
        api_key,
        endpoint,
        request_timeout_secs,
        connect_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "GEOPLACE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Maps `WARNING`/`CRITICAL` style level names onto `tracing` filter directives.
fn normalize_log_level(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => "warn".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
