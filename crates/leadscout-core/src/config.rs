use crate::app_config::{AppConfig, Environment, FailurePolicy};
use crate::limits::Limits;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
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
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let api_base_url = require("LEADSCOUT_API_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_API_URL".to_string(),
            reason: format!("expected an http(s) URL, got '{api_base_url}'"),
        });
    }
    let api_token = lookup("LEADSCOUT_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("LEADSCOUT_ENV", "development"))?;

    let request_timeout_secs = parse_u64("LEADSCOUT_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "timeout must be at least 1 second".to_string(),
        });
    }
    let user_agent = or_default("LEADSCOUT_USER_AGENT", "leadscout/0.1 (lead-discovery)");
    let max_retries = parse_u32("LEADSCOUT_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("LEADSCOUT_RETRY_BACKOFF_BASE_MS", "500")?;
    let triage_failure_policy = parse_failure_policy(&or_default(
        "LEADSCOUT_TRIAGE_FAILURE_POLICY",
        "mark_unconfirmed",
    ))?;

    let defaults = Limits::default();
    let limits = Limits {
        max_keywords_per_prospect: parse_usize(
            "LEADSCOUT_MAX_KEYWORDS_PER_PROSPECT",
            &defaults.max_keywords_per_prospect.to_string(),
        )?,
        posts_per_keyword: parse_u32(
            "LEADSCOUT_POSTS_PER_KEYWORD",
            &defaults.posts_per_keyword.to_string(),
        )?,
        monthly_scrape_limit: parse_u32(
            "LEADSCOUT_MONTHLY_SCRAPE_LIMIT",
            &defaults.monthly_scrape_limit.to_string(),
        )?,
        max_prospects_per_brand: parse_usize(
            "LEADSCOUT_MAX_PROSPECTS_PER_BRAND",
            &defaults.max_prospects_per_brand.to_string(),
        )?,
        ..defaults
    };

    if limits.max_keywords_per_prospect == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_MAX_KEYWORDS_PER_PROSPECT".to_string(),
            reason: "must allow at least one keyword".to_string(),
        });
    }

    Ok(AppConfig {
        api_base_url,
        api_token,
        env,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        triage_failure_policy,
        limits,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

fn parse_failure_policy(s: &str) -> Result<FailurePolicy, ConfigError> {
    match s {
        "rollback" => Ok(FailurePolicy::Rollback),
        "mark_unconfirmed" => Ok(FailurePolicy::MarkUnconfirmed),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_TRIAGE_FAILURE_POLICY".to_string(),
            reason: format!("expected rollback or mark_unconfirmed, got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
