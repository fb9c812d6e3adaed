//! Configuration commands.
//!
//! - `config set`: Set a configuration value
//! - `config show`: Display current configuration

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::{CLIENT_ID_ENV, CLIENT_SECRET_ENV, Config};
use crate::error::{CaseportError, Result};

pub const VALID_KEYS: &[&str] = &[
    "base_url",
    "auth.client_id",
    "auth.client_secret",
    "poll.max_attempts",
    "poll.interval_ms",
];

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

fn configured(value: Option<&str>) -> String {
    match value {
        Some(v) => v.green().to_string(),
        None => "not configured".dimmed().to_string(),
    }
}

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;

    let client_id = config.client_id();
    let masked_secret = config.client_secret().map(|s| mask_sensitive_value(&s));
    let token_issued_at = config.token.as_ref().map(|t| t.issued_at.to_string());

    let json_output = json!({
        "base_url": config.base_url,
        "auth": {
            "client_id": client_id,
            "client_secret_configured": masked_secret.is_some(),
        },
        "token_issued_at": token_issued_at,
        "poll": {
            "max_attempts": config.poll.max_attempts,
            "interval_ms": config.poll.interval_ms,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text_output = String::new();
    text_output.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));
    text_output.push_str(&format!("{}: {}\n\n", "base_url".cyan(), config.base_url));

    text_output.push_str(&format!("{}:\n", "auth".cyan()));
    text_output.push_str(&format!("  client_id: {}\n", configured(client_id.as_deref())));
    text_output.push_str(&format!(
        "  client_secret: {}\n",
        configured(masked_secret.as_deref())
    ));
    if let Some(issued_at) = &token_issued_at {
        text_output.push_str(&format!("  token cached since {issued_at}\n"));
    }
    text_output.push('\n');

    text_output.push_str(&format!("{}:\n", "poll".cyan()));
    text_output.push_str(&format!("  max_attempts: {}\n", config.poll.max_attempts));
    text_output.push_str(&format!("  interval_ms: {}\n", config.poll.interval_ms));
    text_output.push('\n');

    if std::env::var(CLIENT_ID_ENV).is_ok() || std::env::var(CLIENT_SECRET_ENV).is_ok() {
        text_output.push_str(&format!(
            "{}\n",
            "Credentials from the environment take precedence over the file".dimmed()
        ));
    }
    text_output.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output)
        .with_text(text_output)
        .print(output)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse::<T>().map_err(|_| {
        CaseportError::Config(format!(
            "invalid value '{value}' for {key}. Expected a non-negative integer"
        ))
    })
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let mut config = Config::load()?;

    let shown = match key {
        "base_url" => {
            config.set_base_url(value)?;
            config.base_url.clone()
        }
        "auth.client_id" => {
            config.set_client_id(value.to_string());
            value.to_string()
        }
        "auth.client_secret" => {
            config.set_client_secret(value.to_string());
            mask_sensitive_value(value)
        }
        "poll.max_attempts" => {
            let attempts: u32 = parse_number(key, value)?;
            if attempts == 0 {
                return Err(CaseportError::Config(
                    "poll.max_attempts must be at least 1".to_string(),
                ));
            }
            config.poll.max_attempts = attempts;
            attempts.to_string()
        }
        "poll.interval_ms" => {
            let interval: u64 = parse_number(key, value)?;
            config.poll.interval_ms = interval;
            interval.to_string()
        }
        _ => {
            return Err(CaseportError::Config(format!(
                "unknown config key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            )));
        }
    };
    config.save()?;

    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "value": shown,
        "success": true,
    }))
    .with_text(format!("Set {} to {shown}", key.cyan()))
    .print(output)
}
