use super::{types::Config, AuthMethod, ConfigError};
use crate::payment::PaymentMode;

/// Longest statement descriptor the payment processor accepts.
const MAX_STATEMENT_DESCRIPTOR: usize = 22;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API key present when the api_key auth method is selected
/// - Remote root folder and depth are usable
/// - Timeouts are non-zero
/// - Statement descriptor fits the processor limit
/// - A secret key exists for the active payment mode
/// - The retention clock offset is under a day
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().unwrap_or("").is_empty()
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
        ));
    }

    let root = config.remote.root_folder.trim_matches('/');
    if root.is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.root_folder cannot be empty".to_string(),
        ));
    }

    if config.remote.depth == 0 {
        return Err(ConfigError::ValidationError(
            "remote.depth must be at least 1".to_string(),
        ));
    }

    if config.remote.timeout_secs == 0 || config.payment.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeouts must be greater than 0".to_string(),
        ));
    }

    let descriptor = &config.payment.statement_descriptor;
    if descriptor.chars().count() > MAX_STATEMENT_DESCRIPTOR {
        return Err(ConfigError::ValidationError(format!(
            "payment.statement_descriptor is longer than {} characters",
            MAX_STATEMENT_DESCRIPTOR
        )));
    }
    if !descriptor.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::ValidationError(
            "payment.statement_descriptor must contain at least one letter".to_string(),
        ));
    }

    if config.payment.mode == PaymentMode::Live
        && config.payment.secret_key(PaymentMode::Live).is_none()
    {
        return Err(ConfigError::ValidationError(
            "payment.live_secret_key is required in live mode".to_string(),
        ));
    }

    if config.pricing.base_price < 0 || config.pricing.multiplier_increment < 0 {
        return Err(ConfigError::ValidationError(
            "pricing amounts cannot be negative".to_string(),
        ));
    }

    if config.retention.utc_offset_minutes.unsigned_abs() >= MINUTES_PER_DAY {
        return Err(ConfigError::ValidationError(
            "retention.utc_offset_minutes must be within one day of UTC".to_string(),
        ));
    }

    Ok(())
}
