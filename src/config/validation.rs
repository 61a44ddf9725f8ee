//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use regex::Regex;

use super::Settings;
use crate::utils::errors::{EventPassError, Result};

/// Discord webhook endpoints accepted for publication announcements
const DISCORD_WEBHOOK_PATTERN: &str =
    r"(?i)^https://(?:discord\.com|discordapp\.com)/api/webhooks/[^/\s]+/[^/\s]+$";

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_ticket_config(&settings.tickets)?;
    validate_notification_config(&settings.notifications)?;

    Ok(())
}

/// Whether `url` is a Discord webhook endpoint
pub fn is_valid_discord_webhook_url(url: &str) -> bool {
    Regex::new(DISCORD_WEBHOOK_PATTERN)
        .map(|re| re.is_match(url.trim()))
        .unwrap_or(false)
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventPassError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(EventPassError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventPassError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventPassError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventPassError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    if config.file_prefix.is_empty() {
        return Err(EventPassError::Config("Log file prefix is required".to_string()));
    }

    Ok(())
}

/// Validate ticket configuration
fn validate_ticket_config(config: &super::TicketConfig) -> Result<()> {
    if config.prefix.is_empty() || !config.prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EventPassError::Config(
            "Ticket prefix must be a non-empty alphanumeric string".to_string(),
        ));
    }

    let base = url::Url::parse(&config.reference_base_url)?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(EventPassError::Config(format!(
            "Ticket reference base URL must be http(s): {}",
            config.reference_base_url
        )));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if let Some(ref smtp) = config.smtp {
        if smtp.host.is_empty() || smtp.username.is_empty() || smtp.password.is_empty() {
            return Err(EventPassError::Config(
                "SMTP host, username and password are all required".to_string(),
            ));
        }
        if !smtp.from_email.contains('@') {
            return Err(EventPassError::Config(format!(
                "Invalid SMTP from address: {}",
                smtp.from_email
            )));
        }
    }

    if let Some(ref webhook) = config.discord_webhook_url {
        if !is_valid_discord_webhook_url(webhook) {
            return Err(EventPassError::Config(
                "Discord webhook URL must look like https://discord.com/api/webhooks/<id>/<token>".to_string(),
            ));
        }
    }

    if config.webhook_requests_per_minute == 0 {
        return Err(EventPassError::Config(
            "Webhook rate must be greater than 0".to_string(),
        ));
    }

    if config.queue_capacity == 0 {
        return Err(EventPassError::Config(
            "Notification queue capacity must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::SmtpConfig;

    #[test]
    fn test_discord_webhook_pattern() {
        assert!(is_valid_discord_webhook_url("https://discord.com/api/webhooks/123/abc-DEF"));
        assert!(is_valid_discord_webhook_url("https://DiscordApp.com/api/webhooks/1/t"));
        assert!(!is_valid_discord_webhook_url("http://discord.com/api/webhooks/123/abc"));
        assert!(!is_valid_discord_webhook_url("https://example.com/api/webhooks/123/abc"));
        assert!(!is_valid_discord_webhook_url("https://discord.com/api/webhooks/123"));
    }

    #[test]
    fn test_rejects_bad_pool_sizes() {
        let mut settings = Settings::default();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_bad_ticket_prefix() {
        let mut settings = Settings::default();
        settings.tickets.prefix = "FE-L".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_non_http_reference_url() {
        let mut settings = Settings::default();
        settings.tickets.reference_base_url = "ftp://tickets.example.org".to_string();
        assert!(validate_settings(&settings).is_err());

        settings.tickets.reference_base_url = "not a url".to_string();
        assert!(matches!(validate_settings(&settings), Err(EventPassError::UrlParse(_))));
    }

    #[test]
    fn test_rejects_incomplete_smtp() {
        let mut settings = Settings::default();
        settings.notifications.smtp = Some(SmtpConfig {
            host: "smtp.example.org".to_string(),
            port: 587,
            username: String::new(),
            password: "secret".to_string(),
            from_email: "tickets@example.org".to_string(),
            from_name: "Tickets".to_string(),
        });
        assert!(validate_settings(&settings).is_err());
    }
}
