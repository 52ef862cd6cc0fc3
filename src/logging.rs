//! Structured logging for summary maintenance.
//!
//! Provides:
//! - subscriber setup driven by [`LoggingConfig`]
//! - a unique invocation ID per trigger, carried in the trigger's span
//! - summary events (recomputed, skipped, refresh results)

use tracing::{info, info_span, Level};
use uuid::Uuid;

use crate::config::LoggingConfig;
use crate::errors::{LicenseError, LicenseResult};

/// Summary maintenance event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryEvent {
    /// Summary fields were recomputed and written for one record
    Recomputed,
    /// Change event for a deleted record; nothing written
    DeleteSkipped,
    /// Periodic refresh wrote its batch
    RefreshCompleted,
    /// Periodic refresh found nothing to write
    RefreshSkipped,
}

impl std::fmt::Display for SummaryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SummaryEvent::Recomputed => "recomputed",
            SummaryEvent::DeleteSkipped => "delete_skipped",
            SummaryEvent::RefreshCompleted => "refresh_completed",
            SummaryEvent::RefreshSkipped => "refresh_skipped",
        };
        write!(f, "{}", s)
    }
}

/// Log a summary event for a record (or for the collection, on refresh events).
pub fn log_summary_event(event: SummaryEvent, subject: &str, details: Option<&str>) {
    let span = info_span!(
        "summary_event",
        event = %event,
        subject = %subject,
    );
    let _enter = span.enter();

    if let Some(d) = details {
        info!(details = %d, "Summary event occurred");
    } else {
        info!("Summary event occurred");
    }
}

/// Generate a new unique invocation ID.
pub fn generate_invocation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> LicenseResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(LicenseError::ConfigError(format!(
            "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
        ))),
    }
}

/// Install the global `fmt` subscriber.
///
/// Does nothing when logging is disabled or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> LicenseResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let level = parse_level(&config.level)?;
    // Err only means a subscriber already exists.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_id_is_valid_uuid() {
        let id = generate_invocation_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn parses_levels_case_insensitively() {
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig {
            enabled: true,
            level: "info".to_string(),
        };
        init_logging(&config).unwrap();
        init_logging(&config).unwrap();
    }

    #[test]
    fn event_names() {
        assert_eq!(SummaryEvent::DeleteSkipped.to_string(), "delete_skipped");
        assert_eq!(SummaryEvent::RefreshCompleted.to_string(), "refresh_completed");
    }
}
