//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of an event type, both subscribed and triggered.
pub const MAX_EVENT_TYPE_LENGTH: usize = 128;

/// Maximum number of event types on one subscription.
const MAX_EVENT_TYPES: usize = 100;

/// Validates that a webhook URL uses the `http` or `https` scheme.
///
/// Format checks (absolute, parseable) are done by `#[validate(url)]`; this
/// only restricts the scheme so that e.g. `ftp://` or `mailto:` are rejected.
pub fn validate_http_scheme(url: &str) -> Result<(), ValidationError> {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        Ok(())
    } else {
        let mut err = ValidationError::new("url_scheme");
        err.message = Some("URL must use the http or https scheme".into());
        Err(err)
    }
}

/// Validates that a URL uses HTTPS.
pub fn validate_https_url(url: &str) -> Result<(), ValidationError> {
    if url.to_ascii_lowercase().starts_with("https://") {
        Ok(())
    } else {
        let mut err = ValidationError::new("https_required");
        err.message = Some("URL must use HTTPS protocol".into());
        Err(err)
    }
}

/// Validates a list of subscribed event types.
///
/// The list must be non-empty, bounded, and contain no blank entries.
pub fn validate_event_types(events: &[String]) -> Result<(), ValidationError> {
    if events.is_empty() {
        let mut err = ValidationError::new("events_empty");
        err.message = Some("At least one event type is required".into());
        return Err(err);
    }

    if events.len() > MAX_EVENT_TYPES {
        let mut err = ValidationError::new("events_too_many");
        err.message = Some(format!("At most {} event types are allowed", MAX_EVENT_TYPES).into());
        return Err(err);
    }

    for event in events {
        let trimmed = event.trim();
        if trimmed.is_empty() || trimmed.len() != event.len() {
            let mut err = ValidationError::new("event_type_blank");
            err.message = Some("Event types must be non-empty and not padded with spaces".into());
            return Err(err);
        }
        if event.len() > MAX_EVENT_TYPE_LENGTH {
            let mut err = ValidationError::new("event_type_length");
            err.message = Some(
                format!(
                    "Event types must be at most {} characters",
                    MAX_EVENT_TYPE_LENGTH
                )
                .into(),
            );
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_scheme() {
        assert!(validate_http_scheme("https://example.com/hook").is_ok());
        assert!(validate_http_scheme("http://localhost:8080/hook").is_ok());
        assert!(validate_http_scheme("HTTPS://EXAMPLE.COM").is_ok());
    }

    #[test]
    fn test_validate_http_scheme_rejects_other_schemes() {
        assert!(validate_http_scheme("ftp://example.com").is_err());
        assert!(validate_http_scheme("mailto:ops@example.com").is_err());
        assert!(validate_http_scheme("example.com/hook").is_err());
    }

    #[test]
    fn test_validate_https_url() {
        assert!(validate_https_url("https://example.com").is_ok());
        assert!(validate_https_url("https://sub.example.com/path").is_ok());
        assert!(validate_https_url("http://example.com").is_err());
        assert!(validate_https_url("example.com").is_err());
    }

    #[test]
    fn test_validate_https_url_error_message() {
        let err = validate_https_url("http://example.com").unwrap_err();
        assert_eq!(err.code, "https_required");
        assert_eq!(
            err.message.unwrap().to_string(),
            "URL must use HTTPS protocol"
        );
    }

    #[test]
    fn test_validate_event_types() {
        assert!(validate_event_types(&["*".to_string()]).is_ok());
        assert!(validate_event_types(&[
            "booking.created".to_string(),
            "payment.succeeded".to_string()
        ])
        .is_ok());
    }

    #[test]
    fn test_validate_event_types_empty_list() {
        let err = validate_event_types(&[]).unwrap_err();
        assert_eq!(err.code, "events_empty");
    }

    #[test]
    fn test_validate_event_types_blank_entry() {
        assert!(validate_event_types(&["".to_string()]).is_err());
        assert!(validate_event_types(&[" booking.created".to_string()]).is_err());
    }

    #[test]
    fn test_validate_event_types_too_long() {
        let long = "a".repeat(MAX_EVENT_TYPE_LENGTH + 1);
        assert!(validate_event_types(&[long]).is_err());
    }

    #[test]
    fn test_validate_event_types_too_many() {
        let events: Vec<String> = (0..=MAX_EVENT_TYPES).map(|i| format!("e{}", i)).collect();
        assert!(validate_event_types(&events).is_err());
    }
}
