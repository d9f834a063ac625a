//! Secret detection and redaction utilities.
//!
//! Used wherever raw environment values or metadata may end up in an error
//! message or a diagnostic line.

/// The redacted placeholder string.
pub const REDACTED: &str = "[REDACTED]";

/// Checks if a key/variable name likely refers to a secret.
///
/// # Examples
///
/// ```
/// use logfit_shared::is_secret_key;
///
/// assert!(is_secret_key("DATABASE_PASSWORD"));
/// assert!(is_secret_key("x-auth-token"));
/// assert!(!is_secret_key("EH_MAX_DUMP_LEVEL"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    const MARKERS: [&str; 6] = ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"];
    let key = key.to_ascii_uppercase();
    MARKERS.iter().any(|marker| key.contains(marker))
}

/// Redacts a value if the key is likely a secret.
///
/// ```
/// use logfit_shared::{REDACTED, redact_if_secret};
///
/// assert_eq!(redact_if_secret("API_KEY", "sk-123"), REDACTED);
/// assert_eq!(redact_if_secret("APP_ENV", "prod"), "prod");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_owned()
    } else {
        value.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_secret_patterns() {
        assert!(is_secret_key("api_key"));
        assert!(is_secret_key("ACCESS_TOKEN"));
        assert!(is_secret_key("client_secret"));
        assert!(is_secret_key("DB_PASSWORD"));
        assert!(is_secret_key("aws_credentials"));
        assert!(is_secret_key("basic_auth"));
    }

    #[test]
    fn ignores_dump_settings() {
        assert!(!is_secret_key("EH_MAX_DUMP_LEVEL"));
        assert!(!is_secret_key("EH_MAX_RECORD_LENGTH"));
        assert!(!is_secret_key("APP_ENV"));
        assert!(!is_secret_key("LOGFIT_LOG"));
    }

    #[test]
    fn redacts_only_secret_values() {
        assert_eq!(redact_if_secret("password", "hunter2"), REDACTED);
        assert_eq!(redact_if_secret("APP_ENV", "prod"), "prod");
    }
}
