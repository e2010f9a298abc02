//! Mailbox change notification decoding.
//!
//! Push deliveries carry a base64-encoded JSON document of the form
//! `{"emailAddress": "...", "historyId": 123}`. Both fields are required;
//! a payload missing either is rejected rather than guessed at.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use crate::error::{Error, Result};

/// A decoded mailbox change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxNotification {
    /// Address of the mailbox that changed.
    pub email_address: String,
    /// The mailbox's history position at notification time.
    pub history_id: u64,
}

/// Decode the base64+JSON payload of a push notification.
///
/// # Errors
///
/// Returns [`Error::Notification`] if the payload is not base64, not JSON,
/// or missing a required field.
pub fn decode_notification(data: &str) -> Result<MailboxNotification> {
    let bytes = STANDARD
        .decode(data.trim())
        .or_else(|_| URL_SAFE.decode(data.trim()))
        .map_err(|e| Error::Notification(format!("payload is not base64: {e}")))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Notification(format!("payload is not JSON: {e}")))?;

    let email_address = value
        .get("emailAddress")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Notification("missing emailAddress".into()))?
        .to_string();

    // historyId arrives as a number on this transport but as a string on
    // others; accept both.
    let history_id = match value.get("historyId") {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::Notification("missing or invalid historyId".into()))?;

    Ok(MailboxNotification {
        email_address,
        history_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(json: &str) -> String {
        STANDARD.encode(json.as_bytes())
    }

    #[test]
    fn test_decode_numeric_history_id() {
        let data = encode(r#"{"emailAddress": "a@b.com", "historyId": 4711}"#);
        let notification = decode_notification(&data).unwrap();
        assert_eq!(notification.email_address, "a@b.com");
        assert_eq!(notification.history_id, 4711);
    }

    #[test]
    fn test_decode_string_history_id() {
        let data = encode(r#"{"emailAddress": "a@b.com", "historyId": "4711"}"#);
        let notification = decode_notification(&data).unwrap();
        assert_eq!(notification.history_id, 4711);
    }

    #[test]
    fn test_missing_email_address_rejected() {
        let data = encode(r#"{"historyId": 4711}"#);
        assert!(matches!(
            decode_notification(&data),
            Err(Error::Notification(_))
        ));
    }

    #[test]
    fn test_missing_history_id_rejected() {
        let data = encode(r#"{"emailAddress": "a@b.com"}"#);
        assert!(matches!(
            decode_notification(&data),
            Err(Error::Notification(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(decode_notification("%%%not-base64%%%").is_err());
        let not_json = STANDARD.encode(b"hello");
        assert!(decode_notification(&not_json).is_err());
    }
}
