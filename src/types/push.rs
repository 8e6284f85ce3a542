use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Upper bound for a serialized notification payload. Push services reject
/// bodies around 4 KiB; composers must stay well under this.
pub const MAX_PAYLOAD_BYTES: usize = 3 * 1024;

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// Per-endpoint cryptographic material. Deserialized from the subscribe
/// boundary but never serialized back out and never logged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionKeys {
    pub auth: String,
    pub p256dh: String,
}

/// One push-capable endpoint owned by one user. The endpoint URL is the
/// primary key across the registry.
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub user_id: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Advisory hint from the browser; not enforced.
    pub expiration_time: Option<i64>,
    pub metadata: HashMap<String, MetadataValue>,
}

/// Scalar routing hints attached to a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Canonical transport-independent notification message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// Deep link opened on activation; always an absolute URL.
    pub url: String,
    /// De-duplication key; a later notification with the same tag supersedes
    /// the earlier one in the notification tray.
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    /// Structured context consumed by the client after activation, not
    /// rendered directly. Composers keep this small.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn metadata_value__should_deserialize_scalars() {
        // When
        let values: HashMap<String, MetadataValue> =
            serde_json::from_str(r#"{"channel":"leads","priority":2,"beta":true,"note":null}"#)
                .expect("deserialize metadata");

        // Then
        assert_eq!(
            values.get("channel"),
            Some(&MetadataValue::String("leads".to_string()))
        );
        assert_eq!(values.get("priority"), Some(&MetadataValue::Number(2.0)));
        assert_eq!(values.get("beta"), Some(&MetadataValue::Bool(true)));
        assert_eq!(values.get("note"), Some(&MetadataValue::Null));
    }

    #[test]
    fn notification_payload__should_serialize_camel_case_and_skip_empty() {
        // Given
        let payload = NotificationPayload {
            title: "Lead ready".to_string(),
            body: "Jordan Miles is ready".to_string(),
            url: "https://dashboard.example/leads/lead-1".to_string(),
            tag: "lead-lead-1".to_string(),
            icon: None,
            badge: None,
            require_interaction: Some(true),
            data: None,
            actions: Vec::new(),
        };

        // When
        let json: serde_json::Value = serde_json::to_value(&payload).expect("serialize payload");

        // Then
        assert_eq!(json["requireInteraction"], serde_json::json!(true));
        assert!(json.get("icon").is_none());
        assert!(json.get("actions").is_none());
    }
}
