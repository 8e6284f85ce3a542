use futures_util::future::join_all;
use serde::Serialize;

use crate::ports::push::{PushSendError, PushSender};
use crate::types::push::{MAX_PAYLOAD_BYTES, NotificationPayload, SubscriptionRecord};

/// Per-endpoint result of one delivery attempt. Expected failure modes are
/// reported here, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub endpoint: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    fn success(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            success: true,
            status_code: None,
            error: None,
        }
    }

    fn failure(endpoint: &str, status_code: Option<u16>, error: String) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            success: false,
            status_code,
            error: Some(error),
        }
    }

    /// The push service reported the endpoint as expired or unsubscribed;
    /// callers should remove it from the registry.
    #[must_use]
    pub fn endpoint_gone(&self) -> bool {
        matches!(self.status_code, Some(404 | 410))
    }
}

/// Delivers canonical payloads to subscription endpoints over the configured
/// sender. Retry policy belongs to the caller, not this client.
#[derive(Debug, Clone)]
pub struct DeliveryClient<S> {
    sender: S,
}

impl<S: PushSender> DeliveryClient<S> {
    #[must_use]
    pub fn new(sender: S) -> Self {
        Self { sender }
    }

    pub async fn deliver(
        &self,
        record: &SubscriptionRecord,
        payload: &NotificationPayload,
    ) -> DeliveryOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(error) => {
                return DeliveryOutcome::failure(
                    &record.endpoint,
                    None,
                    format!("failed to encode payload: {error}"),
                );
            }
        };
        if body.len() > MAX_PAYLOAD_BYTES {
            return DeliveryOutcome::failure(
                &record.endpoint,
                Some(413),
                format!(
                    "payload is {} bytes; push transport limit is {MAX_PAYLOAD_BYTES}",
                    body.len()
                ),
            );
        }

        match self.sender.send(record, &body).await {
            Ok(()) => DeliveryOutcome::success(&record.endpoint),
            Err(error) => {
                DeliveryOutcome::failure(&record.endpoint, error.status_code(), error.to_string())
            }
        }
    }

    /// Concurrent fan-out to many endpoints; waits for all attempts and
    /// never lets one failure block the others.
    pub async fn fan_out(
        &self,
        records: &[SubscriptionRecord],
        payload: &NotificationPayload,
    ) -> Vec<DeliveryOutcome> {
        join_all(records.iter().map(|record| self.deliver(record, payload))).await
    }
}
