use crate::ports::push::PushSender;
use crate::types::push::NotificationPayload;

pub mod composer;
pub mod delivery;
pub mod registry;
pub mod vapid;

pub use composer::NotificationComposer;
pub use delivery::{DeliveryClient, DeliveryOutcome};
pub use registry::{NewSubscription, SubscriptionRegistry};
pub use vapid::{VapidConfigStatus, generate_vapid_credentials, load_vapid_config};

/// Fans one notification out to every endpoint a user owns and prunes
/// endpoints the push service reports as gone.
///
/// Pruning happens after delivery with no transaction spanning the two; a
/// record may outlive a failed delivery briefly, which is tolerated.
pub async fn notify_user<S: PushSender>(
    client: &DeliveryClient<S>,
    registry: &SubscriptionRegistry,
    user_id: &str,
    payload: &NotificationPayload,
) -> Vec<DeliveryOutcome> {
    let records = registry.get_for_user(user_id);
    if records.is_empty() {
        tracing::warn!(user_id, "push delivery skipped: no subscriptions");
        return Vec::new();
    }
    let outcomes = client.fan_out(&records, payload).await;
    prune_gone(registry, &outcomes);
    outcomes
}

/// Delivers to a single known endpoint; `None` when the endpoint is not
/// registered.
pub async fn notify_endpoint<S: PushSender>(
    client: &DeliveryClient<S>,
    registry: &SubscriptionRegistry,
    endpoint: &str,
    payload: &NotificationPayload,
) -> Option<DeliveryOutcome> {
    let record = registry.get_by_endpoint(endpoint)?;
    let outcome = client.deliver(&record, payload).await;
    prune_gone(registry, std::slice::from_ref(&outcome));
    Some(outcome)
}

fn prune_gone(registry: &SubscriptionRegistry, outcomes: &[DeliveryOutcome]) {
    for outcome in outcomes {
        if outcome.endpoint_gone() && registry.remove(&outcome.endpoint) {
            tracing::info!(
                endpoint = %outcome.endpoint,
                status_code = ?outcome.status_code,
                "pruned gone push endpoint"
            );
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use time::OffsetDateTime;
    use url::Url;

    use crate::push::delivery::tests::TestSender;
    use crate::types::push::SubscriptionKeys;

    fn register(registry: &SubscriptionRegistry, endpoint: &str, user_id: &str) {
        registry.upsert(
            NewSubscription {
                endpoint: endpoint.to_string(),
                keys: SubscriptionKeys {
                    auth: "a".repeat(8),
                    p256dh: "b".repeat(8),
                },
                user_id: user_id.to_string(),
                expiration_time: None,
                metadata: HashMap::new(),
            },
            OffsetDateTime::UNIX_EPOCH,
        );
    }

    #[tokio::test]
    async fn notify_user__should_fan_out_to_every_device() {
        // Given
        let registry = SubscriptionRegistry::new();
        register(&registry, "https://push.example/laptop", "u1");
        register(&registry, "https://push.example/phone", "u1");
        let sender = TestSender::default();
        let client = DeliveryClient::new(sender.clone());
        let payload = crate::push::delivery::tests::payload();

        // When
        let outcomes = notify_user(&client, &registry, "u1", &payload).await;

        // Then
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.success));
        assert_eq!(sender.sent_endpoints().len(), 2);
    }

    #[tokio::test]
    async fn notify_user__should_return_empty_for_unknown_user() {
        // Given
        let registry = SubscriptionRegistry::new();
        let client = DeliveryClient::new(TestSender::default());
        let payload = crate::push::delivery::tests::payload();

        // When
        let outcomes = notify_user(&client, &registry, "nobody", &payload).await;

        // Then
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn notify_user__should_prune_gone_endpoints_but_keep_live_ones() {
        // Given
        let registry = SubscriptionRegistry::new();
        register(&registry, "https://push.example/gone", "u1");
        register(&registry, "https://push.example/live", "u1");
        let sender = TestSender::default();
        sender.fail_endpoint("https://push.example/gone", Some(410));
        let client = DeliveryClient::new(sender);
        let payload = crate::push::delivery::tests::payload();

        // When
        notify_user(&client, &registry, "u1", &payload).await;

        // Then
        assert!(registry.get_by_endpoint("https://push.example/gone").is_none());
        assert!(registry.get_by_endpoint("https://push.example/live").is_some());
    }

    #[tokio::test]
    async fn notify_user__should_not_prune_on_transient_failures() {
        // Given
        let registry = SubscriptionRegistry::new();
        register(&registry, "https://push.example/busy", "u1");
        let sender = TestSender::default();
        sender.fail_endpoint("https://push.example/busy", Some(429));
        let client = DeliveryClient::new(sender);
        let payload = crate::push::delivery::tests::payload();

        // When
        let outcomes = notify_user(&client, &registry, "u1", &payload).await;

        // Then
        assert!(!outcomes[0].success);
        assert!(registry.get_by_endpoint("https://push.example/busy").is_some());
    }

    #[tokio::test]
    async fn notify_endpoint__should_return_none_for_unregistered_endpoint() {
        // Given
        let registry = SubscriptionRegistry::new();
        let client = DeliveryClient::new(TestSender::default());
        let payload = crate::push::delivery::tests::payload();

        // When
        let outcome =
            notify_endpoint(&client, &registry, "https://push.example/nope", &payload).await;

        // Then
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn lead_ready_delivery__should_compose_send_and_prune_gone_endpoint() {
        // Given: a registered device that the push service later reports gone
        let registry = SubscriptionRegistry::new();
        register(&registry, "https://push.example/abc", "u1");
        let sender = TestSender::default();
        sender.fail_endpoint("https://push.example/abc", Some(410));
        let client = DeliveryClient::new(sender);
        let composer = NotificationComposer::new(
            Url::parse("https://dashboard.example").expect("base url"),
        );
        let payload = composer.lead_ready("list-9", "lead-1", "Jordan Miles", None);
        assert_eq!(payload.tag, "lead-lead-1");
        assert!(payload.url.contains("lead-1"));

        // When
        let outcomes = notify_user(&client, &registry, "u1", &payload).await;

        // Then
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].endpoint_gone());
        assert!(registry.get_for_user("u1").is_empty());
    }
}
