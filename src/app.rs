use crate::adapters;
use crate::config;
use crate::push as push_service;
use crate::state;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use std::sync::Arc;

mod push;

pub fn app(config: config::AppConfig) -> Router {
    let push_context = match push_service::load_vapid_config(&config) {
        push_service::VapidConfigStatus::Ready(vapid) => {
            let public_key = vapid.public_key.clone();
            let sender = adapters::WebPushSender::new(vapid)
                .unwrap_or_else(|err| panic!("failed to initialize web-push client: {err}"));
            Some(state::PushContext {
                delivery: Arc::new(push_service::DeliveryClient::new(sender)),
                public_key,
            })
        }
        push_service::VapidConfigStatus::Incomplete => {
            panic!(
                "partial VAPID configuration: private key, public key, and subject must all be set"
            );
        }
        push_service::VapidConfigStatus::Missing => {
            tracing::warn!("VAPID credentials not configured; push delivery is disabled");
            None
        }
    };
    let state = state::AppState {
        config,
        registry: Arc::new(push_service::SubscriptionRegistry::new()),
        push: push_context,
    };
    Router::new()
        .route("/api/push/subscribe", post(push::push_subscribe))
        .route("/api/push/unsubscribe", post(push::push_unsubscribe))
        .route("/api/push/send", post(push::push_send))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
