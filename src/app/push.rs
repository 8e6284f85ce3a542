use crate::push as push_service;
use crate::push::registry::NewSubscription;
use crate::push::DeliveryOutcome;
use crate::state;
use crate::types::push::{MetadataValue, NotificationAction, NotificationPayload, SubscriptionKeys};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;
use url::Url;

/// Shorter key material is a malformed subscription, not a real browser.
const MIN_KEY_LENGTH: usize = 8;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: &'static str) -> HandlerError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

fn push_unconfigured() -> HandlerError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Push notifications are not configured.",
        }),
    )
}

fn validate_endpoint(endpoint: &str) -> Result<(), HandlerError> {
    let parsed =
        Url::parse(endpoint).map_err(|_| bad_request("endpoint must be an absolute URL."))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(bad_request("endpoint must use http or https."));
    }
    Ok(())
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, HandlerError> {
    let push = state.push.as_ref().ok_or_else(push_unconfigured)?;
    Ok(Json(PublicKeyResponse {
        public_key: push.public_key.clone(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscribeRequest {
    pub(crate) user_id: String,
    pub(crate) subscription: SubscriptionBody,
    #[serde(default)]
    pub(crate) metadata: HashMap<String, MetadataValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionBody {
    pub(crate) endpoint: String,
    pub(crate) expiration_time: Option<i64>,
    pub(crate) keys: SubscriptionKeys,
}

/// Acknowledges the registration without ever echoing key material back.
#[derive(Serialize)]
pub(crate) struct SubscribeResponse {
    pub(crate) status: &'static str,
    pub(crate) endpoint: String,
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResponse>, HandlerError> {
    if request.user_id.trim().is_empty() {
        return Err(bad_request("userId must not be empty."));
    }
    validate_endpoint(&request.subscription.endpoint)?;
    let keys = &request.subscription.keys;
    if keys.auth.len() < MIN_KEY_LENGTH || keys.p256dh.len() < MIN_KEY_LENGTH {
        return Err(bad_request("subscription keys are malformed."));
    }

    let endpoint = request.subscription.endpoint.clone();
    state.registry.upsert(
        NewSubscription {
            endpoint: request.subscription.endpoint,
            keys: request.subscription.keys,
            user_id: request.user_id,
            expiration_time: request.subscription.expiration_time,
            metadata: request.metadata,
        },
        OffsetDateTime::now_utc(),
    );

    Ok(Json(SubscribeResponse {
        status: "subscribed",
        endpoint,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    pub(crate) endpoint: String,
}

#[derive(Serialize)]
pub(crate) struct UnsubscribeResponse {
    pub(crate) removed: bool,
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Json<UnsubscribeResponse> {
    Json(UnsubscribeResponse {
        removed: state.registry.remove(&request.endpoint),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    pub(crate) target: SendTarget,
    pub(crate) notification: NotificationRequest,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SendTarget {
    User {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Endpoint {
        endpoint: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationRequest {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) url: Option<String>,
    pub(crate) tag: Option<String>,
    pub(crate) icon: Option<String>,
    pub(crate) badge: Option<String>,
    pub(crate) require_interaction: Option<bool>,
    pub(crate) data: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) actions: Vec<NotificationAction>,
}

impl NotificationRequest {
    fn into_payload(self, base_url: &str) -> Result<NotificationPayload, HandlerError> {
        let title = self.title.trim();
        let body = self.body.trim();
        if title.is_empty() || body.is_empty() {
            return Err(bad_request("title and body are required."));
        }
        let url = match self.url {
            Some(url) => {
                validate_endpoint(&url).map_err(|_| bad_request("url must be absolute."))?;
                url
            }
            None => base_url.to_string(),
        };
        Ok(NotificationPayload {
            title: title.to_string(),
            body: body.to_string(),
            url,
            tag: self.tag.unwrap_or_else(|| "dashboard".to_string()),
            icon: self.icon,
            badge: self.badge,
            require_interaction: self.require_interaction,
            data: self.data,
            actions: self.actions,
        })
    }
}

/// Per-endpoint delivery outcomes; key material never appears here.
#[derive(Serialize)]
pub(crate) struct SendResponse {
    pub(crate) outcomes: Vec<DeliveryOutcome>,
}

pub(crate) async fn push_send(
    State(state): State<state::AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, HandlerError> {
    let push = state.push.as_ref().ok_or_else(push_unconfigured)?;
    let payload = request.notification.into_payload(&state.config.base_url)?;

    let outcomes = match request.target {
        SendTarget::User { user_id } => {
            if user_id.trim().is_empty() {
                return Err(bad_request("userId must not be empty."));
            }
            push_service::notify_user(push.delivery.as_ref(), &state.registry, &user_id, &payload)
                .await
        }
        SendTarget::Endpoint { endpoint } => {
            let outcome = push_service::notify_endpoint(
                push.delivery.as_ref(),
                &state.registry,
                &endpoint,
                &payload,
            )
            .await;
            match outcome {
                Some(outcome) => vec![outcome],
                None => {
                    return Err((
                        StatusCode::NOT_FOUND,
                        Json(ErrorResponse {
                            error: "endpoint is not registered.",
                        }),
                    ));
                }
            }
        }
    };

    Ok(Json(SendResponse { outcomes }))
}
