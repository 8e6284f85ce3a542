use crate::adapters::WebPushSender;
use crate::config::AppConfig;
use crate::push::{DeliveryClient, SubscriptionRegistry};

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: Arc<SubscriptionRegistry>,
    pub push: Option<PushContext>,
}

/// Present only when VAPID credentials are fully configured; push routes
/// answer 503 without it.
#[derive(Clone)]
pub struct PushContext {
    pub delivery: Arc<DeliveryClient<WebPushSender>>,
    pub public_key: String,
}
