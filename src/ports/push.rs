use crate::types::push::SubscriptionRecord;

/// Failure detail surfaced by a push send. Callers inspect the status code to
/// decide whether the endpoint should be pruned from the registry.
pub trait PushSendError: std::fmt::Display + Send + Sync + 'static {
    fn status_code(&self) -> Option<u16>;

    /// True when the push service reported the endpoint as permanently gone
    /// (expired or unsubscribed).
    fn endpoint_gone(&self) -> bool {
        matches!(self.status_code(), Some(404 | 410))
    }
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: PushSendError;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a SubscriptionRecord, payload: &'a [u8])
    -> Self::Fut<'a>;
}
