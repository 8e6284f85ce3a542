use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::ports;
use crate::ports::transport::{TransportChannel, TransportEvent};
use crate::types::push::{SubscriptionRecord, VapidConfig};

/// Undelivered push messages expire upstream after this many seconds instead
/// of queuing indefinitely.
const PUSH_TTL_SECS: u32 = 300;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSendError for web_push::WebPushError {
    fn status_code(&self) -> Option<u16> {
        match self {
            web_push::WebPushError::BadRequest(_) => Some(400),
            web_push::WebPushError::Unauthorized => Some(401),
            web_push::WebPushError::EndpointNotFound => Some(404),
            web_push::WebPushError::EndpointNotValid => Some(410),
            web_push::WebPushError::PayloadTooLarge => Some(413),
            web_push::WebPushError::ServerError(_) => Some(500),
            _ => None,
        }
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a SubscriptionRecord,
        payload: &'a [u8],
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.keys.p256dh.clone(),
                subscription.keys.auth.clone(),
            );
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload);
            builder.set_ttl(PUSH_TTL_SECS);
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}

/// WebSocket transport for the connection manager. Each successful connect
/// spawns a pump task that owns the socket and bridges it onto channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl ports::Transport for WsTransport {
    type Error = tokio_tungstenite::tungstenite::Error;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<TransportChannel, Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn connect<'a>(&'a self, url: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let (socket, _response) = connect_async(url).await?;
            let (outbound_tx, outbound_rx) = mpsc::channel(64);
            let (event_tx, event_rx) = mpsc::channel(64);
            tokio::spawn(pump_socket(socket, outbound_rx, event_tx));
            Ok(TransportChannel {
                outbound: outbound_tx,
                events: event_rx,
            })
        })
    }
}

type WsSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn pump_socket(
    mut socket: WsSocket,
    mut outbound: mpsc::Receiver<String>,
    events: mpsc::Sender<TransportEvent>,
) {
    loop {
        tokio::select! {
            request = outbound.recv() => match request {
                Some(text) => {
                    if let Err(error) = socket.send(Message::Text(text)).await {
                        let _ = events.send(TransportEvent::Error(error.to_string())).await;
                        let _ = events.send(TransportEvent::Closed { normal: false }).await;
                        return;
                    }
                }
                // All outbound senders dropped: caller-initiated disconnect.
                None => {
                    let _ = socket
                        .close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "client disconnect".into(),
                        }))
                        .await;
                    let _ = events.send(TransportEvent::Closed { normal: true }).await;
                    return;
                }
            },
            inbound = socket.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Frame(text.to_string())).await;
                }
                Some(Ok(Message::Close(close))) => {
                    let normal = close
                        .map(|frame| frame.code == CloseCode::Normal)
                        .unwrap_or(false);
                    let _ = events.send(TransportEvent::Closed { normal }).await;
                    return;
                }
                // Binary and control frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    let _ = events.send(TransportEvent::Error(error.to_string())).await;
                    let _ = events.send(TransportEvent::Closed { normal: false }).await;
                    return;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed { normal: false }).await;
                    return;
                }
            },
        }
    }
}
