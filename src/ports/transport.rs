use tokio::sync::mpsc;

/// Events surfaced by an established transport connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete text frame arrived from the wire.
    Frame(String),
    /// Transport-level error; always followed by `Closed`.
    Error(String),
    /// The connection ended. `normal` is true only for a normal-closure code.
    Closed { normal: bool },
}

/// Handle to one live connection. Dropping `outbound` asks the adapter to
/// close the socket with a normal-closure code.
pub struct TransportChannel {
    pub outbound: mpsc::Sender<String>,
    pub events: mpsc::Receiver<TransportEvent>,
}

pub trait Transport: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<TransportChannel, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn connect<'a>(&'a self, url: &'a str) -> Self::Fut<'a>;
}
