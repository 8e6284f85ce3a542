pub mod push;
pub mod time;
pub mod transport;

pub use push::{PushSendError, PushSender};
pub use time::TimeProvider;
pub use transport::{Transport, TransportChannel, TransportEvent};
