pub mod manager;
pub mod subscribers;

pub use manager::{ConnectionManager, ConnectionState, ManagerConfig, SendError};
pub use subscribers::{SubscriberMap, SubscriptionHandle};
