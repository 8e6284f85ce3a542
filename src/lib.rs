pub mod adapters;
pub mod app;
pub mod config;
pub mod ports;
pub mod push;
pub mod realtime;
pub mod state;
pub mod types;

pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config))
        .await
        .expect("server error");
}
