use std::sync::Arc;

use dotenv::dotenv;
use room_gateway::room::EchoRoom;
use room_gateway::server::RoomServer;
use room_gateway::Settings;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new()?;
    info!(
        "Starting room gateway for '{}' at {}:{}",
        settings.room.name, settings.server.host, settings.server.port
    );

    let room = Arc::new(EchoRoom::new(&settings.room));
    let server = Arc::new(RoomServer::new(room));

    let listener =
        TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port)).await?;
    info!(
        "Room gateway ready to accept connections at ws://{}:{}",
        settings.server.host, settings.server.port
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let server = Arc::clone(&server);
                tokio::spawn(async move {
                    server.handle_connection(stream, addr).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
