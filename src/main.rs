use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use chat_fanout::adapters::http::build_router;
use chat_fanout::adapters::websocket::{
    BridgeOptions, BrokerBridge, ConnectionRegistry, GatewaySettings, PumpSettings,
    WebSocketState,
};
use chat_fanout::adapters::{InMemoryDirectory, LoggingEventHandler, RedisBroker};
use chat_fanout::application::ChatRelay;
use chat_fanout::config::{AppConfig, LogFormat};
use chat_fanout::ports::MessageEventHandler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    init_tracing(&config);
    config.validate()?;

    let instance_id = config.server.resolve_instance_id();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        instance_id = %instance_id,
        environment = ?config.server.environment,
        "chat-fanout starting"
    );

    let broker = Arc::new(RedisBroker::connect(&config.broker.url, &config.broker.exchange).await?);
    tracing::info!(exchange = %config.broker.exchange, "Connected to broker");

    let bridge = Arc::new(BrokerBridge::new(
        broker,
        instance_id,
        BridgeOptions {
            publish_queue_capacity: config.broker.publish_queue_capacity,
            reconnect_delay: config.broker.reconnect_delay(),
        },
    ));

    let directory = Arc::new(seed_directory(&config)?);
    let registry = Arc::new(ConnectionRegistry::new());
    let relay = Arc::new(ChatRelay::new(
        registry,
        bridge.clone(),
        directory.clone(),
        directory,
        Arc::new(LoggingEventHandler::new()),
    )
    .with_max_message_size(config.chat.max_message_size));

    let consumer = bridge.consume(relay.clone() as Arc<dyn MessageEventHandler>);

    let settings = GatewaySettings {
        outbox_capacity: config.chat.outbox_capacity,
        pumps: PumpSettings {
            ping_interval: config.chat.ping_interval(),
            pong_wait: config.chat.pong_wait(),
            write_wait: config.chat.write_wait(),
            max_message_size: config.chat.max_message_size,
        },
    };
    let router = build_router(
        WebSocketState::new(relay, settings),
        &config.server.cors_origins_list(),
    );

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    consumer.abort();
    tracing::info!("chat-fanout stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.server.effective_log_format() {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
    }
}

fn seed_directory(config: &AppConfig) -> Result<InMemoryDirectory, Box<dyn std::error::Error>> {
    let mut directory = InMemoryDirectory::new();
    for (id, username) in config.directory.user_entries()? {
        directory = directory.with_user(id, username);
    }
    for id in config.directory.room_entries()? {
        directory = directory.with_room(id);
    }
    Ok(directory)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
