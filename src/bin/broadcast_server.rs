use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use typedsockets_server::bin_common::{
    init_tracing, load_config_from_env, print_banner, print_shutdown, ConfigType,
    ShutdownManager,
};
use typedsockets_server::typedsockets::{self, ConnectionId, ServerConfig};

/// Frames accepted from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatIn {
    Say { text: String },
    Nick { name: String },
}

/// Frames sent to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatOut {
    Welcome { id: ConnectionId },
    Said { from: String, text: String },
    Renamed { id: ConnectionId, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let config_path = load_config_from_env(ConfigType::Server);
    init_tracing();

    let config = ServerConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!("Loaded configuration from {}", config_path.display());

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    // Listeners run on the server loop; anything that needs the server
    // itself goes through this channel to the main task
    let (chat_tx, mut chat_rx) = mpsc::unbounded_channel::<(ConnectionId, ChatIn)>();

    let server = typedsockets::builder()
        .json::<ChatOut, ChatIn>()
        .config(config.clone())
        .on_listening(|| info!("Server is accepting connections"))
        .on_connection(|client| {
            info!("Client {} connected", client.id());
            client.send(&ChatOut::Welcome { id: client.id() });
        })
        .on_message(move |client, chat| {
            let _ = chat_tx.send((client.id(), chat.clone()));
        })
        .on_disconnection(|client| {
            let online_for = (Utc::now() - client.connected_at()).num_seconds();
            info!("Client {} disconnected after {}s", client.id(), online_for);
        })
        .on_close(|| info!("Server stopped accepting connections"))
        .listen()
        .await
        .context("starting server")?;

    print_banner("Broadcast Server", &config.listen.address());

    let mut names = std::collections::HashMap::<ConnectionId, String>::new();

    loop {
        tokio::select! {
            Some((id, chat)) = chat_rx.recv() => {
                match chat {
                    ChatIn::Say { text } => {
                        let from = names.get(&id).cloned().unwrap_or_else(|| format!("#{}", id));
                        let delivered = server.send_to_all(&ChatOut::Said { from, text });
                        info!("Message from {} delivered to {} clients", id, delivered);
                    }
                    ChatIn::Nick { name } => {
                        names.insert(id, name.clone());
                        server.send_to_all(&ChatOut::Renamed { id, name });
                    }
                }
            }
            _ = shutdown.wait() => break,
        }

        // Forget names of clients that are gone
        names.retain(|id, _| server.client(*id).is_some());
    }

    server.close();
    for client in server.clients() {
        client.close();
    }

    let metrics = server.metrics();
    let stats = format!(
        "Connections: {} | Messages: {} | Dropped frames: {} | Evicted: {}",
        metrics.connections_accepted,
        metrics.messages_received,
        metrics.decode_failures,
        metrics.terminations
    );

    match tokio::time::timeout(Duration::from_secs(5), server.join()).await {
        Ok(result) => result.context("server loop failed")?,
        Err(_) => warn!("Clients did not close in time, exiting anyway"),
    }

    print_shutdown("Broadcast Server", Some(&stats));
    Ok(())
}
