//! Live cart badge demo.
//!
//! Spins up a throwaway in-process hub server that pushes a few cart
//! updates, connects an [`AgoraClient`] to it, and prints the badge as
//! events arrive.
//!
//! ```sh
//! cargo run -p cart-badge
//! ```

use std::time::Duration;

use agora::protocol::{events, hubs, CartUpdate};
use agora::session::{HttpAuthBackend, MemoryTokenStore};
use agora::transport::WebSocketConnector;
use agora::AgoraClientBuilder;
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(fake_hub_server(listener));
    tracing::info!(%addr, "fake hub server up");

    // No sign-in needed for the demo: the hub accepts anonymous dials.
    let client = AgoraClientBuilder::new(
        WebSocketConnector::new(format!("ws://{addr}")),
        MemoryTokenStore::new(),
        HttpAuthBackend::new("http://127.0.0.1:1")?,
    )
    .build();
    client.initialize().await;

    client.hubs().start_connection(hubs::CART).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _badge = client
        .hubs()
        .subscribe_to_event(hubs::CART, events::RECEIVE_CART_UPDATE, move |payload| {
            let _ = tx.send(payload);
        })
        .await;

    for _ in 0..3 {
        let Some(payload) = rx.recv().await else { break };
        let update: CartUpdate = serde_json::from_value(payload)?;
        println!(
            "cart badge: {} item(s), total {:.2}",
            update.number_of_items, update.total_price
        );
    }

    client.shutdown().await;
    Ok(())
}

/// Accepts hub connections and pushes three scripted cart updates.
async fn fake_hub_server(listener: TcpListener) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        tokio::spawn(async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            for (items, total) in [(1u32, 9.99f64), (2, 19.98), (3, 45.50)] {
                let frame = serde_json::json!({
                    "type": "event",
                    "event": events::RECEIVE_CART_UPDATE,
                    "payload": { "numberOfItems": items, "totalPrice": total },
                });
                if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        });
    }
}
