//! Echo server - answers every id-5 frame with the same body under id 6.
//!
//! This demo shows:
//! - Registering command handlers with the builder
//! - Responding to a request on the same connection
//! - Observing disconnects through the lifecycle hook
//!
//! Run it, then point the echo client at it:
//!
//! ```text
//! cargo run --example echo_server
//! cargo run --example echo_client
//! ```

use std::net::SocketAddr;

use peerwire::{Request, Responder, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peerwire=debug".into()),
        )
        .init();

    let server = Server::builder()
        .handle(5, |req: Request, rsp: Responder| async move {
            println!("echo from {}: {:?}", req.peer_addr(), req.body());
            rsp.send_frame(6, req.body()).await
        })
        .on_disconnect(|peer: SocketAddr| async move {
            println!("{peer} disconnected");
        })
        .bind("127.0.0.1:4000")
        .await?;

    server.run().await?;
    Ok(())
}
