//! Echo client - sends a frame and prints the echoed reply.
//!
//! Expects the echo server demo to be listening on 127.0.0.1:4000.
//! The connection stays up afterwards, exchanging heartbeats, until the
//! server goes away.

use peerwire::{Client, Request, Responder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peerwire=debug".into()),
        )
        .init();

    let client = Client::builder()
        .handle(6, |req: Request, _rsp: Responder| async move {
            println!("echoed back: {}", String::from_utf8_lossy(req.body()));
            Ok(())
        })
        .connect("127.0.0.1:4000")
        .await?;

    client.send_frame(5, b"hello, peer").await?;

    let reason = client.wait_for_disconnect().await?;
    println!("connection ended: {reason:?}");
    Ok(())
}
