//! Watchroom server binary.
//!
//! Run with: cargo run --bin watchroom-server

use watchroom_server::{Server, ServerConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;

    println!("Starting watchroom server...");
    println!("  HTTP: http://{}", config.listen_addr);
    println!("  WS:   ws://{}/ws", config.listen_addr);
    println!();
    println!("Endpoints:");
    println!("  GET  /health        - Health check");
    println!("  POST /rooms/create  - Create room");
    println!("  GET  /rooms         - List public rooms");
    println!("  GET  /rooms/{{id}}    - Room info");
    println!("  GET  /ws            - Realtime session socket");
    println!();

    Server::new(config).run().await?;

    Ok(())
}
