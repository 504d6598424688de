use booking_server::{Config, Server, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, work dir, logging)
    setup_environment()?;

    tracing::info!("Booking server starting...");

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Run the HTTP server
    let server = Server::new(config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
