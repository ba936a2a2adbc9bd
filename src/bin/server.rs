use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use roomcast::auth::{AuthVerifier, JwtVerifier};
use roomcast::config::ServerConfig;
use roomcast::core::service::FeedService;
use roomcast::handlers::{gateway_routes, GatewayState};
use roomcast::transport::{TransportSender, WsTransport};

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG from the file is honored
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    env_logger::init();

    if dotenv_loaded {
        info!("Environment variables loaded from .env file");
    } else {
        warn!("No .env file found, relying on process environment");
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, default_room={}",
        config.host, config.port, config.default_room
    );

    let transport = Arc::new(WsTransport::new());
    let service = Arc::new(FeedService::new(
        &config,
        Arc::clone(&transport) as Arc<dyn TransportSender>,
    ));
    let verifier: Arc<dyn AuthVerifier> = Arc::new(JwtVerifier::new(&config.jwt_secret));

    let state = GatewayState::new(&config, service, transport, verifier);
    let routes = gateway_routes(state);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Roomcast server on {}", addr);
    warp::serve(routes).run(addr).await;
}
