//! Real-time messaging relay server for the tsunagi marketplace.
//!
//! Authenticated users exchange direct messages and post to the shared
//! community channel; every message is durably recorded before delivery.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tsunagi-server
//! cargo run --bin tsunagi-server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;

use clap::Parser;
use tsunagi_server::{
    infrastructure::{InMemoryMessageStore, InMemorySessionRegistry, JwtPrincipalResolver},
    ui::Server,
    usecase::{
        CloseSessionUseCase, EstablishSessionUseCase, GetPresenceUseCase,
        SendCommunityMessageUseCase, SendDirectMessageUseCase, TypingRelayUseCase,
    },
};
use tsunagi_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tsunagi-server")]
#[command(about = "Marketplace chat relay with direct and community messaging", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // The verification secret is shared with the token-issuing auth service
    let jwt_secret = std::env::var("TSUNAGI_JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("TSUNAGI_JWT_SECRET not set, falling back to the development secret");
        "tsunagi-dev-secret".to_string()
    });

    // Initialize dependencies in order:
    // 1. Store / Registry / Resolver
    // 2. UseCases
    // 3. Server

    // 1. Collaborators
    let store = Arc::new(InMemoryMessageStore::new());
    let registry = Arc::new(InMemorySessionRegistry::new());
    let resolver = Arc::new(JwtPrincipalResolver::new(&jwt_secret));

    // 2. UseCases
    let establish_session_usecase = Arc::new(EstablishSessionUseCase::new(
        resolver.clone(),
        registry.clone(),
    ));
    let close_session_usecase = Arc::new(CloseSessionUseCase::new(registry.clone()));
    let send_direct_message_usecase = Arc::new(SendDirectMessageUseCase::new(
        store.clone(),
        registry.clone(),
    ));
    let send_community_message_usecase = Arc::new(SendCommunityMessageUseCase::new(
        store.clone(),
        registry.clone(),
    ));
    let typing_relay_usecase = Arc::new(TypingRelayUseCase::new(registry.clone()));
    let get_presence_usecase = Arc::new(GetPresenceUseCase::new(registry.clone()));

    // 3. Create and run the server
    let server = Server::new(
        establish_session_usecase,
        close_session_usecase,
        send_direct_message_usecase,
        send_community_message_usecase,
        typing_relay_usecase,
        get_presence_usecase,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
