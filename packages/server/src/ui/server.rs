//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::usecase::{
    CloseSessionUseCase, EstablishSessionUseCase, GetPresenceUseCase, SendCommunityMessageUseCase,
    SendDirectMessageUseCase, TypingRelayUseCase,
};

use super::{
    handler::{debug_presence, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket relay server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     establish_session_usecase,
///     close_session_usecase,
///     send_direct_message_usecase,
///     send_community_message_usecase,
///     typing_relay_usecase,
///     get_presence_usecase,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// EstablishSessionUseCase（セッション確立のユースケース）
    establish_session_usecase: Arc<EstablishSessionUseCase>,
    /// CloseSessionUseCase（セッション終了のユースケース）
    close_session_usecase: Arc<CloseSessionUseCase>,
    /// SendDirectMessageUseCase（ダイレクトメッセージ送信のユースケース）
    send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
    /// SendCommunityMessageUseCase（コミュニティメッセージ送信のユースケース）
    send_community_message_usecase: Arc<SendCommunityMessageUseCase>,
    /// TypingRelayUseCase（タイピング通知中継のユースケース）
    typing_relay_usecase: Arc<TypingRelayUseCase>,
    /// GetPresenceUseCase（プレゼンス一覧取得のユースケース）
    get_presence_usecase: Arc<GetPresenceUseCase>,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        establish_session_usecase: Arc<EstablishSessionUseCase>,
        close_session_usecase: Arc<CloseSessionUseCase>,
        send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
        send_community_message_usecase: Arc<SendCommunityMessageUseCase>,
        typing_relay_usecase: Arc<TypingRelayUseCase>,
        get_presence_usecase: Arc<GetPresenceUseCase>,
    ) -> Self {
        Self {
            establish_session_usecase,
            close_session_usecase,
            send_direct_message_usecase,
            send_community_message_usecase,
            typing_relay_usecase,
            get_presence_usecase,
        }
    }

    /// Build the axum Router for this server.
    ///
    /// Exposed separately so integration tests can serve the router on an
    /// ephemeral port without going through `run`.
    pub fn into_router(self) -> Router {
        let app_state = Arc::new(AppState {
            establish_session_usecase: self.establish_session_usecase,
            close_session_usecase: self.close_session_usecase,
            send_direct_message_usecase: self.send_direct_message_usecase,
            send_community_message_usecase: self.send_community_message_usecase,
            typing_relay_usecase: self.typing_relay_usecase,
            get_presence_usecase: self.get_presence_usecase,
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/debug/presence", get(debug_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the WebSocket relay server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.into_router();

        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        // Start the server
        tracing::info!(
            "Marketplace chat relay listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
