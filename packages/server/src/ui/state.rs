//! Server state shared across connection handlers.

use std::sync::Arc;

use crate::usecase::{
    CloseSessionUseCase, EstablishSessionUseCase, GetPresenceUseCase, SendCommunityMessageUseCase,
    SendDirectMessageUseCase, TypingRelayUseCase,
};

/// Shared application state
pub struct AppState {
    /// EstablishSessionUseCase（セッション確立のユースケース）
    pub establish_session_usecase: Arc<EstablishSessionUseCase>,
    /// CloseSessionUseCase（セッション終了のユースケース）
    pub close_session_usecase: Arc<CloseSessionUseCase>,
    /// SendDirectMessageUseCase（ダイレクトメッセージ送信のユースケース）
    pub send_direct_message_usecase: Arc<SendDirectMessageUseCase>,
    /// SendCommunityMessageUseCase（コミュニティメッセージ送信のユースケース）
    pub send_community_message_usecase: Arc<SendCommunityMessageUseCase>,
    /// TypingRelayUseCase（タイピング通知中継のユースケース）
    pub typing_relay_usecase: Arc<TypingRelayUseCase>,
    /// GetPresenceUseCase（プレゼンス一覧取得のユースケース）
    pub get_presence_usecase: Arc<GetPresenceUseCase>,
}
