//! UseCase: コミュニティメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendCommunityMessageUseCase::execute() メソッド
//! - 永続化 → community ルームへのブロードキャスト → 送信者への ACK
//!
//! ### なぜこのテストが必要か
//! - 送信者自身も他の参加者と同じ group_new_message を受け取る
//!   （特別扱いのエコーではなく正規イベント）ことを保証
//! - 検証失敗時は group_message_error になり永続化されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数参加者へのブロードキャスト
//! - 異常系：本文なし・永続化失敗

use std::sync::Arc;

use crate::domain::{
    CommunityMessage, MessageBody, MessageKind, MessageStore, Principal, PusherChannel, RoomId,
    ServerEvent, SessionRegistry,
};

use super::error::SendMessageError;

/// ワイヤから届いたままのコミュニティ送信リクエスト
#[derive(Debug, Clone, Default)]
pub struct CommunityMessageRequest {
    pub body: Option<String>,
    pub kind: Option<String>,
}

/// コミュニティメッセージ送信のユースケース
pub struct SendCommunityMessageUseCase {
    /// MessageStore（永続化コラボレータの抽象化）
    store: Arc<dyn MessageStore>,
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl SendCommunityMessageUseCase {
    /// 新しい SendCommunityMessageUseCase を作成
    pub fn new(store: Arc<dyn MessageStore>, registry: Arc<dyn SessionRegistry>) -> Self {
        Self { store, registry }
    }

    /// コミュニティメッセージ送信を実行
    ///
    /// 結果にかかわらず、`reply` へ `group_message_sent` または
    /// `group_message_error` のどちらかを必ず送る。
    pub async fn execute(
        &self,
        author: &Principal,
        request: CommunityMessageRequest,
        reply: &PusherChannel,
    ) -> Result<CommunityMessage, SendMessageError> {
        match self.persist_and_broadcast(author, &request).await {
            Ok(message) => {
                let ack = ServerEvent::GroupMessageSent {
                    message: message.clone(),
                }
                .to_json();
                if reply.send(ack).is_err() {
                    tracing::debug!(
                        "Author {} disconnected before group_message_sent ack",
                        author.user_id
                    );
                }
                Ok(message)
            }
            Err(err) => {
                let payload = ServerEvent::GroupMessageError {
                    error: err.to_string(),
                }
                .to_json();
                let _ = reply.send(payload);
                Err(err)
            }
        }
    }

    /// 検証・永続化・community ルームへのブロードキャスト
    ///
    /// 永続化の完了がブロードキャストより必ず先行する。送信者も community
    /// ルームの一員として同じイベントを受け取る。
    async fn persist_and_broadcast(
        &self,
        author: &Principal,
        request: &CommunityMessageRequest,
    ) -> Result<CommunityMessage, SendMessageError> {
        let body = MessageBody::new(request.body.clone().unwrap_or_default())?;
        let kind = MessageKind::parse(request.kind.as_deref())?;

        let message = self
            .store
            .create_community_message(author.user_id, body, kind)
            .await?;

        let event = ServerEvent::GroupNewMessage {
            message: message.clone(),
        }
        .to_json();
        self.registry
            .broadcast_room(&RoomId::Community, &event)
            .await;

        Ok(message)
    }
}
