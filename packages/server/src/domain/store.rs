//! MessageStore trait 定義
//!
//! メッセージ永続化コラボレータへのインターフェース。永続化そのものは
//! このサブシステムの外側の責務ですが、「永続化が配信より先に完了する」
//! という呼び出し順序はドメインの契約です。

use async_trait::async_trait;

use super::entity::{CommunityMessage, DirectMessage};
use super::error::StoreError;
use super::value_object::{MessageBody, MessageKind, UserId};

/// Message persistence gateway
///
/// どちらの create も、生成された id とタイムスタンプ、非正規化された
/// 表示名を含む保存済みの行を返す原子的な単一行インサートであること。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// ダイレクトメッセージを永続化する（`read = false` で作成）
    async fn create_direct_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        body: MessageBody,
        kind: MessageKind,
    ) -> Result<DirectMessage, StoreError>;

    /// コミュニティメッセージを永続化する
    async fn create_community_message(
        &self,
        author_id: UserId,
        body: MessageBody,
        kind: MessageKind,
    ) -> Result<CommunityMessage, StoreError>;

    /// `(recipient = 自分, sender = 相手, read = false)` のメッセージを
    /// 既読にし、更新件数を返す
    async fn mark_conversation_read(
        &self,
        recipient_id: UserId,
        sender_id: UserId,
    ) -> Result<u64, StoreError>;
}
