//! UseCase: タイピング通知の中継
//!
//! タイピング通知は揮発性のシグナルで、永続化も ACK もバッファリングも
//! 行わない。受信者がオフラインならそのまま捨てる。

use std::sync::Arc;

use crate::domain::{Principal, ServerEvent, SessionRegistry, UserId};

/// タイピング通知中継のユースケース
pub struct TypingRelayUseCase {
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl TypingRelayUseCase {
    /// 新しい TypingRelayUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// タイピング通知を宛先の接続へ転送
    ///
    /// # Arguments
    ///
    /// * `sender` - 通知を発したユーザーの Principal
    /// * `recipient_id` - ワイヤから届いたままの宛先（欠落・不正は黙って捨てる）
    /// * `is_typing` - typing_start なら true、typing_stop なら false
    pub async fn execute(&self, sender: &Principal, recipient_id: Option<i64>, is_typing: bool) {
        let Some(raw_recipient) = recipient_id else {
            tracing::debug!("Typing signal from user {} without recipient", sender.user_id);
            return;
        };
        let Ok(recipient_id) = UserId::new(raw_recipient) else {
            tracing::debug!(
                "Typing signal from user {} with invalid recipient {}",
                sender.user_id,
                raw_recipient
            );
            return;
        };

        let event = ServerEvent::UserTyping {
            user_id: sender.user_id,
            display_name: sender.display_name.clone(),
            is_typing,
        }
        .to_json();

        if let Err(e) = self.registry.push_to_user(recipient_id, &event).await {
            // オフラインの宛先への通知はそのまま捨てる
            tracing::debug!("Typing signal dropped: {}", e);
        }
    }
}
