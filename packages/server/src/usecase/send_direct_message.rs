//! UseCase: ダイレクトメッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendDirectMessageUseCase::execute() メソッド
//! - 検証 → 永続化 → 受信者への配信 → 送信者への ACK の流れ
//!
//! ### なぜこのテストが必要か
//! - 「永続化が配信より先に完了する」順序はこのサブシステムの中核契約
//! - 送信者は必ず message_sent か message_error のどちらかを受け取る
//!   （無応答は許されない）
//! - clientTempId が送信者の ACK にだけ、そのまま載ることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：受信者オンラインでの送信
//! - 正常系：受信者オフラインでの送信（ACK のみ、配信なし）
//! - 異常系：自分宛て送信・宛先なし・本文なし・永続化失敗

use std::sync::Arc;

use crate::domain::{
    ClientTempId, DirectMessage, MessageBody, MessageKind, MessageStore, Principal, PusherChannel,
    ServerEvent, SessionRegistry, UserId, ValidationError,
};

use super::error::SendMessageError;

/// ワイヤから届いたままの送信リクエスト
///
/// フィールドの欠落・不正はここでは表現のみ行い、検証は execute 内で行う。
#[derive(Debug, Clone, Default)]
pub struct DirectMessageRequest {
    pub recipient_id: Option<i64>,
    pub body: Option<String>,
    pub kind: Option<String>,
    pub client_temp_id: Option<String>,
}

/// ダイレクトメッセージ送信のユースケース
pub struct SendDirectMessageUseCase {
    /// MessageStore（永続化コラボレータの抽象化）
    store: Arc<dyn MessageStore>,
    /// SessionRegistry（接続レジストリの抽象化）
    registry: Arc<dyn SessionRegistry>,
}

impl SendDirectMessageUseCase {
    /// 新しい SendDirectMessageUseCase を作成
    pub fn new(store: Arc<dyn MessageStore>, registry: Arc<dyn SessionRegistry>) -> Self {
        Self { store, registry }
    }

    /// ダイレクトメッセージ送信を実行
    ///
    /// 結果にかかわらず、`reply`（送信者自身の接続のチャンネル）へ
    /// `message_sent` または `message_error` のどちらかを必ず送る。
    /// レジストリ経由ではなく接続自身のチャンネルに返すため、送信処理中に
    /// 別セッションへ置き換えられても ACK が新セッションに流れることはない。
    ///
    /// # Returns
    ///
    /// * `Ok(DirectMessage)` - 永続化されたメッセージ
    /// * `Err(SendMessageError)` - 検証または永続化の失敗（永続化なし）
    pub async fn execute(
        &self,
        sender: &Principal,
        request: DirectMessageRequest,
        reply: &PusherChannel,
    ) -> Result<DirectMessage, SendMessageError> {
        match self.persist_and_deliver(sender, &request).await {
            Ok((message, client_temp_id)) => {
                let ack = ServerEvent::MessageSent {
                    message: message.clone(),
                    client_temp_id,
                }
                .to_json();
                if reply.send(ack).is_err() {
                    // 送信者がすでに切断していても、メッセージは永続化済み。
                    // ACK の喪失は再接続後の読み取りで解消される。
                    tracing::debug!(
                        "Sender {} disconnected before message_sent ack",
                        sender.user_id
                    );
                }
                Ok(message)
            }
            Err(err) => {
                let payload = ServerEvent::MessageError {
                    error: err.to_string(),
                }
                .to_json();
                let _ = reply.send(payload);
                Err(err)
            }
        }
    }

    /// 検証・永続化・受信者への配信
    ///
    /// 永続化の完了が配信より必ず先行する。配信は「既に真になった事実の
    /// 通知」であり、受信者オフラインは成功として扱う。
    async fn persist_and_deliver(
        &self,
        sender: &Principal,
        request: &DirectMessageRequest,
    ) -> Result<(DirectMessage, Option<ClientTempId>), SendMessageError> {
        // 1. 検証（失敗したら永続化は一切行わない）
        let (recipient_id, body, kind, client_temp_id) = validate(sender, request)?;

        // 2. 永続化（read = false で作成）
        let message = self
            .store
            .create_direct_message(sender.user_id, recipient_id, body, kind)
            .await?;

        // 3. 受信者のプライベートルームへ配信。clientTempId は載せない
        let event = ServerEvent::NewMessage {
            message: message.clone(),
        }
        .to_json();
        if let Err(e) = self.registry.push_to_user(recipient_id, &event).await {
            // 受信者オフライン（またはルックアップとプッシュの間に消えた）。
            // キューや再送はせず、永続化済みの事実だけが残る
            tracing::debug!("Delivery to user {} skipped: {}", recipient_id, e);
        }

        Ok((message, client_temp_id))
    }
}

type ValidatedRequest = (UserId, MessageBody, MessageKind, Option<ClientTempId>);

fn validate(
    sender: &Principal,
    request: &DirectMessageRequest,
) -> Result<ValidatedRequest, ValidationError> {
    let recipient_id = request
        .recipient_id
        .ok_or(ValidationError::MissingRecipient)?;
    let recipient_id = UserId::new(recipient_id)?;
    if recipient_id == sender.user_id {
        return Err(ValidationError::SelfMessage);
    }

    let body = MessageBody::new(request.body.clone().unwrap_or_default())?;
    let kind = MessageKind::parse(request.kind.as_deref())?;
    let client_temp_id = request
        .client_temp_id
        .clone()
        .map(ClientTempId::new)
        .transpose()?;

    Ok((recipient_id, body, kind, client_temp_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Connection, DisplayName, MockMessageStore, RegisteredConnection, StoreError,
    };
    use crate::infrastructure::registry::InMemorySessionRegistry;
    use crate::infrastructure::store::InMemoryMessageStore;
    use tokio::sync::mpsc;

    fn principal(user_id: i64, name: &str) -> Principal {
        Principal::new(
            UserId::new(user_id).unwrap(),
            DisplayName::new(name.to_string()).unwrap(),
        )
    }

    async fn register(
        registry: &InMemorySessionRegistry,
        p: Principal,
    ) -> (PusherChannel, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connection = Connection::open();
        connection.begin_authentication().unwrap();
        connection.activate().unwrap();
        registry
            .register(RegisteredConnection::new(connection, p, tx.clone()))
            .await;
        (tx, rx)
    }

    fn request(recipient: i64, body: &str, temp_id: Option<&str>) -> DirectMessageRequest {
        DirectMessageRequest {
            recipient_id: Some(recipient),
            body: Some(body.to_string()),
            kind: None,
            client_temp_id: temp_id.map(str::to_string),
        }
    }

    fn parse(payload: &str) -> serde_json::Value {
        serde_json::from_str(payload).unwrap()
    }

    #[tokio::test]
    async fn test_send_to_online_recipient_delivers_and_acks() {
        // テスト項目: 受信者に new_message、送信者に clientTempId 付き
        //             message_sent が届く
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let usecase = SendDirectMessageUseCase::new(store.clone(), registry.clone());

        let alicia = principal(1, "Alicia");
        let bruno = principal(2, "Bruno");
        let (alicia_tx, mut alicia_rx) = register(&registry, alicia.clone()).await;
        let (_bruno_tx, mut bruno_rx) = register(&registry, bruno).await;

        // when (操作):
        let result = usecase
            .execute(&alicia, request(2, "hola", Some("abc")), &alicia_tx)
            .await;

        // then (期待する結果):
        let message = result.unwrap();
        assert_eq!(message.id, 1);

        // 受信者への new_message（clientTempId なし）
        let delivered = parse(&bruno_rx.recv().await.unwrap());
        assert_eq!(delivered["type"], "new_message");
        assert_eq!(delivered["message"]["body"], "hola");
        assert_eq!(delivered["message"]["senderId"], 1);
        assert!(delivered.get("clientTempId").is_none());

        // 送信者への message_sent（clientTempId あり）
        let ack = parse(&alicia_rx.recv().await.unwrap());
        assert_eq!(ack["type"], "message_sent");
        assert_eq!(ack["clientTempId"], "abc");
        assert_eq!(ack["message"]["id"], 1);

        // 永続化されている
        assert_eq!(store.direct_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_send_to_offline_recipient_still_acks() {
        // テスト項目: 受信者オフラインでも message_sent が返り、配信は行われない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let usecase = SendDirectMessageUseCase::new(store.clone(), registry.clone());

        let alicia = principal(1, "Alicia");
        let (alicia_tx, mut alicia_rx) = register(&registry, alicia.clone()).await;

        // when (操作): 接続していないユーザー 999 へ送信
        let result = usecase
            .execute(&alicia, request(999, "hola", Some("t1")), &alicia_tx)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let ack = parse(&alicia_rx.recv().await.unwrap());
        assert_eq!(ack["type"], "message_sent");
        assert_eq!(ack["clientTempId"], "t1");

        // ACK 以外のイベントは誰にも流れていない
        assert!(alicia_rx.try_recv().is_err());
        assert_eq!(store.direct_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_self_send_is_rejected_without_persistence() {
        // テスト項目: 自分宛て送信は message_error になり、永続化されない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let usecase = SendDirectMessageUseCase::new(store.clone(), registry.clone());

        let alicia = principal(1, "Alicia");
        let (alicia_tx, mut alicia_rx) = register(&registry, alicia.clone()).await;

        // when (操作):
        let result = usecase
            .execute(&alicia, request(1, "hola", None), &alicia_tx)
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::Validation(ValidationError::SelfMessage))
        );
        let error = parse(&alicia_rx.recv().await.unwrap());
        assert_eq!(error["type"], "message_error");
        assert_eq!(error["error"], "cannot send a message to yourself");
        assert!(store.direct_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_recipient_and_body_are_rejected() {
        // テスト項目: 宛先なし・本文なしはそれぞれ message_error になる
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let usecase = SendDirectMessageUseCase::new(store.clone(), registry.clone());

        let alicia = principal(1, "Alicia");
        let (alicia_tx, mut alicia_rx) = register(&registry, alicia.clone()).await;

        // when (操作): 宛先なし
        let no_recipient = DirectMessageRequest {
            body: Some("hola".to_string()),
            ..Default::default()
        };
        let result = usecase.execute(&alicia, no_recipient, &alicia_tx).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::Validation(
                ValidationError::MissingRecipient
            ))
        );
        assert_eq!(
            parse(&alicia_rx.recv().await.unwrap())["type"],
            "message_error"
        );

        // when (操作): 本文なし
        let no_body = DirectMessageRequest {
            recipient_id: Some(2),
            ..Default::default()
        };
        let result = usecase.execute(&alicia, no_body, &alicia_tx).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::Validation(ValidationError::EmptyBody))
        );
        assert_eq!(
            parse(&alicia_rx.recv().await.unwrap())["type"],
            "message_error"
        );
        assert!(store.direct_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_yields_error_and_no_delivery() {
        // テスト項目: 永続化失敗時は message_error が返り、配信は一切行われない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let mut store = MockMessageStore::new();
        store.expect_create_direct_message().returning(|_, _, _, _| {
            Err(StoreError::WriteFailed("connection pool exhausted".to_string()))
        });
        let usecase = SendDirectMessageUseCase::new(Arc::new(store), registry.clone());

        let alicia = principal(1, "Alicia");
        let bruno = principal(2, "Bruno");
        let (alicia_tx, mut alicia_rx) = register(&registry, alicia.clone()).await;
        let (_bruno_tx, mut bruno_rx) = register(&registry, bruno).await;

        // when (操作):
        let result = usecase
            .execute(&alicia, request(2, "hola", Some("abc")), &alicia_tx)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::Persistence(_))));
        let error = parse(&alicia_rx.recv().await.unwrap());
        assert_eq!(error["type"], "message_error");
        // 内部詳細はクライアントに漏れない
        assert_eq!(error["error"], "message could not be saved");
        // 受信者には何も届かない（部分配信なし）
        assert!(bruno_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ack_goes_to_own_channel_even_after_eviction() {
        // テスト項目: 送信処理中に退去されても ACK は元の接続のチャンネルに返る
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let usecase = SendDirectMessageUseCase::new(store.clone(), registry.clone());

        let alicia = principal(1, "Alicia");
        let (old_tx, mut old_rx) = register(&registry, alicia.clone()).await;
        // 新しいセッションが同じユーザーを上書きする
        let (_new_tx, mut new_rx) = register(&registry, alicia.clone()).await;

        // when (操作): 旧接続のチャンネルを reply として送信
        let result = usecase
            .execute(&alicia, request(2, "hola", Some("abc")), &old_tx)
            .await;

        // then (期待する結果): ACK は旧チャンネルへ、新セッションには流れない
        assert!(result.is_ok());
        let ack = parse(&old_rx.recv().await.unwrap());
        assert_eq!(ack["type"], "message_sent");
        assert!(new_rx.try_recv().is_err());
    }
}
