//! SessionRegistry trait 定義
//!
//! ドメイン層が必要とする接続レジストリのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! レジストリはプロセス全体で唯一の可変共有状態であり、
//! 「ユーザーごとに最大 1 セッション」という不変条件を守る責務を持ちます。

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::entity::{Connection, Principal};
use super::error::PushError;
use super::value_object::{ConnectionId, RoomId, UserId};

/// 接続へメッセージを押し込むためのチャンネル
///
/// 送信はキュー投入のみで完了するため、受信側が遅くても送信側の
/// リクエスト処理は停止しない。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// レジストリに登録された 1 本の接続
///
/// 所有権はレジストリにある。エントリが置き換えられた（強制退去）場合、
/// この値が drop されることで `PusherChannel` が閉じ、旧接続のソケット
/// タスクは自律的に終了する。
#[derive(Debug)]
pub struct RegisteredConnection {
    pub connection: Connection,
    pub principal: Principal,
    pub sender: PusherChannel,
    pub joined_rooms: HashSet<RoomId>,
}

impl RegisteredConnection {
    /// 既定のルーム（自分のプライベートルーム + community）に参加した
    /// 状態の登録エントリを作成
    pub fn new(connection: Connection, principal: Principal, sender: PusherChannel) -> Self {
        let joined_rooms = RoomId::default_rooms(principal.user_id);
        Self {
            connection,
            principal,
            sender,
            joined_rooms,
        }
    }
}

/// Session registry trait
///
/// `userId → 現在の接続` の権威あるマップ。UseCase 層はこの trait に依存し、
/// Infrastructure 層の具体的な実装には依存しない。
///
/// ## 不変条件
///
/// - ユーザーごとにエントリは常に高々 1 つ
/// - `register` は同一ユーザーに対する並行登録と直列化される
///   （check-and-set が単一の原子的ステップ）
/// - `deregister_if_current` は接続 ID を比較してから削除する
///   （遅延した旧接続の close が新エントリを消さない）
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// エントリを原子的に挿入・置換し、追い出された旧接続を返す
    async fn register(&self, connection: RegisteredConnection) -> Option<RegisteredConnection>;

    /// ユーザーの現在の接続 ID を取得
    async fn lookup(&self, user_id: UserId) -> Option<ConnectionId>;

    /// 呼び出し元がまだ現在の接続である場合のみエントリを削除する
    ///
    /// 削除した場合 true。
    async fn deregister_if_current(&self, user_id: UserId, connection_id: ConnectionId) -> bool;

    /// 現在オンラインのユーザー ID を取得
    async fn list_user_ids(&self) -> Vec<UserId>;

    /// 現在オンラインの principal のスナップショットを取得
    async fn snapshot_principals(&self) -> Vec<Principal>;

    /// ルーム参加の再表明
    ///
    /// 呼び出し元がまだ現在の接続である場合のみ反映し、反映したら true。
    async fn join_room(&self, user_id: UserId, connection_id: ConnectionId, room: RoomId) -> bool;

    /// ユーザーのプライベートルーム（現在の接続）へプッシュ
    async fn push_to_user(&self, user_id: UserId, payload: &str) -> Result<(), PushError>;

    /// ルームに参加している全接続へブロードキャスト
    ///
    /// 一部の接続への送信失敗は許容する。
    async fn broadcast_room(&self, room: &RoomId, payload: &str);

    /// 指定ユーザーを除く全接続へブロードキャスト
    async fn broadcast_except(&self, exclude: UserId, payload: &str);
}
