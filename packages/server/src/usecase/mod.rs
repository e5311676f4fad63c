//! UseCase 層
//!
//! 1 ユースケース 1 ファイル。UseCase はドメイン層の trait にのみ依存し、
//! Infrastructure 層の具体的な実装には依存しません。

mod close_session;
mod error;
mod establish_session;
mod get_presence;
mod send_community_message;
mod send_direct_message;
mod typing_relay;

pub use close_session::CloseSessionUseCase;
pub use error::{ConnectError, SendMessageError};
pub use establish_session::{EstablishSessionUseCase, EstablishedSession};
pub use get_presence::GetPresenceUseCase;
pub use send_community_message::{CommunityMessageRequest, SendCommunityMessageUseCase};
pub use send_direct_message::{DirectMessageRequest, SendDirectMessageUseCase};
pub use typing_relay::TypingRelayUseCase;
