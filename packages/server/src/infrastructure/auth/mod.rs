//! PrincipalResolver の実装
//!
//! トークンの発行は外部の認証サービスの責務で、ここでは検証のみを行います。

pub mod jwt;

pub use jwt::{Claims, JwtPrincipalResolver};
