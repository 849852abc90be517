//! 认证能力：access token 的签发与校验。
//!
//! 本服务不管理用户，调用方持有由共享密钥签发的 JWT。

mod jwt;

pub use jwt::JwtManager;

/// 认证相关错误。
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    TokenExpired,
    #[error("token invalid")]
    TokenInvalid,
    #[error("internal error: {0}")]
    Internal(String),
}
