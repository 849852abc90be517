//! 设备入网与归属能力：自动注册、认领与释放。

mod claims;
mod registrar;

pub use claims::ClaimService;
pub use registrar::{RegistrationKind, RegistrationOutcome, RegistrationRequest, Registrar};

/// 入网与归属相关错误。
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("device not found")]
    NotFound,
    #[error("device already claimed")]
    AlreadyOwned,
    #[error("not device owner")]
    NotOwner,
    #[error("storage error: {0}")]
    Storage(String),
}
