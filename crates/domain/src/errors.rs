use thiserror::Error;

/// 领域层错误。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 持久化协作方错误。
///
/// 核心不区分存储后端的具体故障，只要求错误可记录、可上抛。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
