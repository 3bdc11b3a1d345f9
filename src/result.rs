use thiserror::Error;
use tokio::task::JoinError;
use zip::result::ZipError;

/// 核心错误类型
///
/// 前四个变体是转换流程中面向用户的终止条件，其余是底层 IO/编码错误。
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Error loading ZIP file: {0}")]
    Load(String),

    #[error("The {0} folder was not found in the ZIP.")]
    MissingAssets(String),

    #[error("Invalid pack.mcmeta: {0}")]
    ManifestParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] JoinError),

    #[error("Config error: {0}")]
    Config(String),
}

impl CoreError {
    /// 是否属于输入包本身的问题（用户修正输入后可重试）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidFormat(_)
                | CoreError::Load(_)
                | CoreError::MissingAssets(_)
                | CoreError::ManifestParse(_)
        )
    }
}

/// 核心结果类型
pub type CoreResult<T = ()> = Result<T, CoreError>;
