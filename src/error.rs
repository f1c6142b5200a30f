use thiserror::Error;

/// 应用错误分类: 上传 / 抽取 / 归一化 / 持久化
/// 所有失败对当前动作都是终态, 不自动重试, 恢复靠用户重新发起
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("extraction request failed: {0}")]
    Extraction(#[from] reqwest::Error),

    #[error("extraction API error {status}: {body}")]
    ExtractionApi { status: u16, body: String },

    #[error("extraction API returned an empty response")]
    EmptyResponse,

    #[error("model output is not valid invoice JSON: {reason}")]
    Normalize { reason: String, raw: String },

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv export error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    /// 归一化失败时附带的模型原始输出, 供人工诊断或手工录入
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            AppError::Normalize { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
