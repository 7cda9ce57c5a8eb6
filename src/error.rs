use thiserror::Error;

#[derive(Error, Debug)]
pub enum LesionVisionError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// 呼び出し側の入力不備（HTTPでは 400）
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Detector call failed ({category}): {message}")]
    DetectorCall { category: String, message: String },

    #[error("Malformed detector response ({category}): {message}")]
    DetectorResponse { category: String, message: String },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Failed to fetch image: {0}")]
    AssetFetch(String),

    #[error("PDF generation failed: {0}")]
    PdfGeneration(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(lesion_vision_common::Error),
}

impl From<lesion_vision_common::Error> for LesionVisionError {
    fn from(err: lesion_vision_common::Error) -> Self {
        use lesion_vision_common::Error as CommonError;
        match err {
            CommonError::InvalidRequest(message) | CommonError::IncompleteDraft(message) => {
                LesionVisionError::InvalidRequest(message)
            }
            other => LesionVisionError::Common(other),
        }
    }
}

impl LesionVisionError {
    /// 呼び出し側の入力が原因のエラーか
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LesionVisionError::InvalidRequest(_)
                | LesionVisionError::Common(lesion_vision_common::Error::RunInProgress)
        )
    }
}

pub type Result<T> = std::result::Result<T, LesionVisionError>;
