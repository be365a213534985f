use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormFillError {
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("Extraction failed for form '{form}': {details}")]
    ExtractionFailed { form: String, details: String },

    #[error("LLM response is not valid JSON: {details}")]
    MalformedResponse { details: String },

    #[error("Required top-level key '{key}' missing from extracted JSON")]
    MissingSection { key: String },

    #[error("Unknown sheet '{0}' in workbook")]
    UnknownSheet(String),

    #[error("Invalid cell coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormFillError>;
