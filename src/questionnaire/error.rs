use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuestionnaireError {
    #[error("failed to read questionnaire file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed questionnaire '{key}': {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("questionnaire '{key}' has a non-numeric weight for option '{label}'")]
    InvalidWeight { key: String, label: String },

    #[error("questionnaire '{0}' is not loaded")]
    Unavailable(String),
}
