use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Command `{program}` failed: {stderr}")]
    Command { program: String, stderr: String },

    #[error("git error: {0}")]
    Git(String),

    #[error("Unsupported action: {0}")]
    Mutation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SiftError>;
