#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not initialized: {0}")]
    NotInitialized(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn missing_field(path: &str) -> Self {
        AppError::Validation(format!("required field '{path}' is missing"))
    }

    pub fn invalid_field(path: &str, reason: &str) -> Self {
        AppError::Validation(format!("field '{path}' is invalid: {reason}"))
    }
}
