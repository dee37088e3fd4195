use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (empty name, bad rate, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Missing required column in an input table.
    #[error("table '{table}': missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Malformed CSV input.
    #[error("table '{table}': {message}")]
    Csv { table: String, message: String },

    /// Malformed JSON input.
    #[error("table '{table}': invalid JSON: {message}")]
    Json { table: String, message: String },

    /// Order quantity that is present but not numeric.
    #[error("table '{table}', row {row}: cannot parse quantity '{value}'")]
    QuantityParse { table: String, row: usize, value: String },

    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IdentityError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
