use thiserror::Error;

#[derive(Error, Debug)]
pub enum SplitterError {
    #[error("CSV must have a '{0}' column.")]
    MissingColumn(String),

    #[error("Validation error on record {record}: {details}")]
    ValidationError { record: usize, details: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Balance violation for {category} between buckets '{first}' ({first_count}) and '{second}' ({second_count})")]
    BalanceViolation {
        category: String,
        first: String,
        first_count: usize,
        second: String,
        second_count: usize,
    },

    #[error("Tally mismatch: {0}")]
    TallyMismatch(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SplitterError>;
