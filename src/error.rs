use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaterfallError {
    #[error("Invalid period key '{0}': expected YYYY-MM")]
    InvalidPeriodKey(String),

    #[error("Invalid month {0}: must be between 1 and 12")]
    InvalidMonth(u32),

    #[error("Unknown subhead '{subhead}' for head {head}")]
    UnknownSubhead { head: String, subhead: String },

    #[error("No rule with id '{0}'")]
    UnknownRuleId(String),

    #[error("Duplicate rule id '{0}'")]
    DuplicateRuleId(String),

    #[error("Invalid confidence {0}: must be between 0.0 and 1.0")]
    InvalidConfidence(f64),

    #[error("Range end {end} precedes start {start}")]
    InvertedRange { start: String, end: String },

    #[error("Periods in range are not consecutive: gap after {0}")]
    NonConsecutiveRange(String),

    #[error("Records span different periods: {0} and {1}")]
    MixedPeriods(String, String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WaterfallError>;
