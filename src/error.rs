use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeepSurvError>;

#[derive(Error, Debug)]
pub enum DeepSurvError {
    #[error("dimensions don't match: {message}")]
    InvalidDimensions { message: String },

    #[error("survival data is broken: {message}")]
    InvalidSurvivalData { message: String },

    #[error("data must be sorted by descending time - call sort_by_descending_time() first")]
    UnsortedData,

    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("numerical issues: {message}")]
    NumericalError { message: String },

    #[error("data directory {path} does not exist")]
    MissingDataDir { path: String },

    #[error("checkpoint failed: {message}")]
    Checkpoint { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeepSurvError {
    pub fn invalid_dimensions(message: impl Into<String>) -> Self {
        Self::InvalidDimensions { message: message.into() }
    }

    pub fn invalid_survival_data(message: impl Into<String>) -> Self {
        Self::InvalidSurvivalData { message: message.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn numerical_error(message: impl Into<String>) -> Self {
        Self::NumericalError { message: message.into() }
    }

    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint { message: message.into() }
    }
}
