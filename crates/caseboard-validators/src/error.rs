use thiserror::Error;

/// Validator errors
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("validator {code} failed: {reason}")]
    Failed { code: String, reason: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl ValidatorError {
    pub fn failed(code: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidatorError::Failed {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

pub type ValidatorResult<T> = Result<T, ValidatorError>;
