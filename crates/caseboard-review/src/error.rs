use thiserror::Error;

/// Failure of a single board invocation.
///
/// Never crosses the invocation adapter: a failing board is omitted from
/// the result set.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("board {board} failed: {reason}")]
    Failed { board: String, reason: String },
}

impl BoardError {
    pub fn failed(board: impl Into<String>, reason: impl Into<String>) -> Self {
        BoardError::Failed {
            board: board.into(),
            reason: reason.into(),
        }
    }
}

/// Pipeline faults that prevent a protocol card from being produced.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("invalid case: {0}")]
    InvalidCase(String),
}

pub type ReviewResult<T> = Result<T, ReviewError>;
