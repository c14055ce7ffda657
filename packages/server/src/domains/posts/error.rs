use thiserror::Error;

use crate::common::OptionId;

/// Coarse classification of a [`PostError`] for callers that map errors to
/// client responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostErrorKind {
    Validation,
    Ownership,
    Infrastructure,
}

/// Errors returned by post operations
#[derive(Debug, Error)]
pub enum PostError {
    #[error("opens at time has already passed")]
    OpensAtAlreadyPassed,

    #[error("closes at time must be after opens at time")]
    ClosesAtNotAfterOpensAt,

    #[error("exceeded the maximum amount of options ({max})")]
    TooManyOptions { max: usize },

    #[error("at least {min} options are required to publish a post")]
    TooFewOptions { min: usize },

    #[error("must set close time when publishing a post")]
    ClosesAtNotSet,

    #[error("option positions must be unique and run from 1 to the number of options")]
    OptionPositionsInvalid,

    #[error("post with id already authored by another user")]
    PostNotOwned,

    #[error("file of option {option_id} cannot be changed once created")]
    OptionFileImmutable { option_id: OptionId },

    #[error("file is required to create option {option_id}")]
    OptionFileRequired { option_id: OptionId },

    #[error("only PNG, JPEG and GIF images are supported")]
    UnsupportedFileType,

    #[error("file must not be larger than {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("uploaded file {key} was not found")]
    OptionFileNotFound { key: String },

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl PostError {
    pub fn kind(&self) -> PostErrorKind {
        match self {
            PostError::PostNotOwned => PostErrorKind::Ownership,
            PostError::Database(_) | PostError::Storage(_) | PostError::Internal(_) => {
                PostErrorKind::Infrastructure
            }
            _ => PostErrorKind::Validation,
        }
    }

    /// Message safe to show a client. Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            PostErrorKind::Infrastructure => "unexpected error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_are_masked() {
        let err = PostError::Storage(anyhow::anyhow!("bucket on fire"));
        assert_eq!(err.kind(), PostErrorKind::Infrastructure);
        assert_eq!(err.public_message(), "unexpected error occurred");

        let err = PostError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), PostErrorKind::Infrastructure);
        assert_eq!(err.public_message(), "unexpected error occurred");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = PostError::TooManyOptions { max: 6 };
        assert_eq!(err.kind(), PostErrorKind::Validation);
        assert_eq!(
            err.public_message(),
            "exceeded the maximum amount of options (6)"
        );

        assert_eq!(PostError::PostNotOwned.kind(), PostErrorKind::Ownership);
    }
}
