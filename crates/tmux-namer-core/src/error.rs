use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamerError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("no user questions in conversation")]
    NoQuestions,

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Upstream(String),

    #[error("empty name after sanitization")]
    EmptyName,

    #[error("rename failed: {0}")]
    Rename(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NamerError {
    /// Short, stable label for the error kind, used in trace output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::NoQuestions => "no_questions",
            Self::Auth(_) => "auth",
            Self::Upstream(_) => "upstream",
            Self::EmptyName => "empty_name",
            Self::Rename(_) => "rename",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, NamerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = NamerError::MalformedInput("expected value at line 1 column 1".into());
        assert_eq!(
            err.to_string(),
            "malformed input: expected value at line 1 column 1"
        );
        assert_eq!(
            NamerError::EmptyName.to_string(),
            "empty name after sanitization"
        );
        assert_eq!(
            NamerError::Upstream("HTTP 500: Internal Server Error".into()).to_string(),
            "HTTP 500: Internal Server Error"
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(NamerError::NoQuestions.kind(), "no_questions");
        assert_eq!(NamerError::Auth("missing key".into()).kind(), "auth");
        assert_eq!(NamerError::Rename("no tmux".into()).kind(), "rename");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: NamerError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
