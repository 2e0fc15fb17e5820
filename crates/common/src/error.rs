use thiserror::Error;

/// Startup failure while reading or validating the run configuration.
#[derive(Error, Debug)]
pub enum Error {
    /// A value parsed but is out of range or inconsistent
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_the_key() {
        let err = Error::Config("flush_attempts must be at least 2, got: 1".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: flush_attempts must be at least 2, got: 1"
        );
    }

    #[test]
    fn missing_file_keeps_io_kind() {
        let err: Error = std::fs::read_to_string("/nonexistent/batch-classifier.toml")
            .unwrap_err()
            .into();
        match &err {
            Error::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io, got {other:?}"),
        }
        assert!(err.to_string().starts_with("reading configuration"));
    }

    #[test]
    fn toml_syntax_error_converts_with_question_mark() {
        fn parse(raw: &str) -> Result<toml::Value> {
            Ok(toml::from_str(raw)?)
        }
        let err = parse("[engine\nworkers = 8").unwrap_err();
        assert!(matches!(err, Error::Toml(_)), "got: {err:?}");
    }
}
