use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryParseError>;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// The single error raised by every stage of the query pipeline.
///
/// `position` is the character index of the offending input when the stage
/// that failed still knows it.
#[derive(Debug, Error)]
pub struct QueryParseError {
    pub message: String,
    pub position: Option<usize>,
    #[source]
    pub cause: Option<Cause>,
}

impl QueryParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            cause: None,
        }
    }

    pub fn at(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
            cause: None,
        }
    }

    pub fn with_position(mut self, position: Option<usize>) -> Self {
        self.position = position;
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for QueryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} (at position {})", self.message, pos),
            None => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_position() {
        let err = QueryParseError::at("Unexpected character '#'", 4);
        assert_eq!(err.to_string(), "Unexpected character '#' (at position 4)");
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        let cause = "x".parse::<i32>().unwrap_err();
        let err = QueryParseError::new("Cannot convert").with_cause(cause);
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Cannot convert");
    }
}
