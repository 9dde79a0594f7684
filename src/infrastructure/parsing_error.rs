//! Extraction error types
//!
//! Typed failures of per-record field extraction and selector compilation.
//! Only a missing required field rejects a record; optional fields degrade
//! to defaults and never surface here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Required field '{field}' not found (tried: {})", .attempted_strategies.join(", "))]
    RequiredFieldMissing {
        field: String,
        attempted_strategies: Vec<String>,
    },

    #[error("Invalid CSS selector for {role}: {selector} - {reason}")]
    InvalidSelector {
        role: String,
        selector: String,
        reason: String,
    },

    #[error("No usable selector for {role} (rejected: {})", .rejected.join(", "))]
    NoUsableSelector { role: String, rejected: Vec<String> },
}

impl ExtractionError {
    /// Create a required field missing error with the strategies that were tried
    pub fn required_field_missing(field: &str, attempted_strategies: &[&str]) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            attempted_strategies: attempted_strategies.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Create an invalid selector error
    pub fn invalid_selector(role: &str, selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            role: role.to_string(),
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the crawl can simply skip past this error
    pub const fn is_record_level(&self) -> bool {
        matches!(self, Self::RequiredFieldMissing { .. })
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field_message_lists_strategies() {
        let err = ExtractionError::required_field_missing("text", &["tweet_text"]);
        assert_eq!(err.to_string(), "Required field 'text' not found (tried: tweet_text)");
        assert!(err.is_record_level());
    }

    #[test]
    fn test_selector_errors_are_not_record_level() {
        let err = ExtractionError::invalid_selector("like_button", "[[", "unexpected token");
        assert!(!err.is_record_level());
        assert!(err.to_string().contains("like_button"));
    }
}
