//! Shared error types.

/// A job input failed its shape, type, or existence checks.
///
/// Validation failures are local and recoverable: the job's `execute`
/// boundary converts them into a failed `JobResult` instead of letting them
/// reach the runner as a fault.
#[derive(Debug, Clone, thiserror::Error)]
#[error("validation error for '{field}': {message}")]
pub struct ValidationError {
    /// The input field (or logical parameter) that failed validation.
    pub field: String,
    /// What constraint was violated.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_field_and_message() {
        let err = ValidationError::new("file_path", "file does not exist: missing.txt");
        assert_eq!(
            err.to_string(),
            "validation error for 'file_path': file does not exist: missing.txt"
        );
    }
}
