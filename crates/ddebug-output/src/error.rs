//! Error handling utilities for output adapters
//!
//! Provides extension traits for ergonomic error conversion to output errors.

use ddebug_core::Error;

/// Extension trait for converting Results to Output errors with context
///
/// # Example
/// ```ignore
/// let file = File::create(&path).output_context("Failed to create log file")?;
/// ```
pub trait ToOutputResult<T> {
    /// Convert a Result to an output error with context message
    fn output_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> ToOutputResult<T> for Result<T, E> {
    fn output_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| Error::Output(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_context_ok() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(result.output_context("unused").unwrap(), 42);
    }

    #[test]
    fn test_output_context_err() {
        let result: Result<i32, &str> = Err("disk full");
        match result.output_context("Failed to write log").unwrap_err() {
            Error::Output(msg) => assert_eq!(msg, "Failed to write log: disk full"),
            other => panic!("Expected Output error, got {:?}", other),
        }
    }
}
