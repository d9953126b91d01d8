//! Input validation for command-line parameters.

use std::path::Path;

use crate::errors::{MatefixError, Result};

/// Validate that a file exists.
///
/// # Errors
///
/// Returns [`MatefixError::InvalidFileFormat`] if `path` does not exist.
///
/// ```
/// use matefix_lib::validation::validate_file_exists;
///
/// assert!(validate_file_exists("/nonexistent/file.bam", "Input BAM").is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MatefixError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}
