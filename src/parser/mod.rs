pub mod markdown;
pub mod model;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterError {
    #[error("Failed to parse frontmatter in {filename}: {message}")]
    Malformed { filename: String, message: String },

    #[error("Invalid frontmatter in {filename}: {}", issues.join("; "))]
    Invalid {
        filename: String,
        issues: Vec<String>,
    },
}
