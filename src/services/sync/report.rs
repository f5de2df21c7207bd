use crate::domain::Post;
use crate::parser::FrontMatterError;
use serde::Serialize;
use thiserror::Error;

/// Why a single post could not be brought in line during a pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to fetch {name}: {message}")]
    Fetch { name: String, message: String },

    #[error("Fetching {name} timed out after {seconds}s")]
    Timeout { name: String, seconds: u64 },

    #[error(transparent)]
    Validation(#[from] FrontMatterError),

    #[error("Failed to persist {slug}: {message}")]
    Persist { slug: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub slug: String,
    pub error: String,
}

impl SyncFailure {
    pub fn new(slug: impl Into<String>, error: &SyncError) -> Self {
        Self {
            slug: slug.into(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub upserted: Vec<String>,
    pub removed: Vec<String>,
    pub posts: Vec<Post>,
    pub errors: Vec<SyncFailure>,
}

impl ReconcileReport {
    pub fn changes(&self) -> usize {
        self.upserted.len() + self.removed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    // the frontend paths made stale by this pass
    pub fn stale_paths(&self) -> Vec<String> {
        if self.changes() == 0 {
            return Vec::new();
        }
        let mut paths = vec!["/blog".to_string()];
        paths.extend(
            self.upserted
                .iter()
                .chain(self.removed.iter())
                .map(|slug| format!("/blog/{}", slug)),
        );
        paths
    }
}
