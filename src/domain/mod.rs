pub mod post;

pub use post::{Post, PostQuery, StorageFile};
