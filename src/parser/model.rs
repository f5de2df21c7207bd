use chrono::{DateTime, Utc};
use serde::Deserialize;

// every key a post may declare; anything else in the YAML block is ignored
#[derive(Deserialize, Debug, Default, Clone)]
pub struct PostFrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub full: Option<bool>,
}

/// Front-matter that passed validation, with dates resolved and defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub tags: Vec<String>,
    pub full: bool,
}
