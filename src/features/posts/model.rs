use crate::domain::Post;
use crate::pagination::PageMarker;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub pager: Vec<PageMarker>,
}

#[derive(Serialize, Debug)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub html_content: String,
}
