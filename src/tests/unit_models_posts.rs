use crate::database::model::DbPost;
use crate::domain::post::{slug_from_filename, sort_posts};
use crate::domain::{Post, PostQuery, StorageFile};
use crate::features::admin::{check_image_bytes, image_extension};
use crate::features::auth::access_token;
use crate::io::archive_destination;
use crate::services::sync::ReconcileReport;
use crate::tests::integration_posts_sync_service::ts;
use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

fn sample_post(slug: &str, date: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        name: format!("{}.md", slug),
        slug: slug.to_string(),
        title: format!("About {}", slug),
        description: "Notes on building things".to_string(),
        date: ts(date),
        updated: None,
        link: None,
        image: Some("https://images.test/a.png".to_string()),
        tags: vec!["rust".to_string(), "api".to_string()],
        full: false,
        content_hash: "00000000deadbeef".to_string(),
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: ts("2024-01-02T00:00:00Z"),
    }
}

#[test]
fn test_db_post_round_trip() {
    let post = sample_post("hello", "2024-01-01T00:00:00Z");
    let row = DbPost::from(&post);

    assert_eq!(row.id, post.id.to_string());
    assert_eq!(row.tags, r#"["rust","api"]"#);
    assert_eq!(row.to_string(), "hello");

    let back = Post::try_from(row).expect("row converts back");
    assert_eq!(back, post);
}

#[test]
fn test_db_post_rejects_corrupt_rows() {
    let mut row = DbPost::from(&sample_post("hello", "2024-01-01T00:00:00Z"));
    row.id = "not-a-uuid".to_string();
    assert!(Post::try_from(row.clone()).is_err());

    let mut row = DbPost::from(&sample_post("hello", "2024-01-01T00:00:00Z"));
    row.tags = "rust, api".to_string();
    assert!(Post::try_from(row).is_err());
}

#[test]
fn test_slug_from_filename() {
    assert_eq!(slug_from_filename("hello-world.md"), Some("hello-world"));
    assert_eq!(slug_from_filename("notes.txt"), None);
    assert_eq!(slug_from_filename(".md"), None);
    assert_eq!(slug_from_filename("archive/old.md"), None);

    let file = StorageFile {
        name: "a.md".into(),
        created_at: ts("2024-01-01T00:00:00Z"),
        updated_at: ts("2024-01-01T00:00:00Z"),
    };
    assert_eq!(file.slug(), Some("a"));
}

#[test]
fn test_post_query_matching() {
    let post = sample_post("hello", "2024-01-01T00:00:00Z");

    let query = |q: &str| PostQuery {
        query: Some(q.to_string()),
        ..Default::default()
    };

    assert!(PostQuery::default().matches(&post));
    assert!(query("   ").matches(&post));
    assert_eq!(query("   ").search(), None);
    assert!(query("ABOUT").matches(&post));
    assert!(query("building").matches(&post));
    assert!(query("Rust").matches(&post));
    // tags match whole, not by substring
    assert!(!query("ru").matches(&post));
    assert!(!query("python").matches(&post));
}

#[test]
fn test_sort_posts_newest_first() {
    let mut posts = vec![
        sample_post("b", "2024-01-01T00:00:00Z"),
        sample_post("c", "2024-03-01T00:00:00Z"),
        sample_post("a", "2024-01-01T00:00:00Z"),
    ];
    sort_posts(&mut posts);

    let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, vec!["c", "a", "b"]);
}

#[test]
fn test_archive_destination_numbering() {
    assert_eq!(archive_destination("post.md", 0), "archive/post.md");
    assert_eq!(archive_destination("post.md", 1), "archive/post (2).md");
    assert_eq!(archive_destination("post.md", 4), "archive/post (5).md");
    assert_eq!(archive_destination("cover.webp", 0), "archive/cover.webp");
    assert_eq!(archive_destination("README", 2), "archive/README (3)");
}

#[test]
fn test_report_stale_paths() {
    assert!(ReconcileReport::default().stale_paths().is_empty());

    let report = ReconcileReport {
        upserted: vec!["new".into()],
        removed: vec!["gone".into()],
        ..Default::default()
    };
    assert_eq!(report.changes(), 2);
    assert_eq!(report.stale_paths(), vec!["/blog", "/blog/new", "/blog/gone"]);
}

#[test]
fn test_access_token_sources() {
    let mut headers = HeaderMap::new();
    assert_eq!(access_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert_eq!(access_token(&headers).as_deref(), Some("abc"));

    // the cookie wins over the header
    headers.insert(
        header::COOKIE,
        HeaderValue::from_static("theme=dark; sb-access-token=xyz; other=1"),
    );
    assert_eq!(access_token(&headers).as_deref(), Some("xyz"));

    let mut empty = HeaderMap::new();
    empty.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(access_token(&empty), None);
}

#[test]
fn test_image_extension() {
    assert_eq!(image_extension("cover.PNG").as_deref(), Some("png"));
    assert_eq!(image_extension("photo.jpeg").as_deref(), Some("jpeg"));
    assert_eq!(image_extension("icon.svg").as_deref(), Some("svg"));
    assert_eq!(image_extension("notes.md"), None);
    assert_eq!(image_extension("archive/cover.png"), None);
    assert_eq!(image_extension("noextension"), None);
}

#[test]
fn test_check_image_bytes() {
    assert!(check_image_bytes("png", PNG_MAGIC).is_ok());
    assert!(check_image_bytes("jpg", JPEG_MAGIC).is_ok());
    assert!(check_image_bytes("jpeg", JPEG_MAGIC).is_ok());
    assert!(check_image_bytes("svg", br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#).is_ok());

    // name and content disagree
    assert!(check_image_bytes("png", JPEG_MAGIC).is_err());
    assert!(check_image_bytes("svg", PNG_MAGIC).is_err());
    assert!(check_image_bytes("webp", b"plain text").is_err());
}
