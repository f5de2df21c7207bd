use crate::domain::Post;
use crate::io::mirror::{content_hash, PostMirror, MIRROR_FILENAME};
use crate::tests::integration_posts_sync_service::ts;
use tempfile::tempdir;
use uuid::Uuid;

fn mirrored_post(slug: &str, raw: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        name: format!("{}.md", slug),
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        description: "mirrored".to_string(),
        date: ts("2024-02-02T00:00:00Z"),
        updated: Some(ts("2024-02-03T08:00:00Z")),
        link: Some("https://example.com".to_string()),
        image: None,
        tags: vec!["a".to_string()],
        full: true,
        content_hash: content_hash(raw),
        created_at: ts("2024-02-02T00:00:00Z"),
        updated_at: ts("2024-02-02T00:00:00Z"),
    }
}

#[tokio::test]
async fn test_read_before_first_write() {
    let dir = tempdir().unwrap();
    let mirror = PostMirror::new(dir.path());

    assert!(mirror.read().await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_then_read() {
    let dir = tempdir().unwrap();
    let mirror = PostMirror::new(dir.path());
    let posts = vec![mirrored_post("one", "# one"), mirrored_post("two", "# two")];

    mirror.write(&posts).await.unwrap();
    assert!(dir.path().join(MIRROR_FILENAME).exists());
    assert_eq!(mirror.read().await.unwrap(), Some(posts));

    // a later write replaces the whole set
    mirror.write(&[]).await.unwrap();
    assert_eq!(mirror.read().await.unwrap(), Some(Vec::new()));
}

// the old set stays readable until the new one replaces it in a single step
#[tokio::test]
async fn test_write_replaces_mirror_without_leftovers() {
    let dir = tempdir().unwrap();
    let mirror = PostMirror::new(dir.path());

    mirror.write(&[mirrored_post("one", "# one")]).await.unwrap();
    let replacement = vec![mirrored_post("two", "# two")];
    mirror.write(&replacement).await.unwrap();

    assert_eq!(mirror.read().await.unwrap(), Some(replacement));
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec![MIRROR_FILENAME.to_string()]);
}

#[tokio::test]
async fn test_corrupt_mirror_is_an_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(MIRROR_FILENAME), "{not json").unwrap();

    let mirror = PostMirror::new(dir.path());
    assert!(mirror.read().await.is_err());
}

// a cached body only counts when it hashes to what the record expects
#[tokio::test]
async fn test_body_cache_checks_hash() {
    let dir = tempdir().unwrap();
    let mirror = PostMirror::new(dir.path());
    let post = mirrored_post("one", "# current");

    assert_eq!(mirror.read_body(&post).await.unwrap(), None);

    mirror.write_body("one", "# stale").await.unwrap();
    assert_eq!(mirror.read_body(&post).await.unwrap(), None);

    mirror.write_body("one", "# current").await.unwrap();
    assert_eq!(
        mirror.read_body(&post).await.unwrap().as_deref(),
        Some("# current")
    );
}

#[tokio::test]
async fn test_prune_bodies() {
    let dir = tempdir().unwrap();
    let mirror = PostMirror::new(dir.path());

    mirror.write_body("keep", "k").await.unwrap();
    mirror.write_body("drop", "d").await.unwrap();

    // missing bodies are not an error
    mirror
        .prune_bodies(&["drop".to_string(), "never-cached".to_string()])
        .await
        .unwrap();

    assert!(dir.path().join("keep.md").exists());
    assert!(!dir.path().join("drop.md").exists());
}

#[test]
fn test_content_hash_is_stable() {
    assert_eq!(content_hash("abc"), content_hash("abc"));
    assert_ne!(content_hash("abc"), content_hash("abd"));
    assert_eq!(content_hash("abc").len(), 16);
}
