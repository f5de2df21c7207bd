use crate::database::sqlite::SqliteRepository;
use crate::database::PostRepository;
use crate::domain::{Post, PostQuery};
use crate::tests::integration_posts_sync_service::ts;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

// create a sqlite database in memory to test against
async fn setup_test_db() -> SqliteRepository {
    // a single connection, otherwise each one would get its own empty in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    // run migrations to create the posts schema
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    SqliteRepository::new(pool)
}

fn create_mock_post(slug: &str, date: &str, tags: &[&str]) -> Post {
    Post {
        id: Uuid::new_v4(),
        name: format!("{}.md", slug),
        slug: slug.to_string(),
        title: format!("Post about {}", slug),
        description: "Test".to_string(),
        date: ts(date),
        updated: None,
        link: None,
        image: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        full: false,
        content_hash: "hash".to_string(),
        created_at: ts("2023-01-01T12:00:00Z"),
        updated_at: ts("2023-01-01T12:00:00Z"),
    }
}

fn search(q: &str) -> PostQuery {
    PostQuery {
        query: Some(q.to_string()),
        ..Default::default()
    }
}

// test the database's ability to save and retrieve posts
#[tokio::test]
async fn test_sqlite_save_and_retrieve() {
    let repo = setup_test_db().await;

    let post = create_mock_post("slug-1", "2023-01-01T12:00:00Z", &["rust"]);
    repo.upsert(&post).await.expect("Should save post");

    let retrieved = repo
        .find_by_slug("slug-1")
        .await
        .expect("Should query")
        .expect("Should find post");

    // the whole record survives the trip through the table
    assert_eq!(retrieved, post);
    assert!(repo.find_by_slug("missing").await.unwrap().is_none());
}

// upserts match on id, so a changed file replaces its row instead of adding one
#[tokio::test]
async fn test_sqlite_upsert_logic() {
    let repo = setup_test_db().await;

    let mut post = create_mock_post("slug-1", "2023-01-01T12:00:00Z", &["rust"]);
    repo.upsert(&post).await.unwrap();

    post.title = "Updated".to_string();
    post.tags = vec!["go".to_string(), "web".to_string()];
    post.updated_at = ts("2023-02-01T12:00:00Z");
    repo.upsert(&post).await.unwrap();

    let all = repo.find_many(&PostQuery::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Updated");
    assert_eq!(all[0].tags, vec!["go", "web"]);
    assert_eq!(all[0].updated_at, ts("2023-02-01T12:00:00Z"));
}

#[tokio::test]
async fn test_sqlite_orders_newest_first() {
    let repo = setup_test_db().await;

    for (slug, date) in [
        ("old", "2021-01-01T00:00:00Z"),
        ("new", "2023-06-01T00:00:00Z"),
        ("mid-b", "2022-01-01T00:00:00Z"),
        ("mid-a", "2022-01-01T00:00:00Z"),
    ] {
        repo.upsert(&create_mock_post(slug, date, &[])).await.unwrap();
    }

    let slugs: Vec<String> = repo
        .find_many(&PostQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.slug)
        .collect();
    assert_eq!(slugs, vec!["new", "mid-a", "mid-b", "old"]);
}

#[tokio::test]
async fn test_sqlite_search_and_count() {
    let repo = setup_test_db().await;

    repo.upsert(&create_mock_post("axum-routing", "2023-01-01T00:00:00Z", &["Rust"]))
        .await
        .unwrap();
    repo.upsert(&create_mock_post("svelte-stores", "2023-02-01T00:00:00Z", &["web"]))
        .await
        .unwrap();
    repo.upsert(&create_mock_post("100_percent", "2023-03-01T00:00:00Z", &[]))
        .await
        .unwrap();

    // title substring, case-insensitive
    let found = repo.find_many(&search("AXUM")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].slug, "axum-routing");

    // whole tag match
    let found = repo.find_many(&search("rust")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(repo.count(&search("rust")).await.unwrap(), 1);

    // LIKE wildcards in the term are literal
    assert_eq!(repo.count(&search("100_")).await.unwrap(), 1);
    assert_eq!(repo.count(&search("%")).await.unwrap(), 0);

    assert_eq!(repo.count(&PostQuery::default()).await.unwrap(), 3);
    assert_eq!(repo.count(&search("  ")).await.unwrap(), 3);
}

#[tokio::test]
async fn test_sqlite_paging() {
    let repo = setup_test_db().await;

    for day in 1..=5 {
        let post = create_mock_post(
            &format!("post-{}", day),
            &format!("2023-01-0{}T00:00:00Z", day),
            &[],
        );
        repo.upsert(&post).await.unwrap();
    }

    let page = |page: u32| PostQuery {
        query: None,
        page: Some(page),
        per_page: Some(2),
    };

    let first: Vec<String> = repo
        .find_many(&page(1))
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.slug)
        .collect();
    assert_eq!(first, vec!["post-5", "post-4"]);

    let last = repo.find_many(&page(3)).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].slug, "post-1");

    assert!(repo.find_many(&page(4)).await.unwrap().is_empty());
    // paging doesn't change the total
    assert_eq!(repo.count(&page(2)).await.unwrap(), 5);
}

#[tokio::test]
async fn test_sqlite_delete() {
    let repo = setup_test_db().await;

    let post = create_mock_post("slug-1", "2023-01-01T12:00:00Z", &[]);
    repo.upsert(&post).await.unwrap();

    repo.delete(post.id).await.expect("Should delete post");
    assert!(repo.find_by_slug("slug-1").await.unwrap().is_none());

    // deleting what isn't there is reported, not ignored
    assert!(repo.delete(post.id).await.is_err());
}
