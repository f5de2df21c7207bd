use crate::config::FolioConfig;
use crate::database::PostRepository;
use crate::domain::post::sort_posts;
use crate::domain::{Post, PostQuery, StorageFile};
use crate::io::mirror::{content_hash, PostMirror};
use crate::io::ContentStore;
use crate::pagination::paginate;
use crate::parser::markdown::parse_post;
use crate::services::sync::report::{ReconcileReport, SyncError, SyncFailure};
use crate::services::RevalidationNotifier;
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a pass has to do, decided from the listing and the known records alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Files that are new or newer than their record, paired with their slug.
    pub to_fetch: Vec<(String, StorageFile)>,
    /// Known records whose file is gone from the bucket.
    pub to_remove: Vec<Post>,
}

/// Compares a bucket listing against the known records.
///
/// Only `.md` files count. A file needs fetching when no record has its slug or when the file was
/// updated strictly after the record. A record is stale when no listed file backs it.
pub fn plan_reconcile(files: &[StorageFile], known: &[Post]) -> SyncPlan {
    let mut live_slugs = HashSet::new();
    let mut to_fetch = Vec::new();

    for file in files {
        let slug = match file.slug() {
            Some(slug) => slug,
            None => continue,
        };
        live_slugs.insert(slug);

        let needs_fetch = match known.iter().find(|p| p.slug == slug) {
            None => true,
            Some(record) => file.updated_at > record.updated_at,
        };
        if needs_fetch {
            to_fetch.push((slug.to_string(), file.clone()));
        }
    }

    let to_remove = known
        .iter()
        .filter(|p| !live_slugs.contains(p.slug.as_str()))
        .cloned()
        .collect();

    SyncPlan {
        to_fetch,
        to_remove,
    }
}

pub struct SyncService {
    store: Box<dyn ContentStore>,
    repo: Box<dyn PostRepository>,
    notifier: Box<dyn RevalidationNotifier>,
    mirror: PostMirror,
    config: Arc<FolioConfig>,
    // passes are not safe to interleave, so admin-triggered refreshes queue up here
    pass_lock: Mutex<()>,
}

impl SyncService {
    pub fn new(
        store: Box<dyn ContentStore>,
        repo: Box<dyn PostRepository>,
        notifier: Box<dyn RevalidationNotifier>,
        mirror: PostMirror,
        config: Arc<FolioConfig>,
    ) -> Self {
        Self {
            store,
            repo,
            notifier,
            mirror,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn mirror(&self) -> &PostMirror {
        &self.mirror
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.config.request_timeout, fut)
            .await
            .map_err(|_| {
                anyhow!(
                    "{} timed out after {}s",
                    what,
                    self.config.request_timeout.as_secs()
                )
            })?
    }

    /// Runs one full pass: list the bucket, load the known records and converge the two.
    ///
    /// Only a failure to list or to load escapes; everything per post ends up in the report.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let _pass = self.pass_lock.lock().await;

        let files = self
            .bounded("Listing the posts bucket", self.store.list())
            .await
            .context("Failed to list posts bucket")?;

        let known = self
            .repo
            .find_many(&PostQuery::default())
            .await
            .context("Failed to load known posts")?;

        info!(
            files = files.len(),
            known = known.len(),
            "starting reconciliation pass"
        );

        Ok(self.reconcile_with(files, known).await)
    }

    pub async fn reconcile_with(&self, files: Vec<StorageFile>, known: Vec<Post>) -> ReconcileReport {
        let plan = plan_reconcile(&files, &known);
        let mut merged = known;
        let mut upserted = Vec::new();
        let mut errors = Vec::new();

        // 1. fetch and parse everything that is new or changed
        for (slug, file) in plan.to_fetch {
            let existing = merged.iter().position(|p| p.slug == slug);
            let existing_id = existing.map(|idx| merged[idx].id);

            match self.fetch_post(&slug, &file, existing_id).await {
                Ok(post) => {
                    info!(slug = %slug, "upserting");
                    match existing {
                        Some(idx) => merged[idx] = post,
                        None => merged.push(post),
                    }
                    upserted.push(slug);
                }
                Err(e) => {
                    warn!(slug = %slug, error = %e, "skipping post this pass");
                    errors.push(SyncFailure::new(slug, &e));
                }
            }
        }

        // 2. drop records whose file is gone
        let stale: HashSet<Uuid> = plan.to_remove.iter().map(|p| p.id).collect();
        merged.retain(|p| !stale.contains(&p.id));
        for post in &plan.to_remove {
            info!(slug = %post.slug, "removing");
        }
        let removed: Vec<String> = plan.to_remove.iter().map(|p| p.slug.clone()).collect();

        sort_posts(&mut merged);

        // 3. write-through mirror
        if let Err(e) = self.mirror.write(&merged).await {
            warn!(error = %e, "failed to write post mirror");
        }

        // 4. persist
        if upserted.is_empty() && removed.is_empty() {
            debug!("no changes found");
        } else {
            for slug in &upserted {
                let post = match merged.iter().find(|p| &p.slug == slug) {
                    Some(post) => post,
                    None => continue,
                };
                if let Err(e) = self.repo.upsert(post).await {
                    let err = SyncError::Persist {
                        slug: slug.clone(),
                        message: format!("{:#}", e),
                    };
                    warn!(slug = %slug, error = %err, "upsert failed");
                    errors.push(SyncFailure::new(slug.clone(), &err));
                }
            }

            for post in &plan.to_remove {
                if let Err(e) = self.repo.delete(post.id).await {
                    let err = SyncError::Persist {
                        slug: post.slug.clone(),
                        message: format!("{:#}", e),
                    };
                    warn!(slug = %post.slug, error = %err, "delete failed");
                    errors.push(SyncFailure::new(post.slug.clone(), &err));
                }
            }
        }

        if let Err(e) = self.mirror.prune_bodies(&removed).await {
            warn!(error = %e, "failed to prune cached bodies");
        }

        let report = ReconcileReport {
            upserted,
            removed,
            posts: merged,
            errors,
        };

        let stale_paths = report.stale_paths();
        if !stale_paths.is_empty() {
            if let Err(e) = self.notifier.notify(&stale_paths).await {
                warn!(error = %e, "revalidation failed");
            }
        }

        info!(
            upserted = report.upserted.len(),
            removed = report.removed.len(),
            errors = report.errors.len(),
            "reconciliation pass finished"
        );

        report
    }

    // downloads one post file and builds its record; `id` is kept when the slug was known
    async fn fetch_post(
        &self,
        slug: &str,
        file: &StorageFile,
        id: Option<Uuid>,
    ) -> Result<Post, SyncError> {
        let raw = match tokio::time::timeout(self.config.request_timeout, self.store.fetch(&file.name))
            .await
        {
            Err(_) => {
                return Err(SyncError::Timeout {
                    name: file.name.clone(),
                    seconds: self.config.request_timeout.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(SyncError::Fetch {
                    name: file.name.clone(),
                    message: format!("{:#}", e),
                })
            }
            Ok(Ok(raw)) => raw,
        };

        let (meta, _body) = parse_post(&raw, &file.name)?;

        if let Err(e) = self.mirror.write_body(slug, &raw).await {
            debug!(slug = %slug, error = %e, "could not cache post body");
        }

        Ok(Post {
            id: id.unwrap_or_else(Uuid::new_v4),
            name: file.name.clone(),
            slug: slug.to_string(),
            title: meta.title,
            description: meta.description,
            date: meta.date,
            updated: meta.updated,
            link: meta.link,
            image: meta.image,
            tags: meta.tags,
            full: meta.full,
            content_hash: content_hash(&raw),
            created_at: file.created_at,
            updated_at: file.updated_at,
        })
    }

    /// Lists posts for the public index.
    ///
    /// Plain listings come from the mirror (falling back to the database before the first pass);
    /// searches always go to the database. Returns the page and the total number of matches.
    pub async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let per_page = query.per_page.unwrap_or(self.config.posts_per_page).max(1);
        let page = query.page.unwrap_or(1).max(1);

        if query.search().is_none() {
            let all = match self.mirror.read().await {
                Ok(Some(posts)) => posts,
                Ok(None) => self.repo.find_many(&PostQuery::default()).await?,
                Err(e) => {
                    warn!(error = %e, "post mirror unreadable, using database");
                    self.repo.find_many(&PostQuery::default()).await?
                }
            };
            let total = all.len() as u64;
            return Ok((paginate(&all, page, per_page), total));
        }

        let paged = PostQuery {
            query: query.query.clone(),
            page: Some(page),
            per_page: Some(per_page),
        };
        let posts = self.repo.find_many(&paged).await?;
        let total = self.repo.count(&paged).await?;
        Ok((posts, total))
    }

    pub async fn find_post(&self, slug: &str) -> Result<Option<Post>> {
        if let Ok(Some(posts)) = self.mirror.read().await {
            if let Some(post) = posts.into_iter().find(|p| p.slug == slug) {
                return Ok(Some(post));
            }
        }
        self.repo.find_by_slug(slug).await
    }

    /// Returns the markdown body of `post`, from the local cache when it matches the record.
    pub async fn load_body(&self, post: &Post) -> Result<String> {
        match self.mirror.read_body(post).await {
            Ok(Some(raw)) => return Ok(raw),
            Ok(None) => {}
            Err(e) => debug!(slug = %post.slug, error = %e, "cached body unreadable"),
        }

        debug!(slug = %post.slug, "fetching post body");
        let raw = self
            .bounded(&format!("Fetching {}", post.name), self.store.fetch(&post.name))
            .await?;

        if let Err(e) = self.mirror.write_body(&post.slug, &raw).await {
            warn!(slug = %post.slug, error = %e, "could not cache post body");
        }
        Ok(raw)
    }
}
