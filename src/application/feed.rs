//! Post listing service behind the home page, the dashboard and the
//! category filter.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::pagination::{PageRequest, PaginationError, PostCursor};
use crate::application::repos::{CategoriesRepo, PostQueryFilter, PostsRepo, RepoError};
use crate::domain::entities::{CategoryRecord, PostRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// One page of posts plus the cursor that continues the listing.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostRecord>,
    pub next_cursor: Option<String>,
    pub total: u64,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    categories: Arc<dyn CategoriesRepo>,
}

impl FeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, categories: Arc<dyn CategoriesRepo>) -> Self {
        Self { posts, categories }
    }

    /// All posts, newest publish date first.
    pub async fn page(&self, limit: u32, cursor: Option<&str>) -> Result<FeedPage, FeedError> {
        self.filtered_page(PostQueryFilter::default(), limit, cursor)
            .await
    }

    /// Posts belonging to one category; `Ok(None)` when the category id
    /// does not exist.
    pub async fn category_page(
        &self,
        category_id: Uuid,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Option<(CategoryRecord, FeedPage)>, FeedError> {
        let Some(category) = self.categories.find_by_id(category_id).await? else {
            return Ok(None);
        };

        let filter = PostQueryFilter {
            category: Some(category.id),
        };
        let page = self.filtered_page(filter, limit, cursor).await?;
        Ok(Some((category, page)))
    }

    async fn filtered_page(
        &self,
        filter: PostQueryFilter,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let cursor = cursor
            .map(PostCursor::decode)
            .transpose()
            .map_err(|PaginationError::InvalidCursor(detail)| FeedError::InvalidCursor(detail))?;

        let page = self
            .posts
            .list_posts(&filter, PageRequest::new(limit, cursor))
            .await?;
        let total = self.posts.count_posts(&filter).await?;

        Ok(FeedPage {
            posts: page.items,
            next_cursor: page.next_cursor,
            total,
        })
    }
}
