//! Post detail and the authenticated create/update/delete flows.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::auth::AuthenticatedUser;
use crate::application::repos::{
    CategoriesRepo, CommentsRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams,
};
use crate::application::validation::{FieldErrors, require_text};
use crate::domain::entities::{CategoryRecord, CommentRecord, PostRecord};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 100_000;

#[derive(Debug, Error)]
pub enum PostError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum PostWriteError {
    #[error("post form validation failed")]
    Validation(FieldErrors),
    #[error("post not found")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A post together with its comments, as shown on the detail page.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
}

/// Fields accepted by the create and edit forms.
#[derive(Debug, Clone)]
pub struct PostFormCommand {
    pub title: String,
    pub category_id: Option<Uuid>,
    pub content: String,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    categories: Arc<dyn CategoriesRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        categories: Arc<dyn CategoriesRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            comments,
            categories,
        }
    }

    /// Fetch a post for display, bumping its view counter exactly once.
    /// The increment runs as a single statement in the store, so concurrent
    /// readers cannot lose updates.
    pub async fn detail(&self, id: Uuid) -> Result<Option<PostDetail>, PostError> {
        let Some(mut post) = self.posts.find_by_id(id).await? else {
            return Ok(None);
        };

        post.view_count = self.posts_write.increment_view_count(id).await?;
        let comments = self.comments.list_for_post(id).await?;

        metrics::counter!("foglio_post_view_total").increment(1);

        Ok(Some(PostDetail { post, comments }))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<PostRecord>, PostError> {
        Ok(self.posts.find_by_id(id).await?)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryRecord>, PostError> {
        Ok(self.categories.list_all().await?)
    }

    pub async fn create(
        &self,
        command: PostFormCommand,
        author: &AuthenticatedUser,
    ) -> Result<PostRecord, PostWriteError> {
        let category_id = self.validate(&command).await?;

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                title: command.title.trim().to_string(),
                content: command.content.trim().to_string(),
                category_id,
                author_id: author.id,
            })
            .await?;

        Ok(post)
    }

    pub async fn update(
        &self,
        id: Uuid,
        command: PostFormCommand,
    ) -> Result<PostRecord, PostWriteError> {
        if self.posts.find_by_id(id).await?.is_none() {
            return Err(PostWriteError::UnknownPost);
        }

        let category_id = self.validate(&command).await?;

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id,
                title: command.title.trim().to_string(),
                content: command.content.trim().to_string(),
                category_id,
            })
            .await?;

        Ok(post)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), PostWriteError> {
        match self.posts_write.delete_post(id).await {
            Ok(()) => Ok(()),
            Err(RepoError::NotFound) => Err(PostWriteError::UnknownPost),
            Err(err) => Err(err.into()),
        }
    }

    /// Field checks shared by create and update; resolves the category
    /// selection against the store.
    async fn validate(&self, command: &PostFormCommand) -> Result<Uuid, PostWriteError> {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "title", &command.title, MAX_TITLE_LEN);
        require_text(&mut errors, "content", &command.content, MAX_CONTENT_LEN);

        let category_id = match command.category_id {
            Some(id) => match self.categories.find_by_id(id).await? {
                Some(category) => Some(category.id),
                None => {
                    errors.push("category", "Select a valid choice.");
                    None
                }
            },
            None => {
                errors.push("category", "This field is required.");
                None
            }
        };

        match category_id {
            Some(id) if errors.is_empty() => Ok(id),
            _ => Err(PostWriteError::Validation(errors)),
        }
    }
}
