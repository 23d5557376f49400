//! Comment submission: validate the form, persist the comment against an
//! existing post, hand back the record for the ajax response.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::auth::AuthenticatedUser;
use crate::application::repos::{CommentsRepo, CreateCommentParams, PostsRepo, RepoError};
use crate::application::validation::{FieldErrors, require_text};
use crate::domain::entities::CommentRecord;

const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment form validation failed")]
    Validation(FieldErrors),
    #[error("post not found")]
    UnknownPost,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct CommentService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self { posts, comments }
    }

    pub async fn submit(
        &self,
        post_id: Uuid,
        author: &AuthenticatedUser,
        body: &str,
    ) -> Result<CommentRecord, CommentError> {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "body", body, MAX_COMMENT_LEN);
        if !errors.is_empty() {
            return Err(CommentError::Validation(errors));
        }

        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(CommentError::UnknownPost);
        }

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id,
                author_id: author.id,
                body: body.trim().to_string(),
            })
            .await?;

        metrics::counter!("foglio_comment_created_total").increment(1);

        Ok(comment)
    }
}
