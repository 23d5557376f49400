mod auth;
mod dashboard;
mod middleware;
mod public;

pub use auth::{SESSION_COOKIE, session_token};
pub use public::build_router;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::auth::AuthService;
use crate::application::comments::CommentService;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::FeedService;
use crate::application::posts::PostService;
use crate::application::repos::{HealthRepo, RepoError};

pub const AJAX_REQUEST_HEADER: &str = "x-requested-with";
pub const AJAX_REQUEST_VALUE: &str = "XMLHttpRequest";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub auth: Arc<AuthService>,
    pub health: Arc<dyn HealthRepo>,
    pub site: SiteContext,
}

/// Request-independent presentation settings.
#[derive(Clone)]
pub struct SiteContext {
    pub brand_title: String,
    pub home_page_size: u32,
    pub dashboard_page_size: u32,
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::Pagination(p) => HttpError::new(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid cursor",
            p.to_string(),
        ),
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}
