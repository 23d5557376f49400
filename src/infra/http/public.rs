use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::application::auth::AuthenticatedUser;
use crate::application::comments::CommentError;
use crate::application::error::ErrorReport;
use crate::application::feed::FeedError;
use crate::application::posts::PostError;
use crate::presentation::views::{
    FeedView, HomeTemplate, LayoutChrome, LayoutContext, PostDetailView, PostTemplate,
    render_not_found_response, render_template_response,
};

use super::{
    AJAX_REQUEST_HEADER, AJAX_REQUEST_VALUE, HttpState, dashboard, db_health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};
use super::auth::{self, current_user, require_login};

pub fn build_router(state: HttpState) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route(
            "/posts/new",
            get(dashboard::post_new_form).post(dashboard::post_create),
        )
        .route(
            "/posts/{id}/edit",
            get(dashboard::post_edit_form).post(dashboard::post_update),
        )
        .route(
            "/posts/{id}/delete",
            get(dashboard::post_delete_confirm).post(dashboard::post_delete),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        .route("/", get(index))
        .route("/categories/{id}", get(category_index))
        .route("/posts/{id}", get(post_detail).post(post_comment))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/_health/db", get(health))
        .merge(protected)
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

pub(super) fn chrome(state: &HttpState, user: Option<&AuthenticatedUser>) -> LayoutChrome {
    LayoutChrome::new(
        state.site.brand_title.clone(),
        user.map(|u| u.username.clone()),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct CursorQuery {
    pub cursor: Option<String>,
}

async fn index(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Query(query): Query<CursorQuery>,
) -> Response {
    let user = current_user(&state, &headers).await;
    let chrome = chrome(&state, user.as_ref());

    match state
        .feed
        .page(state.site.home_page_size, query.cursor.as_deref())
        .await
    {
        Ok(page) => {
            let content = FeedView::from_page("Latest posts", "/", &page);
            let view = LayoutContext::new(chrome, content);
            render_template_response(HomeTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err),
    }
}

async fn category_index(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let user = current_user(&state, &headers).await;
    let chrome = chrome(&state, user.as_ref());

    let Ok(category_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome);
    };

    match state
        .feed
        .category_page(category_id, state.site.home_page_size, query.cursor.as_deref())
        .await
    {
        Ok(Some((category, page))) => {
            let base_path = format!("/categories/{category_id}");
            let content = FeedView::from_page(category.name.clone(), base_path, &page);
            let view =
                LayoutContext::new(chrome.with_page_title(category.name.clone()), content);
            render_template_response(HomeTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => feed_error_to_response(err),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let user = current_user(&state, &headers).await;
    let chrome = chrome(&state, user.as_ref());

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.detail(post_id).await {
        Ok(Some(detail)) => {
            let content = PostDetailView::from_detail(&detail, user.is_some());
            let view = LayoutContext::new(
                chrome.with_page_title(detail.post.title.clone()),
                content,
            );
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(PostError::Repo(err)) => {
            repo_error_to_http("infra::http::public::post_detail", err).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    body: String,
}

/// Ajax comment endpoint: accepts the comment form posted to the post
/// detail page with the `X-Requested-With: XMLHttpRequest` header.
async fn post_comment(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    const SOURCE: &str = "infra::http::public::post_comment";

    let Some(user) = current_user(&state, &headers).await else {
        return Redirect::to("/login").into_response();
    };

    let is_ajax = headers
        .get(AJAX_REQUEST_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(AJAX_REQUEST_VALUE));
    if !is_ajax {
        let mut response = (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "This endpoint accepts ajax requests only." })),
        )
            .into_response();
        ErrorReport::from_message(SOURCE, StatusCode::BAD_REQUEST, "non-ajax comment submission")
            .attach(&mut response);
        return response;
    }

    let Ok(post_id) = Uuid::parse_str(&id) else {
        let mut response = (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Post not found." })),
        )
            .into_response();
        ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "malformed post id")
            .attach(&mut response);
        return response;
    };

    match state.comments.submit(post_id, &user, &form.body).await {
        Ok(comment) => Json(json!({ "new_comment": comment })).into_response(),
        Err(CommentError::Validation(errors)) => {
            let mut response = (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": errors })),
            )
                .into_response();
            ErrorReport::from_message(SOURCE, StatusCode::BAD_REQUEST, "comment form invalid")
                .attach(&mut response);
            response
        }
        Err(CommentError::UnknownPost) => {
            let mut response = (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Post not found." })),
            )
                .into_response();
            ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "comment on unknown post")
                .attach(&mut response);
            response
        }
        Err(CommentError::Repo(err)) => repo_error_to_http(SOURCE, err).into_response(),
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let user = current_user(&state, &headers).await;
    render_not_found_response(chrome(&state, user.as_ref()))
}

pub(super) fn feed_error_to_response(err: FeedError) -> Response {
    const SOURCE: &str = "infra::http::public::feed_error_to_response";
    match err {
        FeedError::InvalidCursor(detail) => crate::application::error::HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid cursor",
            detail,
        )
        .into_response(),
        FeedError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
