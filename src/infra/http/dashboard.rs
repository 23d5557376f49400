//! Login-gated dashboard: the author's post listing plus the create,
//! edit and delete flows. `require_login` has already resolved the user
//! into request extensions by the time these handlers run.

use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::application::auth::AuthenticatedUser;
use crate::application::error::HttpError;
use crate::application::posts::{PostError, PostFormCommand, PostWriteError};
use crate::application::validation::FieldErrors;
use crate::domain::entities::{CategoryRecord, PostRecord};
use crate::presentation::views::{
    CategoryOptionView, ConfirmDeleteTemplate, ConfirmDeleteView, DashboardTemplate, FeedView,
    LayoutContext, PostFormTemplate, PostFormView, render_not_found_response,
    render_template_response,
};

use super::HttpState;
use super::public::{CursorQuery, chrome, feed_error_to_response};

pub(super) async fn dashboard(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let chrome = chrome(&state, Some(&user)).with_page_title("Dashboard");

    match state
        .feed
        .page(state.site.dashboard_page_size, query.cursor.as_deref())
        .await
    {
        Ok(page) => {
            let content = FeedView::from_page("Your dashboard", "/dashboard", &page);
            let view = LayoutContext::new(chrome, content);
            render_template_response(DashboardTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostForm {
    title: String,
    category: String,
    content: String,
}

impl PostForm {
    fn into_command(self) -> PostFormCommand {
        // An unparseable selection resolves to a category that cannot
        // exist, which fails the choice check with the right message.
        let category_id = match self.category.trim() {
            "" => None,
            raw => Some(Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::nil())),
        };

        PostFormCommand {
            title: self.title,
            category_id,
            content: self.content,
        }
    }
}

pub(super) async fn post_new_form(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Response {
    let categories = match state.posts.categories().await {
        Ok(categories) => categories,
        Err(err) => return post_query_error("infra::http::dashboard::post_new_form", err),
    };

    let content = new_post_form_view(&categories, None, Vec::new());
    let view = LayoutContext::new(
        chrome(&state, Some(&user)).with_page_title("New post"),
        content,
    );
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn post_create(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Form(form): Form<PostForm>,
) -> Response {
    let selected = selected_category(&form);
    let command = form.into_command();

    match state.posts.create(command.clone(), &user).await {
        Ok(post) => Redirect::to(&format!("/posts/{}", post.id)).into_response(),
        Err(PostWriteError::Validation(errors)) => {
            rerender_form(&state, &user, None, &command, selected, errors).await
        }
        Err(err) => post_error_to_response("infra::http::dashboard::post_create", err),
    }
}

pub(super) async fn post_edit_form(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let chrome = chrome(&state, Some(&user));

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome);
    };

    let post = match state.posts.find(post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return render_not_found_response(chrome),
        Err(err) => {
            return post_query_error("infra::http::dashboard::post_edit_form", err);
        }
    };

    let categories = match state.posts.categories().await {
        Ok(categories) => categories,
        Err(err) => {
            return post_query_error("infra::http::dashboard::post_edit_form", err);
        }
    };

    let content = edit_post_form_view(&categories, &post, Vec::new());
    let view = LayoutContext::new(chrome.with_page_title("Edit post"), content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(super) async fn post_update(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome(&state, Some(&user)));
    };

    let selected = selected_category(&form);
    let command = form.into_command();

    match state.posts.update(post_id, command.clone()).await {
        Ok(post) => Redirect::to(&format!("/posts/{}", post.id)).into_response(),
        Err(PostWriteError::Validation(errors)) => {
            rerender_form(&state, &user, Some(post_id), &command, selected, errors).await
        }
        Err(PostWriteError::UnknownPost) => {
            render_not_found_response(chrome(&state, Some(&user)))
        }
        Err(err) => post_error_to_response("infra::http::dashboard::post_update", err),
    }
}

pub(super) async fn post_delete_confirm(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let chrome = chrome(&state, Some(&user));

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome);
    };

    match state.posts.find(post_id).await {
        Ok(Some(post)) => {
            let content = ConfirmDeleteView {
                id: post.id.to_string(),
                title: post.title,
            };
            let view = LayoutContext::new(chrome.with_page_title("Delete post"), content);
            render_template_response(ConfirmDeleteTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome),
        Err(err) => {
            post_query_error("infra::http::dashboard::post_delete_confirm", err)
        }
    }
}

pub(super) async fn post_delete(
    State(state): State<HttpState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Response {
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(chrome(&state, Some(&user)));
    };

    match state.posts.delete(post_id).await {
        Ok(()) => Redirect::to("/dashboard").into_response(),
        Err(PostWriteError::UnknownPost) => {
            render_not_found_response(chrome(&state, Some(&user)))
        }
        Err(err) => post_error_to_response("infra::http::dashboard::post_delete", err),
    }
}

fn selected_category(form: &PostForm) -> Option<String> {
    let trimmed = form.category.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn new_post_form_view(
    categories: &[CategoryRecord],
    selected: Option<&str>,
    errors: Vec<String>,
) -> PostFormView {
    PostFormView {
        heading: "New post".to_string(),
        action: "/posts/new".to_string(),
        title_value: String::new(),
        content_value: String::new(),
        categories: CategoryOptionView::from_records(categories, selected),
        errors,
    }
}

fn edit_post_form_view(
    categories: &[CategoryRecord],
    post: &PostRecord,
    errors: Vec<String>,
) -> PostFormView {
    let category_id = post.category_id.to_string();
    PostFormView {
        heading: "Edit post".to_string(),
        action: format!("/posts/{}/edit", post.id),
        title_value: post.title.clone(),
        content_value: post.content.clone(),
        categories: CategoryOptionView::from_records(categories, Some(category_id.as_str())),
        errors,
    }
}

/// Re-render the form with the submitted values and validation messages.
async fn rerender_form(
    state: &HttpState,
    user: &AuthenticatedUser,
    editing: Option<Uuid>,
    command: &PostFormCommand,
    selected: Option<String>,
    errors: FieldErrors,
) -> Response {
    let categories = match state.posts.categories().await {
        Ok(categories) => categories,
        Err(err) => {
            return post_query_error("infra::http::dashboard::rerender_form", err);
        }
    };

    let messages = errors
        .messages()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>();

    let (heading, action, page_title) = match editing {
        Some(id) => (
            "Edit post".to_string(),
            format!("/posts/{id}/edit"),
            "Edit post",
        ),
        None => ("New post".to_string(), "/posts/new".to_string(), "New post"),
    };

    let content = PostFormView {
        heading,
        action,
        title_value: command.title.clone(),
        content_value: command.content.clone(),
        categories: CategoryOptionView::from_records(&categories, selected.as_deref()),
        errors: messages,
    };
    let view = LayoutContext::new(
        chrome(state, Some(user)).with_page_title(page_title),
        content,
    );
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

fn post_query_error(source: &'static str, err: PostError) -> Response {
    let PostError::Repo(repo) = err;
    super::repo_error_to_http(source, repo).into_response()
}

fn post_error_to_response(source: &'static str, err: PostWriteError) -> Response {
    match err {
        PostWriteError::Validation(_) => HttpError::new(
            source,
            StatusCode::BAD_REQUEST,
            "Request could not be processed",
            "post form validation failed",
        )
        .into_response(),
        PostWriteError::UnknownPost => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "post not found",
        )
        .into_response(),
        PostWriteError::Repo(err) => super::repo_error_to_http(source, err).into_response(),
    }
}
