use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::FeedPage;
use crate::application::posts::PostDetail;
use crate::domain::entities::{CategoryRecord, CommentRecord, PostRecord};

const SNIPPET_LEN: usize = 240;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let view = LayoutContext::new(chrome.with_page_title("Not found"), ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Shared page chrome: the brand title plus the signed-in user, if any.
#[derive(Clone)]
pub struct LayoutChrome {
    pub brand_title: String,
    pub page_title: Option<String>,
    pub user: Option<String>,
}

impl LayoutChrome {
    pub fn new(brand_title: impl Into<String>, user: Option<String>) -> Self {
        Self {
            brand_title: brand_title.into(),
            page_title: None,
            user,
        }
    }

    pub fn with_page_title(self, title: impl Into<String>) -> Self {
        Self {
            page_title: Some(title.into()),
            ..self
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand_title: String,
    pub page_title: Option<String>,
    pub user: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand_title: chrome.brand_title,
            page_title: chrome.page_title,
            user: chrome.user,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub category_id: String,
    pub category_name: String,
    pub author_name: String,
    pub published: String,
    pub view_count: i64,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id.to_string(),
            title: post.title.clone(),
            snippet: snippet(&post.content),
            category_id: post.category_id.to_string(),
            category_name: post.category_name.clone(),
            author_name: post.author_name.clone(),
            published: format_date(post.published_at),
            view_count: post.view_count,
        }
    }
}

/// The home page, the dashboard and category listings all render this.
#[derive(Clone)]
pub struct FeedView {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub next_cursor: Option<String>,
    pub total: u64,
    pub base_path: String,
}

impl FeedView {
    pub fn from_page(heading: impl Into<String>, base_path: impl Into<String>, page: &FeedPage) -> Self {
        Self {
            heading: heading.into(),
            posts: page.posts.iter().map(PostCard::from).collect(),
            next_cursor: page.next_cursor.clone(),
            total: page.total,
            base_path: base_path.into(),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_name: String,
    pub body: String,
    pub created: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_name: comment.author_name.clone(),
            body: comment.body.clone(),
            created: format_date(comment.created_at),
        }
    }
}

#[derive(Clone)]
pub struct PostDetailView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category_name: String,
    pub author_name: String,
    pub published: String,
    pub view_count: i64,
    pub comments: Vec<CommentView>,
    pub can_comment: bool,
}

impl PostDetailView {
    pub fn from_detail(detail: &PostDetail, can_comment: bool) -> Self {
        Self {
            id: detail.post.id.to_string(),
            title: detail.post.title.clone(),
            content: detail.post.content.clone(),
            category_name: detail.post.category_name.clone(),
            author_name: detail.post.author_name.clone(),
            published: format_date(detail.post.published_at),
            view_count: detail.post.view_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            can_comment,
        }
    }
}

#[derive(Clone)]
pub struct CategoryOptionView {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

impl CategoryOptionView {
    pub fn from_records(categories: &[CategoryRecord], selected: Option<&str>) -> Vec<Self> {
        categories
            .iter()
            .map(|category| {
                let id = category.id.to_string();
                let selected = selected == Some(id.as_str());
                Self {
                    id,
                    name: category.name.clone(),
                    selected,
                }
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub title_value: String,
    pub content_value: String,
    pub categories: Vec<CategoryOptionView>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct ConfirmDeleteView {
    pub id: String,
    pub title: String,
}

#[derive(Clone)]
pub struct LoginView {
    pub error: Option<String>,
    pub username_value: String,
}

#[derive(Clone)]
pub struct ErrorPageView {
    pub code: u16,
    pub heading: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            code: 404,
            heading: "Page not found".to_string(),
            message: "The page you were looking for does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

#[derive(Template)]
#[template(path = "post_confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub view: LayoutContext<ConfirmDeleteView>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn format_date(when: OffsetDateTime) -> String {
    let format = format_description!("[month repr:long] [day padding:none], [year]");
    when.format(&format).unwrap_or_default()
}

fn snippet(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= SNIPPET_LEN {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(SNIPPET_LEN).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_long_content() {
        let long = "word ".repeat(100);
        let short = snippet(&long);
        assert!(short.chars().count() <= SNIPPET_LEN + 1);
        assert!(short.ends_with('…'));
    }

    #[test]
    fn snippet_keeps_short_content_intact() {
        assert_eq!(snippet("  hello world  "), "hello world");
    }

    #[test]
    fn dates_render_human_readable() {
        let when = time::macros::datetime!(2024-03-07 12:00 UTC);
        assert_eq!(format_date(when), "March 7, 2024");
    }
}
