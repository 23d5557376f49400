//! Session-cookie handling: the login and logout endpoints plus the
//! middleware that gates the dashboard routes.

use axum::{
    body::Body,
    extract::State,
    http::{
        HeaderMap, Request, StatusCode,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum::Form;
use serde::Deserialize;
use tracing::warn;

use crate::application::auth::{AuthError, AuthenticatedUser};
use crate::presentation::views::{LayoutContext, LoginTemplate, LoginView, render_template_response};

use super::HttpState;
use super::public::chrome;

pub const SESSION_COOKIE: &str = "foglio_session";

// Cookie lifetime is enforced server-side by the session expiry; the
// cookie itself is session-scoped.
const CLEAR_COOKIE: &str = "foglio_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

/// Extract the session token from the `Cookie` header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("foglio_session="))
        .filter(|token| !token.is_empty())
}

/// Resolve the signed-in user from the request cookies. Lookup failures
/// degrade to an anonymous request rather than failing the page.
pub async fn current_user(state: &HttpState, headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let token = session_token(headers)?;
    match state.auth.authenticate(token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(
                target = "foglio::http::auth",
                error = %err,
                "session lookup failed",
            );
            None
        }
    }
}

/// Gate for the dashboard routes: anonymous requests are redirected to
/// the login page, authenticated ones carry the user in extensions.
pub async fn require_login(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match current_user(&state, request.headers()).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login_form(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    if current_user(&state, &headers).await.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    render_login(&state, None, String::new(), StatusCode::OK)
}

pub async fn login(State(state): State<HttpState>, Form(form): Form<LoginForm>) -> Response {
    match state.auth.login(&form.username, &form.password).await {
        Ok(token) => {
            let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
            let mut response = Redirect::to("/dashboard").into_response();
            match cookie.parse() {
                Ok(value) => {
                    response.headers_mut().insert(SET_COOKIE, value);
                }
                Err(_) => {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
            response
        }
        Err(AuthError::InvalidCredentials) => render_login(
            &state,
            Some("Invalid username or password.".to_string()),
            form.username,
            StatusCode::OK,
        ),
        Err(err) => crate::application::error::HttpError::from_error(
            "infra::http::auth::login",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sign-in failed",
            &err,
        )
        .into_response(),
    }
}

pub async fn logout(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(err) = state.auth.logout(token).await {
            warn!(
                target = "foglio::http::auth",
                error = %err,
                "failed to discard session",
            );
        }
    }

    let mut response = Redirect::to("/").into_response();
    if let Ok(value) = CLEAR_COOKIE.parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

fn render_login(
    state: &HttpState,
    error: Option<String>,
    username_value: String,
    status: StatusCode,
) -> Response {
    let content = LoginView {
        error,
        username_value,
    };
    let view = LayoutContext::new(chrome(state, None).with_page_title("Sign in"), content);
    render_template_response(LoginTemplate { view }, status)
}
