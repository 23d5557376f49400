mod support;

use axum::http::{StatusCode, header};
use time::macros::datetime;
use uuid::Uuid;

use support::{TestApp, read_body};

fn location(response: &axum::http::Response<axum::body::Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn dashboard_redirects_anonymous_visitors_to_login() {
    let app = TestApp::new();
    let author = app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let post = app.seed_post("Gated", category, author, datetime!(2024-02-01 0:00 UTC));

    let paths = [
        "/dashboard".to_string(),
        "/posts/new".to_string(),
        format!("/posts/{post}/edit"),
        format!("/posts/{post}/delete"),
    ];
    for path in &paths {
        let response = app.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "path {path}");
        assert_eq!(location(&response), Some("/login"));
    }
}

#[tokio::test]
async fn login_sets_session_cookie_and_redirects() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;

    let response = app
        .post_form("/login", None, "username=ada&password=hunter2")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie set");
    assert!(cookie.starts_with("foglio_session=fs_"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn login_with_bad_credentials_re_renders_the_form() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;

    let response = app
        .post_form("/login", None, "username=ada&password=wrong")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Invalid username or password."));
    assert!(body.contains("value=\"ada\""));
}

#[tokio::test]
async fn logout_discards_the_session() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;
    let token = app.login("ada", "hunter2").await;

    let response = app.post_form("/logout", Some(&token), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    let response = app.get_authed("/dashboard", &token).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn dashboard_uses_its_own_page_size() {
    let app = TestApp::new();
    let author = app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let token = app.login("ada", "hunter2").await;

    for day in 1..=5 {
        app.seed_post(
            &format!("Entry {day}"),
            category,
            author,
            datetime!(2024-01-01 0:00 UTC) + time::Duration::days(day),
        );
    }

    let response = app.get_authed("/dashboard", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;

    assert!(body.contains("Entry 5"));
    assert!(body.contains("Entry 2"));
    assert!(!body.contains("Entry 1</a>"));
    assert!(body.contains("Older posts"));
}

#[tokio::test]
async fn create_post_redirects_to_the_new_detail_page() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let token = app.login("ada", "hunter2").await;

    let form = format!("title=Fresh+post&category={category}&content=Hello+there");
    let response = app.post_form("/posts/new", Some(&token), &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let detail_path = location(&response).expect("redirect target").to_string();
    assert!(detail_path.starts_with("/posts/"));

    let response = app.get(&detail_path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Fresh post"));
    assert!(body.contains("Hello there"));
    assert!(body.contains("ada"));
}

#[tokio::test]
async fn create_post_with_missing_fields_re_renders_with_errors() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;
    app.seed_category("Rust");
    let token = app.login("ada", "hunter2").await;

    let response = app
        .post_form("/posts/new", Some(&token), "title=&category=&content=")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;

    assert!(body.contains("title: This field is required."));
    assert!(body.contains("content: This field is required."));
    assert!(body.contains("category: This field is required."));
}

#[tokio::test]
async fn create_post_with_unknown_category_is_an_invalid_choice() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;
    app.seed_category("Rust");
    let token = app.login("ada", "hunter2").await;

    let form = format!("title=Hi&category={}&content=Text", Uuid::new_v4());
    let response = app.post_form("/posts/new", Some(&token), &form).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("category: Select a valid choice."));
    // The submitted values survive the round trip.
    assert!(body.contains("value=\"Hi\""));
}

#[tokio::test]
async fn edit_post_updates_title_and_content() {
    let app = TestApp::new();
    let author = app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let post = app.seed_post("Old title", category, author, datetime!(2024-02-01 0:00 UTC));
    let token = app.login("ada", "hunter2").await;

    let response = app.get_authed(&format!("/posts/{post}/edit"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("value=\"Old title\""));

    let form = format!("title=New+title&category={category}&content=Rewritten");
    let response = app
        .post_form(&format!("/posts/{post}/edit"), Some(&token), &form)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some(format!("/posts/{post}").as_str()));

    let response = app.get(&format!("/posts/{post}")).await;
    let body = read_body(response).await;
    assert!(body.contains("New title"));
    assert!(body.contains("Rewritten"));
    assert!(!body.contains("Old title"));
}

#[tokio::test]
async fn editing_a_missing_post_is_not_found() {
    let app = TestApp::new();
    app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let token = app.login("ada", "hunter2").await;

    let form = format!("title=Hi&category={category}&content=Text");
    let response = app
        .post_form(&format!("/posts/{}/edit", Uuid::new_v4()), Some(&token), &form)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_flow_confirms_then_removes_the_post() {
    let app = TestApp::new();
    let author = app.seed_user("ada", "hunter2").await;
    let category = app.seed_category("Rust");
    let post = app.seed_post("Doomed", category, author, datetime!(2024-02-01 0:00 UTC));
    let token = app.login("ada", "hunter2").await;

    let response = app
        .get_authed(&format!("/posts/{post}/delete"), &token)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Doomed"));

    let response = app
        .post_form(&format!("/posts/{post}/delete"), Some(&token), "")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/dashboard"));

    let response = app.get(&format!("/posts/{post}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
