#![allow(dead_code)]

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use foglio::application::auth::AuthService;
use foglio::application::comments::CommentService;
use foglio::application::feed::FeedService;
use foglio::application::pagination::{CursorPage, PageRequest, PostCursor};
use foglio::application::posts::PostService;
use foglio::application::repos::{
    CategoriesRepo, CommentsRepo, CreateCommentParams, CreatePostParams, CreateUserParams,
    HealthRepo, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo, UsersRepo,
};
use foglio::domain::entities::{
    CategoryRecord, CommentRecord, PostRecord, SessionRecord, UserRecord,
};
use foglio::infra::http::{HttpState, SESSION_COOKIE, SiteContext, build_router};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

/// In-memory stand-in for the Postgres repositories, good enough to
/// drive the full router in tests.
#[derive(Default)]
pub struct MemoryRepos {
    posts: RwLock<Vec<PostRecord>>,
    comments: RwLock<Vec<CommentRecord>>,
    categories: RwLock<Vec<CategoryRecord>>,
    users: RwLock<Vec<UserRecord>>,
    sessions: RwLock<Vec<SessionRecord>>,
}

fn newest_first(a: &PostRecord, b: &PostRecord) -> std::cmp::Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .read()
            .unwrap()
            .iter()
            .filter(|post| filter.category.is_none_or(|id| post.category_id == id))
            .cloned()
            .collect();
        posts.sort_by(newest_first);

        if let Some(cursor) = page.cursor {
            posts.retain(|post| {
                post.published_at < cursor.published_at()
                    || (post.published_at == cursor.published_at() && post.id < cursor.id())
            });
        }

        let has_more = posts.len() as u32 > page.limit;
        posts.truncate(page.limit as usize);
        let next_cursor = if has_more {
            posts
                .last()
                .map(|post| PostCursor::new(post.published_at, post.id).encode())
        } else {
            None
        };

        Ok(CursorPage::new(posts, next_cursor))
    }

    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let count = self
            .posts
            .read()
            .unwrap()
            .iter()
            .filter(|post| filter.category.is_none_or(|id| post.category_id == id))
            .count();
        Ok(count as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .read()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let category = self
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|category| category.id == params.category_id)
            .cloned()
            .ok_or(RepoError::InvalidInput {
                message: "unknown category".to_string(),
            })?;
        let author = self
            .users
            .read()
            .unwrap()
            .iter()
            .find(|user| user.id == params.author_id)
            .cloned()
            .ok_or(RepoError::InvalidInput {
                message: "unknown author".to_string(),
            })?;

        let post = PostRecord {
            id: Uuid::new_v4(),
            title: params.title,
            content: params.content,
            category_id: category.id,
            category_name: category.name,
            author_id: author.id,
            author_name: author.username,
            published_at: OffsetDateTime::now_utc(),
            view_count: 0,
        };
        self.posts.write().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        params: foglio::application::repos::UpdatePostParams,
    ) -> Result<PostRecord, RepoError> {
        let category = self
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|category| category.id == params.category_id)
            .cloned()
            .ok_or(RepoError::InvalidInput {
                message: "unknown category".to_string(),
            })?;

        let mut posts = self.posts.write().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.content = params.content;
        post.category_id = category.id;
        post.category_name = category.name;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut posts = self.posts.write().unwrap();
        let before = posts.len();
        posts.retain(|post| post.id != id);
        if posts.len() == before {
            return Err(RepoError::NotFound);
        }
        self.comments
            .write()
            .unwrap()
            .retain(|comment| comment.post_id != id);
        Ok(())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<i64, RepoError> {
        let mut posts = self.posts.write().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;
        post.view_count += 1;
        Ok(post.view_count)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .comments
            .read()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| comment.created_at);
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let author = self
            .users
            .read()
            .unwrap()
            .iter()
            .find(|user| user.id == params.author_id)
            .cloned()
            .ok_or(RepoError::InvalidInput {
                message: "unknown author".to_string(),
            })?;

        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: author.id,
            author_name: author.username,
            body: params.body,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.write().unwrap().push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_all(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories = self.categories.read().unwrap().clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .unwrap()
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.write().unwrap();
        if users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }

        let user = UserRecord {
            id: Uuid::new_v4(),
            username: params.username,
            password_salt: params.password_salt,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn insert_session(&self, session: SessionRecord) -> Result<(), RepoError> {
        self.sessions.write().unwrap().push(session);
        Ok(())
    }

    async fn find_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>, RepoError> {
        Ok(self
            .sessions
            .read()
            .unwrap()
            .iter()
            .find(|session| session.token_hash == token_hash)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<(), RepoError> {
        self.sessions
            .write()
            .unwrap()
            .retain(|session| session.token_hash != token_hash);
        Ok(())
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, RepoError> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|session| session.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepos {
    async fn ping(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

pub struct TestApp {
    pub repos: Arc<MemoryRepos>,
    pub auth: Arc<AuthService>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_page_sizes(3, 4)
    }

    pub fn with_page_sizes(home: u32, dashboard: u32) -> Self {
        let repos = Arc::new(MemoryRepos::default());

        let posts_repo: Arc<dyn PostsRepo> = repos.clone();
        let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
        let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
        let categories_repo: Arc<dyn CategoriesRepo> = repos.clone();
        let users_repo: Arc<dyn UsersRepo> = repos.clone();
        let sessions_repo: Arc<dyn SessionsRepo> = repos.clone();
        let health_repo: Arc<dyn HealthRepo> = repos.clone();

        let auth = Arc::new(AuthService::new(
            users_repo,
            sessions_repo,
            time::Duration::days(14),
        ));

        let state = HttpState {
            feed: Arc::new(FeedService::new(
                posts_repo.clone(),
                categories_repo.clone(),
            )),
            posts: Arc::new(PostService::new(
                posts_repo.clone(),
                posts_write_repo,
                comments_repo.clone(),
                categories_repo,
            )),
            comments: Arc::new(CommentService::new(posts_repo, comments_repo)),
            auth: auth.clone(),
            health: health_repo,
            site: SiteContext {
                brand_title: "Foglio".to_string(),
                home_page_size: home,
                dashboard_page_size: dashboard,
            },
        };

        let router = build_router(state);
        Self {
            repos,
            auth,
            router,
        }
    }

    pub async fn seed_user(&self, username: &str, password: &str) -> Uuid {
        self.auth
            .register(username, password)
            .await
            .expect("seeded user")
            .id
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        self.auth
            .login(username, password)
            .await
            .expect("seeded credentials accepted")
    }

    pub fn seed_category(&self, name: &str) -> Uuid {
        let category = CategoryRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = category.id;
        self.repos.categories.write().unwrap().push(category);
        id
    }

    pub fn seed_post(
        &self,
        title: &str,
        category_id: Uuid,
        author_id: Uuid,
        published_at: OffsetDateTime,
    ) -> Uuid {
        let category_name = self
            .repos
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|category| category.id == category_id)
            .map(|category| category.name.clone())
            .expect("seeded category");
        let author_name = self
            .repos
            .users
            .read()
            .unwrap()
            .iter()
            .find(|user| user.id == author_id)
            .map(|user| user.username.clone())
            .expect("seeded author");

        let post = PostRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: format!("Body of {title}."),
            category_id,
            category_name,
            author_id,
            author_name,
            published_at,
            view_count: 0,
        };
        let id = post.id;
        self.repos.posts.write().unwrap().push(post);
        id
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router handled request")
    }

    pub async fn get(&self, path: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .uri(path)
                .body(Body::empty())
                .expect("request built"),
        )
        .await
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .uri(path)
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .expect("request built"),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, token: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={token}"));
        }
        self.request(builder.body(Body::from(body.to_string())).expect("request built"))
            .await
    }
}

pub async fn read_body(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collected")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
