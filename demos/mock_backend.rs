//! In-memory article and comment services for trying the gateway locally.
//!
//! ```text
//! cargo run --example mock_backend
//! ARTICLE_SERVICE_URL=http://127.0.0.1:3001 COMMENT_SERVICE_URL=http://127.0.0.1:3002 cargo run
//! ```
//!
//! `POST /admin/outage` on either service toggles a simulated outage
//! (every resource route answers 500) so the breakers can be watched opening.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:3001")]
    article_addr: SocketAddr,

    #[arg(long, default_value = "127.0.0.1:3002")]
    comment_addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize)]
struct Article {
    id: u64,
    title: String,
    content: String,
    author: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct ArticleInput {
    title: Option<String>,
    content: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Comment {
    id: u64,
    article_id: u64,
    content: String,
    author: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct CommentInput {
    content: String,
    author: String,
}

#[derive(Clone)]
struct ServiceState<T> {
    items: Arc<RwLock<Vec<T>>>,
    next_id: Arc<AtomicU64>,
    down: Arc<AtomicBool>,
    name: &'static str,
}

impl<T> ServiceState<T> {
    fn new(name: &'static str, items: Vec<T>) -> Self {
        let next_id = items.len() as u64 + 1;
        Self {
            items: Arc::new(RwLock::new(items)),
            next_id: Arc::new(AtomicU64::new(next_id)),
            down: Arc::new(AtomicBool::new(false)),
            name,
        }
    }

    fn outage(&self) -> Option<Response> {
        self.down.load(Ordering::SeqCst).then(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("{} outage (simulated)", self.name) })),
            )
                .into_response()
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn parse_id(raw: &str) -> Result<u64, Response> {
    raw.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": format!("Invalid ID {}", raw) })),
        )
            .into_response()
    })
}

fn article_not_found(id: u64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": format!("Article with ID {} not found", id) })),
    )
        .into_response()
}

async fn health<T>(State(state): State<ServiceState<T>>) -> Json<serde_json::Value> {
    Json(json!({ "status": "OK", "timestamp": now(), "service": state.name }))
}

async fn toggle_outage<T>(State(state): State<ServiceState<T>>) -> Json<serde_json::Value> {
    let down = !state.down.fetch_xor(true, Ordering::SeqCst);
    tracing::warn!(service = state.name, down, "Outage toggled");
    Json(json!({ "service": state.name, "down": down }))
}

async fn list_articles(State(state): State<ServiceState<Article>>) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let articles = state.items.read().await.clone();
    Json(json!({ "success": true, "count": articles.len(), "data": articles })).into_response()
}

async fn get_article(State(state): State<ServiceState<Article>>, Path(id): Path<String>) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.items.read().await.iter().find(|a| a.id == id) {
        Some(article) => Json(json!({ "success": true, "data": article })).into_response(),
        None => article_not_found(id),
    }
}

async fn create_article(
    State(state): State<ServiceState<Article>>,
    Json(input): Json<ArticleInput>,
) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let (Some(title), Some(content)) = (input.title, input.content) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "title and content are required" })),
        )
            .into_response();
    };
    let article = Article {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        title,
        content,
        author: input.author.unwrap_or_else(|| "Anonymous".to_string()),
        created_at: now(),
    };
    state.items.write().await.push(article.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "data": article }))).into_response()
}

async fn update_article(
    State(state): State<ServiceState<Article>>,
    Path(id): Path<String>,
    Json(input): Json<ArticleInput>,
) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut articles = state.items.write().await;
    let Some(article) = articles.iter_mut().find(|a| a.id == id) else {
        return article_not_found(id);
    };
    if let Some(title) = input.title {
        article.title = title;
    }
    if let Some(content) = input.content {
        article.content = content;
    }
    if let Some(author) = input.author {
        article.author = author;
    }
    Json(json!({ "success": true, "data": article.clone() })).into_response()
}

async fn delete_article(State(state): State<ServiceState<Article>>, Path(id): Path<String>) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let mut articles = state.items.write().await;
    let before = articles.len();
    articles.retain(|a| a.id != id);
    if articles.len() == before {
        return article_not_found(id);
    }
    Json(json!({ "success": true, "data": {} })).into_response()
}

async fn list_comments(
    State(state): State<ServiceState<Comment>>,
    Path(article_id): Path<String>,
) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let article_id = match parse_id(&article_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let comments: Vec<Comment> = state
        .items
        .read()
        .await
        .iter()
        .filter(|c| c.article_id == article_id)
        .cloned()
        .collect();
    Json(comments).into_response()
}

async fn create_comment(
    State(state): State<ServiceState<Comment>>,
    Path(article_id): Path<String>,
    Json(input): Json<CommentInput>,
) -> Response {
    if let Some(outage) = state.outage() {
        return outage;
    }
    let article_id = match parse_id(&article_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let comment = Comment {
        id: state.next_id.fetch_add(1, Ordering::SeqCst),
        article_id,
        content: input.content,
        author: input.author,
        created_at: now(),
    };
    state.items.write().await.push(comment.clone());
    (StatusCode::CREATED, Json(comment)).into_response()
}

fn seed_articles() -> Vec<Article> {
    vec![
        Article {
            id: 1,
            title: "Introduction to circuit breakers".into(),
            content: "Stop calling a service that keeps failing.".into(),
            author: "Alice".into(),
            created_at: now(),
        },
        Article {
            id: 2,
            title: "Gateways and aggregation".into(),
            content: "One request in, several backend calls out.".into(),
            author: "Bob".into(),
            created_at: now(),
        },
    ]
}

fn seed_comments() -> Vec<Comment> {
    vec![Comment {
        id: 1,
        article_id: 1,
        content: "Very clear, thanks!".into(),
        author: "Carol".into(),
        created_at: now(),
    }]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    blog_gateway::observability::logging::init_logging("info");
    let args = Args::parse();

    let articles = ServiceState::new("article-service", seed_articles());
    let article_app = Router::new()
        .route("/health", get(health::<Article>))
        .route("/admin/outage", post(toggle_outage::<Article>))
        .route("/api/articles", get(list_articles).post(create_article))
        .route(
            "/api/articles/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .with_state(articles);

    let comments = ServiceState::new("comment-service", seed_comments());
    let comment_app = Router::new()
        .route("/health", get(health::<Comment>))
        .route("/admin/outage", post(toggle_outage::<Comment>))
        .route(
            "/api/articles/{id}/comments",
            get(list_comments).post(create_comment),
        )
        .with_state(comments);

    let article_listener = tokio::net::TcpListener::bind(args.article_addr).await?;
    let comment_listener = tokio::net::TcpListener::bind(args.comment_addr).await?;
    tracing::info!(article = %args.article_addr, comment = %args.comment_addr, "Mock backends listening");

    tokio::try_join!(
        axum::serve(article_listener, article_app).into_future(),
        axum::serve(comment_listener, comment_app).into_future(),
    )?;
    Ok(())
}
