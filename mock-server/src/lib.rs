use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Query, State},
    http::{header::HOST, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub mod raw;

/// The only account ClientLogin accepts.
pub const ACCOUNT_EMAIL: &str = "reader@example.test";
pub const ACCOUNT_PASSWORD: &str = "correct horse";

#[derive(Debug, Default, Clone, Serialize)]
pub struct ReaderState {
    pub auth_tokens: HashSet<String>,
    pub api_tokens: HashSet<String>,
    pub subscriptions: Vec<String>,
    /// `Host` header of every request, in arrival order.
    pub hosts: Vec<String>,
}

pub type Db = Arc<RwLock<ReaderState>>;

type Fields = HashMap<String, String>;

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/accounts/ClientLogin", post(client_login))
        .route("/reader/api/0/token", post(token))
        .route("/reader/api/0/subscription/edit", post(edit_subscription))
        .route("/reader/api/0/subscription/list", get(list_subscriptions))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn record_host(db: &Db, headers: &HeaderMap) {
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    db.write().await.hosts.push(host);
}

async fn client_login(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(fields): Form<Fields>,
) -> (StatusCode, String) {
    record_host(&db, &headers).await;
    let field = |name: &str| fields.get(name).map(String::as_str);
    if field("accountType") != Some("GOOGLE") || field("service") != Some("xapi") {
        return (StatusCode::FORBIDDEN, "Error=BadRequest\n".to_string());
    }
    if field("Email") != Some(ACCOUNT_EMAIL) || field("Passwd") != Some(ACCOUNT_PASSWORD) {
        return (StatusCode::FORBIDDEN, "Error=BadAuthentication\n".to_string());
    }
    let auth = Uuid::new_v4().simple().to_string();
    db.write().await.auth_tokens.insert(auth.clone());
    let body = format!(
        "SID={}\nLSID={}\nAuth={auth}\n",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    (StatusCode::OK, body)
}

async fn token(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<Fields>,
) -> Result<String, StatusCode> {
    record_host(&db, &headers).await;
    if !query.contains_key("client") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.api_tokens.insert(token.clone());
    Ok(token)
}

async fn edit_subscription(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(fields): Form<Fields>,
) -> (StatusCode, String) {
    record_host(&db, &headers).await;
    let mut state = db.write().await;
    let known_token = fields.get("T").is_some_and(|t| state.api_tokens.contains(t));
    if !known_token {
        return (StatusCode::BAD_REQUEST, "Invalid token".to_string());
    }
    match (fields.get("ac").map(String::as_str), fields.get("s")) {
        (Some("subscribe"), Some(stream)) if stream.starts_with("feed/") => {
            state.subscriptions.push(stream.clone());
            (StatusCode::OK, "OK".to_string())
        }
        _ => (StatusCode::BAD_REQUEST, "Invalid edit".to_string()),
    }
}

async fn list_subscriptions(State(db): State<Db>) -> Json<Vec<String>> {
    Json(db.read().await.subscriptions.clone())
}
