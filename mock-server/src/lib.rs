use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct PatchUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One part of a received multipart body, as reported back by `/upload`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub text: Option<String>,
}

#[derive(Default)]
pub struct Users {
    next_id: u64,
    by_id: BTreeMap<u64, User>,
}

pub type Db = Arc<RwLock<Users>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Users::default()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(replace_user).patch(patch_user).delete(delete_user),
        )
        .route("/echo", any(echo))
        .route("/upload", post(upload).put(upload))
        .route("/files/{size}", get(file))
        .route("/text", get(|| async { "plain text, not json" }))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    Json(users.by_id.values().cloned().collect())
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let mut users = db.write().await;
    users.next_id += 1;
    let user = User {
        id: users.next_id,
        name: input.name,
        email: input.email,
    };
    users.by_id.insert(user.id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.by_id.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<CreateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut users = db.write().await;
    let user = users.by_id.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    user.name = input.name;
    user.email = input.email;
    Ok(Json(user.clone()))
}

async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PatchUser>,
) -> Result<Json<User>, StatusCode> {
    let mut users = db.write().await;
    let user = users.by_id.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = Some(email);
    }
    Ok(Json(user.clone()))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, StatusCode> {
    let mut users = db.write().await;
    users
        .by_id
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Reflect method, headers and raw body back as JSON.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<ReceivedPart>>, MultipartError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        let text = match file_name {
            Some(_) => None,
            None => Some(String::from_utf8_lossy(&bytes).into_owned()),
        };
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            size: bytes.len(),
            text,
        });
    }
    Ok(Json(parts))
}

/// `size` bytes of a repeating 0..=255 pattern.
async fn file(Path(size): Path<usize>) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
