//! Stand-in for the public todo REST API.
//!
//! Serves a fixed, seeded collection. Like the real backend it simulates
//! writes instead of persisting them: creates answer `201` with the
//! constant id `ECHO_ID`, updates answer with the merged record, deletes
//! answer with the record flagged `isDeleted`. Listing always reflects the
//! seed.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

/// Id returned for every created todo, whatever the client asked for.
pub const ECHO_ID: u64 = 255;
pub const DEFAULT_LIMIT: usize = 30;
pub const DEFAULT_SEED: u64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: u64,
    pub todo: String,
    pub completed: bool,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoList {
    pub todos: Vec<Todo>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTodo {
    #[serde(flatten)]
    pub todo: Todo,
    pub is_deleted: bool,
    pub deleted_on: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub todo: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(rename = "userId")]
    pub user_id: Option<u64>,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub todo: Option<String>,
    pub completed: Option<bool>,
    #[serde(rename = "userId")]
    pub user_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

type Db = Arc<Vec<Todo>>;
type HandlerError = (StatusCode, Json<serde_json::Value>);

/// Deterministic seed: ids `1..=count`, every third one completed.
pub fn seed(count: u64) -> Vec<Todo> {
    (1..=count)
        .map(|id| Todo {
            id,
            todo: format!("Seeded todo {id}"),
            completed: id % 3 == 0,
            user_id: id % 20 + 1,
        })
        .collect()
}

pub fn app() -> Router {
    app_with(seed(DEFAULT_SEED))
}

pub fn app_with(todos: Vec<Todo>) -> Router {
    let db: Db = Arc::new(todos);
    Router::new()
        .route("/todos", get(list_todos))
        .route("/todos/add", post(create_todo))
        .route("/todos/{id}", get(get_todo).put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found(id: u64) -> HandlerError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Todo with id '{id}' not found") })),
    )
}

fn find(db: &Db, id: u64) -> Result<Todo, HandlerError> {
    db.iter().find(|t| t.id == id).cloned().ok_or_else(|| not_found(id))
}

async fn list_todos(State(db): State<Db>, Query(page): Query<Pagination>) -> Json<TodoList> {
    let limit = page.limit.unwrap_or(DEFAULT_LIMIT);
    let skip = page.skip.unwrap_or(0);
    let todos: Vec<Todo> = db.iter().skip(skip).take(limit).cloned().collect();
    tracing::debug!(limit, skip, returned = todos.len(), "list");
    Json(TodoList {
        todos,
        total: db.len(),
        skip,
        limit,
    })
}

async fn get_todo(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Todo>, HandlerError> {
    find(&db, id).map(Json)
}

async fn create_todo(Json(input): Json<CreateTodo>) -> Result<(StatusCode, Json<Todo>), HandlerError> {
    let Some(user_id) = input.user_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "User id is required" })),
        ));
    };
    tracing::debug!(user_id, "create (simulated)");
    Ok((
        StatusCode::CREATED,
        Json(Todo {
            id: ECHO_ID,
            todo: input.todo,
            completed: input.completed,
            user_id,
        }),
    ))
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, HandlerError> {
    let mut todo = find(&db, id)?;
    if let Some(text) = input.todo {
        todo.todo = text;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    if let Some(user_id) = input.user_id {
        todo.user_id = user_id;
    }
    tracing::debug!(id, "update (simulated)");
    Ok(Json(todo))
}

async fn delete_todo(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<DeletedTodo>, HandlerError> {
    let todo = find(&db, id)?;
    tracing::debug!(id, "delete (simulated)");
    Ok(Json(DeletedTodo {
        todo,
        is_deleted: true,
        deleted_on: Utc::now(),
    }))
}
