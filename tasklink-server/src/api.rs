//! HTTP API: axum router, request handlers, and the response envelope.
//!
//! Every response body uses the envelope `{"message": ..., "data": ...}`;
//! successes carry `"OK"` and the entity or list, failures carry the error
//! reason and an empty list. User deletion is the one exception and returns
//! 204 with no body.
//!
//! Handlers perform validation and the primary entity write, then hand the
//! previous/new snapshots to the [`reconcile`] module. A reconciliation
//! failure is logged and does not fail the request: the primary write
//! already succeeded and its result is returned.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Value, json};
use tasklink_model::now_ms;
use tasklink_model::task::{Task, TaskDraft, TaskId, UNASSIGNED};
use tasklink_model::user::{User, UserDraft, UserId};

use crate::query::{ListQuery, RawListParams, project};
use crate::reconcile;
use crate::store::Store;

/// Default maximum number of tasks returned by the list endpoint when no
/// explicit limit is given. Users have no default limit.
pub const DEFAULT_TASK_LIMIT: usize = 100;

/// Shared server state: the document store and resolved limits.
pub struct AppState {
    /// Task and user document store.
    pub store: Store,
    /// Default limit for task list responses.
    pub default_task_limit: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates state with an empty store and default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            default_task_limit: DEFAULT_TASK_LIMIT,
        }
    }

    /// Creates state with a custom default task list limit.
    #[must_use]
    pub fn with_task_limit(default_task_limit: usize) -> Self {
        Self {
            store: Store::new(),
            default_task_limit,
        }
    }
}

/// Client-visible request errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input; surfaced before any store mutation.
    #[error("{0}")]
    Validation(String),
    /// The addressed entity does not exist.
    #[error("Not Found")]
    NotFound,
    /// Serialization failure while building a response.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(json!({ "message": self.to_string(), "data": [] })),
        )
            .into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

/// Builds the `"OK"` envelope response.
fn ok(status: StatusCode, data: Value) -> Response {
    (status, Json(json!({ "message": "OK", "data": data }))).into_response()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Unwraps a JSON body extraction, converting rejections (malformed JSON,
/// unknown fields, wrong types) into validation errors.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(draft)) => Ok(draft),
        Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
    }
}

/// Requires a present, non-empty text field.
fn require_text(value: Option<String>, message: &str) -> Result<String, ApiError> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::Validation(message.to_string())),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid task id '{raw}'")))
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid user id '{raw}'")))
}

/// Resolves a requested assignee to `(id, name)`.
///
/// Absent values and the literal `"unassigned"` mean no assignment. A value
/// that does not parse as an id or does not name an existing user is a
/// validation error: referential validity is checked at write time.
async fn resolve_assignment(
    store: &Store,
    requested: Option<&str>,
) -> Result<Option<(UserId, String)>, ApiError> {
    let Some(raw) = requested else {
        return Ok(None);
    };
    if raw == UNASSIGNED || raw.is_empty() {
        return Ok(None);
    }
    let not_found = || ApiError::Validation("assignedUser does not exist".to_string());
    let user_id: UserId = raw.parse().map_err(|_| not_found())?;
    let user = store.get_user(user_id).await.ok_or_else(not_found)?;
    Ok(Some((user.id, user.name)))
}

/// Single-document query parameters (`?select=` only).
#[derive(Debug, Default, Deserialize)]
struct SelectParams {
    select: Option<String>,
}

impl SelectParams {
    fn into_list_params(self) -> RawListParams {
        RawListParams {
            select: self.select,
            ..Default::default()
        }
    }
}

/// Projects a single entity according to `?select=`, or returns it whole.
fn select_one<T: serde::Serialize>(entity: &T, params: SelectParams) -> Result<Value, ApiError> {
    let query = ListQuery::parse(&params.into_list_params())
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let doc = to_json(entity)?;
    Ok(match query.select {
        Some(select) => project(&doc, &select),
        None => doc,
    })
}

// ---------------------------------------------------------------------------
// Handlers: tasks
// ---------------------------------------------------------------------------

async fn health() -> Response {
    ok(StatusCode::OK, json!("tasklink api is running"))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawListParams>,
) -> ApiResult {
    let query = ListQuery::parse(&raw).map_err(|e| ApiError::Validation(e.to_string()))?;
    let docs = tasks_as_json(&state.store).await?;
    if query.count {
        return Ok(ok(StatusCode::OK, json!(query.count_matching(&docs))));
    }
    let out = query.apply(docs, Some(state.default_task_limit));
    Ok(ok(StatusCode::OK, Value::Array(out)))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<TaskDraft>, JsonRejection>,
) -> ApiResult {
    let draft = parse_body(body)?;
    let name = require_text(draft.name, "name is required")?;
    let deadline = draft
        .deadline
        .ok_or_else(|| ApiError::Validation("deadline (ms epoch) is required".to_string()))?;

    let assignment = resolve_assignment(&state.store, draft.assigned_user.as_deref()).await?;
    let (assigned_user, assigned_user_name) = match assignment {
        Some((id, name)) => (Some(id), name),
        None => (None, UNASSIGNED.to_string()),
    };

    let task = Task {
        id: TaskId::new(),
        name,
        description: draft.description.unwrap_or_default(),
        deadline,
        completed: draft.completed.unwrap_or(false),
        assigned_user,
        assigned_user_name,
        date_created: now_ms(),
    };
    state.store.insert_task(task.clone()).await;
    tracing::info!(task_id = %task.id, "task created");

    if let Err(e) = reconcile::task_created(&state.store, &task).await {
        tracing::warn!(task_id = %task.id, error = %e, "reconciliation incomplete after task create");
    }

    Ok(ok(StatusCode::CREATED, to_json(&task)?))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SelectParams>,
) -> ApiResult {
    let id = parse_task_id(&id)?;
    let task = state.store.get_task(id).await.ok_or(ApiError::NotFound)?;
    Ok(ok(StatusCode::OK, select_one(&task, params)?))
}

async fn replace_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<TaskDraft>, JsonRejection>,
) -> ApiResult {
    let id = parse_task_id(&id)?;
    let draft = parse_body(body)?;
    let name = require_text(draft.name, "name and deadline are required")?;
    let deadline = draft
        .deadline
        .ok_or_else(|| ApiError::Validation("name and deadline are required".to_string()))?;

    // Resolve the new assignment before touching the task, so a bad
    // assignee rejects the request with no mutation.
    let assignment = resolve_assignment(&state.store, draft.assigned_user.as_deref()).await?;
    let (assigned_user, assigned_user_name) = match assignment {
        Some((user_id, user_name)) => (Some(user_id), user_name),
        None => (None, UNASSIGNED.to_string()),
    };

    let prev = state.store.get_task(id).await.ok_or(ApiError::NotFound)?;
    let next = Task {
        id,
        name,
        description: draft.description.unwrap_or_else(|| prev.description.clone()),
        deadline,
        completed: draft.completed.unwrap_or(false),
        assigned_user,
        assigned_user_name,
        date_created: prev.date_created,
    };
    if !state.store.replace_task(next.clone()).await {
        return Err(ApiError::NotFound);
    }

    if let Err(e) = reconcile::task_replaced(&state.store, &prev, &next).await {
        tracing::warn!(task_id = %id, error = %e, "reconciliation incomplete after task replace");
    }

    Ok(ok(StatusCode::OK, to_json(&next)?))
}

async fn delete_task(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let id = parse_task_id(&id)?;
    let task = state
        .store
        .remove_task(id)
        .await
        .ok_or(ApiError::NotFound)?;
    tracing::info!(task_id = %id, "task deleted");

    reconcile::task_deleted(&state.store, &task).await;

    Ok(ok(StatusCode::OK, to_json(&task)?))
}

// ---------------------------------------------------------------------------
// Handlers: users
// ---------------------------------------------------------------------------

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(raw): Query<RawListParams>,
) -> ApiResult {
    let query = ListQuery::parse(&raw).map_err(|e| ApiError::Validation(e.to_string()))?;
    let docs = users_as_json(&state.store).await?;
    if query.count {
        return Ok(ok(StatusCode::OK, json!(query.count_matching(&docs))));
    }
    // Users have no default limit, unlike tasks.
    let out = query.apply(docs, None);
    Ok(ok(StatusCode::OK, Value::Array(out)))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserDraft>, JsonRejection>,
) -> ApiResult {
    let draft = parse_body(body)?;
    let name = require_text(draft.name, "name and email are required")?;
    let email = require_text(draft.email, "name and email are required")?;

    if state.store.email_in_use(&email, None).await {
        return Err(ApiError::Validation("email already exists".to_string()));
    }

    // Filter BEFORE persisting: unknown and completed ids are dropped
    // silently, and the stored user only ever holds the filtered set.
    let requested = draft.pending_tasks.unwrap_or_default();
    let pending_tasks = reconcile::filter_pending(&state.store, &requested).await;

    let user = User {
        id: UserId::new(),
        name,
        email,
        pending_tasks,
        date_created: now_ms(),
    };
    state.store.insert_user(user.clone()).await;
    tracing::info!(user_id = %user.id, "user created");

    if let Err(e) = reconcile::user_created(&state.store, &user).await {
        tracing::warn!(user_id = %user.id, error = %e, "reconciliation incomplete after user create");
    }

    Ok(ok(StatusCode::CREATED, to_json(&user)?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<SelectParams>,
) -> ApiResult {
    let id = parse_user_id(&id)?;
    let user = state.store.get_user(id).await.ok_or(ApiError::NotFound)?;
    Ok(ok(StatusCode::OK, select_one(&user, params)?))
}

async fn replace_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UserDraft>, JsonRejection>,
) -> ApiResult {
    let id = parse_user_id(&id)?;
    let draft = parse_body(body)?;
    let name = require_text(draft.name, "name and email are required")?;
    let email = require_text(draft.email, "name and email are required")?;

    let prev = state.store.get_user(id).await.ok_or(ApiError::NotFound)?;
    if state.store.email_in_use(&email, Some(id)).await {
        return Err(ApiError::Validation("email already exists".to_string()));
    }

    let requested = draft.pending_tasks.unwrap_or_default();
    let pending_tasks = reconcile::filter_pending(&state.store, &requested).await;

    let next = User {
        id,
        name,
        email,
        pending_tasks,
        date_created: prev.date_created,
    };
    if !state.store.replace_user(next.clone()).await {
        return Err(ApiError::NotFound);
    }

    if let Err(e) = reconcile::user_replaced(&state.store, &prev, &next).await {
        tracing::warn!(user_id = %id, error = %e, "reconciliation incomplete after user replace");
    }

    Ok(ok(StatusCode::OK, to_json(&next)?))
}

async fn delete_user(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let id = parse_user_id(&id)?;
    let user = state
        .store
        .remove_user(id)
        .await
        .ok_or(ApiError::NotFound)?;
    tracing::info!(user_id = %id, "user deleted");

    // Owned tasks are unassigned, never deleted.
    reconcile::user_deleted(&state.store, &user).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn tasks_as_json(store: &Store) -> Result<Vec<Value>, ApiError> {
    store.tasks().await.iter().map(to_json).collect()
}

async fn users_as_json(store: &Store) -> Result<Vec<Value>, ApiError> {
    store.users().await.iter().map(to_json).collect()
}

// ---------------------------------------------------------------------------
// Router and server startup
// ---------------------------------------------------------------------------

/// Builds the API router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(health))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(replace_task).delete(delete_task),
        )
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{id}",
            get(get_user).put(replace_user).delete(delete_user),
        )
        .with_state(state)
}

/// Starts the API server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(AppState::new())).await
}

/// Starts the API server with pre-configured [`AppState`].
///
/// This is the primary entry point used by both `main.rs` and test code;
/// tests bind to `127.0.0.1:0` for an OS-assigned port.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<AppState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "api server error");
        }
    });

    Ok((bound_addr, handle))
}
