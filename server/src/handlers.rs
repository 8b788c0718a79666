// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::SqlitePool;
use taskmatrix_common::{
    group_into_quadrants, Category, FieldError, QuadrantView, Task, TaskPayload, TaskWithCategory,
    ValidationErrors,
};
use tracing::{debug, error, info};

use crate::error::RepositoryError;
use crate::repository::{
    CategoryRepository, SqliteCategoryRepository, SqliteTaskRepository, TaskRepository,
};

/// Shared state handed to every handler.
/// Each repository call checks a connection out of the pool and returns it when done.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<dyn TaskRepository>,
    pub categories: Arc<dyn CategoryRepository>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            tasks: Arc::new(SqliteTaskRepository::new(pool.clone())),
            categories: Arc::new(SqliteCategoryRepository::new(pool)),
        }
    }
}

/// JSON request body. Malformed bodies are answered with the same error shape
/// as every other failure instead of axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Data needed to render the add/edit form: the task and the category choices.
#[derive(Serialize, Debug)]
pub struct TaskForm {
    pub task: Task,
    pub categories: Vec<Category>,
}

/// Handler for listing the incomplete tasks, in quadrant and due date order.
pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskWithCategory>>, AppError> {
    let tasks = state.tasks.list_incomplete().await?;
    info!("Successfully retrieved {} tasks.", tasks.len());
    Ok(Json(tasks))
}

/// Handler for the 2x2 matrix: the incomplete tasks split into their quadrants.
pub async fn list_quadrants(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuadrantView>>, AppError> {
    let tasks = state.tasks.list_incomplete().await?;
    Ok(Json(group_into_quadrants(tasks)))
}

/// Handler for fetching a single task by ID.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, AppError> {
    let task = find_task(&state, task_id).await?;
    Ok(Json(task))
}

/// Handler for the blank "new task" form.
pub async fn new_task_form(State(state): State<AppState>) -> Result<Json<TaskForm>, AppError> {
    let categories = state.categories.list_all().await?;
    Ok(Json(TaskForm {
        task: Task::default(),
        categories,
    }))
}

/// Handler for the form used to edit an existing task.
pub async fn edit_task_form(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskForm>, AppError> {
    let task = find_task(&state, task_id).await?;
    let categories = state.categories.list_all().await?;
    Ok(Json(TaskForm { task, categories }))
}

/// Handler for saving a task: inserts it when it has no ID yet, updates it otherwise.
pub async fn save_task(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TaskPayload>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    debug!("Received request to save task: {:?}", payload);

    let task = payload.into_task().inspect_err(|e| {
        error!("Validation failed: {}", e);
    })?;

    if task.is_new() {
        let created = state.tasks.add(task).await?;
        info!("Task created successfully with ID: {}", created.id);
        // Return a 201 Created status with the new task as JSON.
        Ok((StatusCode::CREATED, Json(created)))
    } else {
        state.tasks.update(&task).await?;
        Ok((StatusCode::OK, Json(task)))
    }
}

/// Handler for deleting a task by ID.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Attempting to delete task with ID: {}", task_id);

    find_task(&state, task_id).await?;
    state.tasks.delete(task_id).await?;

    info!("Task with ID {} deleted successfully.", task_id);
    Ok(StatusCode::NO_CONTENT) // 204 No Content for successful deletion
}

/// Handler for marking a task as completed. Unknown IDs are ignored.
pub async fn complete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.tasks.mark_complete(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for listing categories alphabetically.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.categories.list_all().await?;
    Ok(Json(categories))
}

/// Handler for listing every task of one category.
pub async fn list_category_tasks(
    State(state): State<AppState>,
    Path(category_id): Path<i64>,
) -> Result<Json<Vec<Task>>, AppError> {
    if state.categories.get_by_id(category_id).await?.is_none() {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Category with ID {category_id} not found."),
        ));
    }

    let tasks = state.tasks.list_by_category(category_id).await?;
    Ok(Json(tasks))
}

async fn find_task(state: &AppState, task_id: i64) -> Result<Task, AppError> {
    state
        .tasks
        .get_by_id(task_id)
        .await?
        .ok_or_else(|| AppError::from(RepositoryError::NotFound(task_id)))
}

// --- Custom Error Handling ---
// Internal errors (e.g., from the database) become HTTP responses here.

/// Our custom error type for the application.
#[derive(Debug)]
pub struct AppError {
    code: StatusCode,
    message: String,
    fields: Vec<FieldError>,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            fields: Vec::new(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message: "Validation failed.".to_string(),
            fields: err.errors,
        }
    }
}

/// Body that could not be decoded, e.g. `"quadrant": "two"`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        error!("Rejected request body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, &rejection.body_text())
    }
}

/// Allows converting a `RepositoryError` into our `AppError`.
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(errors) => errors.into(),
            RepositoryError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, &err.to_string()),
            RepositoryError::Constraint(message) => Self::new(StatusCode::BAD_REQUEST, &message),
            RepositoryError::Store(err) => {
                // Log the internal error for debugging, never send it to the client.
                error!("Internal server error: {:?}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.",
                )
            }
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        let body = if self.fields.is_empty() {
            serde_json::json!({ "error": self.message })
        } else {
            serde_json::json!({ "error": self.message, "fields": self.fields })
        };
        (self.code, Json(body)).into_response()
    }
}
