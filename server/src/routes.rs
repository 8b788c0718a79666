// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers::{self, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

/// Creates and configures the application router.
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // Incomplete tasks, and the same tasks split into the four quadrants
        .route("/api/tasks", get(handlers::list_tasks).post(handlers::save_task))
        .route("/api/quadrants", get(handlers::list_quadrants))
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task).delete(handlers::delete_task),
        )
        .route("/api/tasks/{id}/complete", post(handlers::complete_task))
        // Data for the add/edit form
        .route("/api/task-form", get(handlers::new_task_form))
        .route("/api/task-form/{id}", get(handlers::edit_task_form))
        .route("/api/categories", get(handlers::list_categories))
        .route(
            "/api/categories/{id}/tasks",
            get(handlers::list_category_tasks),
        )
        // Adds the repositories to the application state
        .with_state(AppState::new(pool))
}
