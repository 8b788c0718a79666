// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use taskmatrix_common::ValidationErrors;
use thiserror::Error;

/// Failures returned by the task and category repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A field invariant was violated; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Task with ID {0} not found.")]
    NotFound(i64),

    /// The store rejected a reference, e.g. an unknown category.
    #[error("{0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Classifies a failed write: foreign key violations become `Constraint`,
    /// anything else stays a store failure.
    pub(crate) fn from_write(err: sqlx::Error, category_id: i64) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::Constraint(format!("Category with ID {category_id} does not exist."))
            }
            _ => Self::Store(err),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
