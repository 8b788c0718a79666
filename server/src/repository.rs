// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use async_trait::async_trait;
use sqlx::SqlitePool;
use taskmatrix_common::{Category, Task, TaskWithCategory};
use tracing::{debug, info};

use crate::error::{RepositoryError, RepositoryResult};

/// Reads and writes tasks. Every mutating call commits immediately.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// All tasks not yet completed, with their category name, ordered by quadrant
    /// then due date. Tasks without a due date come last within their quadrant.
    async fn list_incomplete(&self) -> RepositoryResult<Vec<TaskWithCategory>>;

    /// Every task (completed or not) that references `category_id`, ordered by id.
    async fn list_by_category(&self, category_id: i64) -> RepositoryResult<Vec<Task>>;

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<Task>>;

    /// Inserts a new task and returns it with the identity assigned by the store.
    async fn add(&self, task: Task) -> RepositoryResult<Task>;

    /// Overwrites every mutable field of an existing task.
    /// Fails with `NotFound` when no task has that id.
    async fn update(&self, task: &Task) -> RepositoryResult<()>;

    /// Removes the task if present. Deleting an unknown id is a no-op.
    async fn delete(&self, id: i64) -> RepositoryResult<()>;

    /// Flags the task as completed. Unknown ids are ignored.
    async fn mark_complete(&self, id: i64) -> RepositoryResult<()>;
}

/// Read-only access to the seeded categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories sorted by name.
    async fn list_all(&self) -> RepositoryResult<Vec<Category>>;

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<Category>>;
}

const TASK_COLUMNS: &str = "id, name, due_date, quadrant, category_id, completed";

pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn list_incomplete(&self) -> RepositoryResult<Vec<TaskWithCategory>> {
        let tasks = sqlx::query_as::<_, TaskWithCategory>(
            r#"
            SELECT t.id, t.name, t.due_date, t.quadrant, t.category_id, t.completed,
                   c.name AS category_name
            FROM tasks t
            JOIN categories c ON c.id = t.category_id
            WHERE t.completed = 0
            ORDER BY t.quadrant ASC, t.due_date ASC NULLS LAST, t.id ASC;
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Retrieved {} incomplete tasks.", tasks.len());
        Ok(tasks)
    }

    async fn list_by_category(&self, category_id: i64) -> RepositoryResult<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE category_id = ? ORDER BY id ASC;"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?;"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    async fn add(&self, task: Task) -> RepositoryResult<Task> {
        task.validate()?;

        debug!(
            "Insert values: name={}, due_date={:?}, quadrant={}, category_id={}, completed={}",
            task.name, task.due_date, task.quadrant, task.category_id, task.completed
        );

        // The store assigns the identity, whatever the caller put in `id`.
        let id = sqlx::query(
            r#"
            INSERT INTO tasks (name, due_date, quadrant, category_id, completed)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task.name)
        .bind(task.due_date)
        .bind(task.quadrant)
        .bind(task.category_id)
        .bind(task.completed)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, task.category_id))?
        .last_insert_rowid();

        info!("Task created with ID: {}", id);
        Ok(Task { id, ..task })
    }

    async fn update(&self, task: &Task) -> RepositoryResult<()> {
        task.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET name = ?, due_date = ?, quadrant = ?, category_id = ?, completed = ?
            WHERE id = ?
            "#,
        )
        .bind(&task.name)
        .bind(task.due_date)
        .bind(task.quadrant)
        .bind(task.category_id)
        .bind(task.completed)
        .bind(task.id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, task.category_id))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(task.id));
        }

        info!("Task with ID {} updated.", task.id);
        Ok(())
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        info!("Deleted {} rows for task ID: {}", result.rows_affected(), id);
        Ok(())
    }

    async fn mark_complete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE tasks SET completed = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!("No task with ID {} to mark complete.", id);
        } else {
            info!("Task with ID {} marked complete.", id);
        }
        Ok(())
    }
}

pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn list_all(&self) -> RepositoryResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name FROM categories ORDER BY name ASC;",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn get_by_id(&self, id: i64) -> RepositoryResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?;")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::establish_connection_pool;
    use chrono::NaiveDate;

    /// A fresh, seeded in-memory database for each test, so they stay isolated.
    async fn setup_test_repos() -> (SqliteTaskRepository, SqliteCategoryRepository) {
        let pool = establish_connection_pool(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        (
            SqliteTaskRepository::new(pool.clone()),
            SqliteCategoryRepository::new(pool),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn new_task(name: &str, quadrant: i32, due_date: Option<NaiveDate>) -> Task {
        Task {
            id: 0,
            name: name.to_string(),
            due_date,
            quadrant,
            category_id: 3,
            completed: false,
        }
    }

    #[tokio::test]
    async fn test_add_and_get_task() {
        let (tasks, _) = setup_test_repos().await;
        let input = new_task("Plan priorities", 2, date(2026, 3, 1));

        let created = tasks.add(input.clone()).await.unwrap();
        assert!(created.id > 0);

        let fetched = tasks.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, Task { id: created.id, ..input });
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_none() {
        let (tasks, _) = setup_test_repos().await;
        assert_eq!(tasks.get_by_id(42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_incomplete_resolves_category() {
        let (tasks, _) = setup_test_repos().await;
        tasks
            .add(new_task("Plan priorities", 2, date(2026, 3, 1)))
            .await
            .unwrap();

        let listed = tasks.list_incomplete().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].task.name, "Plan priorities");
        assert_eq!(listed[0].category_name, "Work");
    }

    #[tokio::test]
    async fn test_list_incomplete_is_empty_without_tasks() {
        let (tasks, _) = setup_test_repos().await;
        assert!(tasks.list_incomplete().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_incomplete_ordering() {
        let (tasks, _) = setup_test_repos().await;

        // Inserted out of order on purpose.
        for task in [
            new_task("Q4 dated", 4, date(2026, 1, 1)),
            new_task("Q2 undated", 2, None),
            new_task("Q2 late", 2, date(2026, 3, 1)),
            new_task("Q1 undated", 1, None),
            new_task("Q2 early", 2, date(2026, 2, 1)),
            new_task("Q2 undated again", 2, None),
        ] {
            tasks.add(task).await.unwrap();
        }

        let names: Vec<String> = tasks
            .list_incomplete()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "Q1 undated",
                "Q2 early",
                "Q2 late",
                "Q2 undated",
                "Q2 undated again",
                "Q4 dated",
            ]
        );
    }

    #[tokio::test]
    async fn test_dated_task_comes_before_undated_in_same_quadrant() {
        let (tasks, _) = setup_test_repos().await;
        tasks.add(new_task("No deadline", 2, None)).await.unwrap();
        tasks
            .add(new_task("Deadline", 2, date(2026, 3, 1)))
            .await
            .unwrap();

        let listed = tasks.list_incomplete().await.unwrap();
        assert_eq!(listed[0].task.name, "Deadline");
        assert_eq!(listed[1].task.name, "No deadline");
    }

    #[tokio::test]
    async fn test_due_dates_outside_four_digit_years_are_rejected() {
        let (tasks, _) = setup_test_repos().await;

        for far in [date(10000, 1, 1), date(-1, 6, 1)] {
            let err = tasks.add(new_task("Far", 2, far)).await.unwrap_err();
            match err {
                RepositoryError::Validation(errors) => {
                    assert!(errors.message_for("due_date").is_some())
                }
                other => panic!("expected a validation error, got {other:?}"),
            }
        }

        let near = tasks
            .add(new_task("Near", 2, date(2026, 1, 1)))
            .await
            .unwrap();
        let err = tasks
            .update(&Task {
                due_date: date(10000, 1, 1),
                ..near
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        tasks
            .add(new_task("Last year", 2, date(9999, 12, 31)))
            .await
            .unwrap();
        let names: Vec<String> = tasks
            .list_incomplete()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.task.name)
            .collect();
        assert_eq!(names, vec!["Near", "Last year"]);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_fields_before_writing() {
        let (tasks, _) = setup_test_repos().await;

        let err = tasks.add(new_task("", 2, None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        let err = tasks.add(new_task("Bad quadrant", 5, None)).await.unwrap_err();
        match err {
            RepositoryError::Validation(errors) => {
                assert!(errors.message_for("quadrant").is_some())
            }
            other => panic!("expected a validation error, got {other:?}"),
        }

        assert!(tasks.list_incomplete().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_with_unknown_category_is_a_constraint_error() {
        let (tasks, _) = setup_test_repos().await;
        let task = Task {
            category_id: 99,
            ..new_task("Orphan", 1, None)
        };

        let err = tasks.add(task).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
        assert_eq!(err.to_string(), "Category with ID 99 does not exist.");
    }

    #[tokio::test]
    async fn test_update_overwrites_fields() {
        let (tasks, _) = setup_test_repos().await;
        let created = tasks.add(new_task("Draft", 3, None)).await.unwrap();

        let edited = Task {
            name: "Final".to_string(),
            due_date: date(2026, 5, 4),
            quadrant: 1,
            category_id: 1,
            ..created.clone()
        };
        tasks.update(&edited).await.unwrap();

        assert_eq!(tasks.get_by_id(created.id).await.unwrap(), Some(edited));
    }

    #[tokio::test]
    async fn test_update_unknown_task_is_not_found() {
        let (tasks, _) = setup_test_repos().await;
        let ghost = Task {
            id: 77,
            ..new_task("Ghost", 1, None)
        };

        let err = tasks.update(&ghost).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(77)));
    }

    #[tokio::test]
    async fn test_update_with_unknown_category_is_a_constraint_error() {
        let (tasks, _) = setup_test_repos().await;
        let created = tasks.add(new_task("Draft", 3, None)).await.unwrap();

        let err = tasks
            .update(&Task {
                category_id: 12,
                ..created
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (tasks, _) = setup_test_repos().await;
        let created = tasks.add(new_task("Short lived", 4, None)).await.unwrap();

        tasks.delete(created.id).await.unwrap();
        assert_eq!(tasks.get_by_id(created.id).await.unwrap(), None);

        tasks.delete(created.id).await.unwrap();
        tasks.delete(12345).await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_complete_is_idempotent_and_hides_task() {
        let (tasks, _) = setup_test_repos().await;
        let done = tasks.add(new_task("Done soon", 1, None)).await.unwrap();
        let open = tasks.add(new_task("Still open", 1, None)).await.unwrap();

        tasks.mark_complete(done.id).await.unwrap();
        tasks.mark_complete(done.id).await.unwrap();
        tasks.mark_complete(999).await.unwrap();

        let stored = tasks.get_by_id(done.id).await.unwrap().unwrap();
        assert!(stored.completed);

        let listed = tasks.list_incomplete().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].task.id, open.id);
    }

    #[tokio::test]
    async fn test_list_by_category_includes_completed_tasks() {
        let (tasks, _) = setup_test_repos().await;
        let work = tasks.add(new_task("Work item", 1, None)).await.unwrap();
        tasks
            .add(Task {
                category_id: 1,
                ..new_task("Home item", 1, None)
            })
            .await
            .unwrap();
        tasks.mark_complete(work.id).await.unwrap();

        let in_work = tasks.list_by_category(3).await.unwrap();
        assert_eq!(in_work.len(), 1);
        assert_eq!(in_work[0].id, work.id);
        assert!(in_work[0].completed);

        assert!(tasks.list_by_category(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_categories_are_sorted_by_name() {
        let (_, categories) = setup_test_repos().await;

        let names: Vec<String> = categories
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Church", "Home", "School", "Work"]);

        let work = categories.get_by_id(3).await.unwrap().unwrap();
        assert_eq!(work.name, "Work");
        assert_eq!(categories.get_by_id(9).await.unwrap(), None);
    }
}
