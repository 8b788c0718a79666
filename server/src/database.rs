// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use taskmatrix_common::Category;
use tracing::{debug, info};

use crate::config::DatabaseConfig;

/// Categories provisioned on first start. They are never edited afterwards.
pub const SEED_CATEGORIES: [(i64, &str); 4] =
    [(1, "Home"), (2, "School"), (3, "Work"), (4, "Church")];

// (name, due date, quadrant, category id)
const SAMPLE_TASKS: [(&str, Option<&str>, i32, i64); 3] = [
    ("Finish Mission 8 database setup", Some("2026-02-28"), 2, 2),
    ("Plan weekly work priorities", Some("2026-03-01"), 2, 3),
    ("Prepare family activity", None, 4, 1),
];

/// Establishes the database connection pool.
/// If the database does not exist, it creates it (with its parent directory).
/// It also ensures the schema exists and the categories are seeded.
pub async fn establish_connection_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Invalid database URL: {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    if !Sqlite::database_exists(&config.url).await.unwrap_or(false) {
        info!("Creating database {}", config.url);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
    } else {
        info!("Database already exists.");
    }

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
    if config.is_in_memory() {
        // Every connection would open its own empty database, and the database is
        // dropped once its last connection closes. Keep exactly one, open for good.
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;
    seed(&pool, config.seed_sample_tasks).await?;

    Ok(pool)
}

/// Creates the `categories` and `tasks` tables if they are missing.
/// The CHECK constraints repeat the field invariants so the store never holds
/// a task that would fail validation.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 100)
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'categories' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 200),
            due_date DATE NULL,
            quadrant INTEGER NOT NULL CHECK (quadrant BETWEEN 1 AND 4),
            category_id INTEGER NOT NULL REFERENCES categories (id),
            completed BOOLEAN NOT NULL DEFAULT 0
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'tasks' table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_category_id ON tasks (category_id);")
        .execute(pool)
        .await
        .context("Failed to create index on 'tasks.category_id'")?;

    info!("'categories' and 'tasks' tables are ready.");

    Ok(())
}

/// Inserts the seed categories, and optionally the sample tasks, into a fresh database.
/// Does nothing once categories exist, so tasks deleted by users stay deleted across restarts.
pub async fn seed(pool: &SqlitePool, with_sample_tasks: bool) -> Result<()> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    if existing > 0 {
        debug!("Database already seeded with {} categories.", existing);
        return Ok(());
    }

    let mut tx = pool.begin().await.context("Failed to start seed transaction")?;

    for (id, name) in SEED_CATEGORIES {
        Category {
            id,
            name: name.to_string(),
        }
        .validate()
        .context("Invalid seed category")?;

        sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to seed category '{name}'"))?;
    }

    if with_sample_tasks {
        for (name, due_date, quadrant, category_id) in SAMPLE_TASKS {
            sqlx::query(
                r#"
                INSERT INTO tasks (name, due_date, quadrant, category_id, completed)
                VALUES (?, ?, ?, ?, 0)
                "#,
            )
            .bind(name)
            .bind(due_date)
            .bind(quadrant)
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to seed sample task '{name}'"))?;
        }
    }

    tx.commit().await.context("Failed to commit seed data")?;

    info!(
        "Seeded {} categories{}.",
        SEED_CATEGORIES.len(),
        if with_sample_tasks { " and sample tasks" } else { "" }
    );

    Ok(())
}
