// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::fmt;
use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maximum number of characters allowed in a task name.
pub const MAX_TASK_NAME_LEN: usize = 200;

/// Maximum number of characters allowed in a category name.
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// Valid quadrant numbers of the priority matrix.
pub const QUADRANTS: RangeInclusive<i32> = 1..=4;

/// Years a due date may fall in. Dates are stored as `YYYY-MM-DD` text and sorted
/// as text, which only matches calendar order for four-digit positive years.
pub const DUE_DATE_YEARS: RangeInclusive<i32> = 1..=9999;

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task placed in one of the four quadrants of the priority matrix.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `PartialEq`: Lets a stored task be compared field by field with the one
///    that was written.
/// - `Default`: The blank task shown on the "new task" form (id 0).
/// - `sqlx::FromRow`: Allows `sqlx` to create a `Task` instance directly
///    from a database result row.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct Task {
    /// Assigned by the store on insert. `0` means "not persisted yet".
    pub id: i64,

    pub name: String,

    // Only the calendar day matters, so no timezone.
    pub due_date: Option<NaiveDate>,

    /// 1 = urgent/important, 2 = not urgent/important,
    /// 3 = urgent/not important, 4 = not urgent/not important.
    pub quadrant: i32,

    pub category_id: i64,

    pub completed: bool,
}

impl Task {
    /// Returns true when the task has not been persisted yet and must be inserted.
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Checks the field invariants that must hold before any write reaches the store.
    /// Every failing field is reported, not only the first one.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        check_name(&mut errors, &self.name);
        check_due_date(&mut errors, self.due_date);
        check_quadrant(&mut errors, self.quadrant);
        if self.category_id <= 0 {
            errors.push("category_id", "Category is required.");
        }

        errors.into_result()
    }
}

/// A named grouping label attached to a task (e.g. Home, Work).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.trim().is_empty() {
            errors.push("name", "Category name is required.");
        } else if self.name.chars().count() > MAX_CATEGORY_NAME_LEN {
            errors.push(
                "name",
                format!("Category name cannot exceed {MAX_CATEGORY_NAME_LEN} characters."),
            );
        }
        errors.into_result()
    }
}

/// A task together with the name of the category it references,
/// as listed on the quadrants view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TaskWithCategory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub task: Task,

    pub category_name: String,
}

/// Structure used to receive task create/update data from the API.
/// The database model (`Task`) is kept apart from the inbound shape, because
/// the form may leave required fields out and those must come back as
/// field-level messages instead of a decoding failure.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TaskPayload {
    // Absent or 0 means "create", anything else means "update this task".
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub quadrant: Option<i32>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskPayload {
    /// Converts the payload into a `Task`, reporting every missing or invalid field.
    pub fn into_task(self) -> Result<Task, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        check_name(&mut errors, &self.name);
        check_due_date(&mut errors, self.due_date);
        match self.quadrant {
            Some(quadrant) => check_quadrant(&mut errors, quadrant),
            None => errors.push("quadrant", "Quadrant is required."),
        }
        if !matches!(self.category_id, Some(id) if id > 0) {
            errors.push("category_id", "Category is required.");
        }
        errors.into_result()?;

        Ok(Task {
            id: self.id.unwrap_or(0),
            name: self.name,
            due_date: self.due_date,
            quadrant: self.quadrant.unwrap_or_default(),
            category_id: self.category_id.unwrap_or_default(),
            completed: self.completed,
        })
    }
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.push("name", "Task name is required.");
    } else if name.chars().count() > MAX_TASK_NAME_LEN {
        errors.push(
            "name",
            format!("Task name cannot exceed {MAX_TASK_NAME_LEN} characters."),
        );
    }
}

fn check_due_date(errors: &mut ValidationErrors, due_date: Option<NaiveDate>) {
    if let Some(date) = due_date {
        if !DUE_DATE_YEARS.contains(&date.year()) {
            errors.push("due_date", "Due date must be between years 1 and 9999.");
        }
    }
}

fn check_quadrant(errors: &mut ValidationErrors, quadrant: i32) {
    if !QUADRANTS.contains(&quadrant) {
        errors.push("quadrant", "Quadrant must be between 1 and 4.");
    }
}

/// A single field that failed validation, with a message fit for display next to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field-level failure found while validating an input.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", join_field_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the message recorded for `field`, if any.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Human readable name of a quadrant, or `None` when the number is out of range.
pub fn quadrant_label(quadrant: i32) -> Option<&'static str> {
    match quadrant {
        1 => Some("Urgent / Important"),
        2 => Some("Not Urgent / Important"),
        3 => Some("Urgent / Not Important"),
        4 => Some("Not Urgent / Not Important"),
        _ => None,
    }
}

/// One cell of the 2x2 priority matrix.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuadrantView {
    pub quadrant: i32,
    pub label: String,
    pub tasks: Vec<TaskWithCategory>,
}

/// Splits an ordered task list into the four quadrants.
/// Always returns four cells (1 to 4), each keeping the input order.
/// Tasks with an out-of-range quadrant are dropped.
pub fn group_into_quadrants(tasks: Vec<TaskWithCategory>) -> Vec<QuadrantView> {
    let mut cells: Vec<QuadrantView> = QUADRANTS
        .map(|quadrant| QuadrantView {
            quadrant,
            label: quadrant_label(quadrant).unwrap_or_default().to_string(),
            tasks: Vec::new(),
        })
        .collect();

    for task in tasks {
        if let Some(cell) = cells.iter_mut().find(|c| c.quadrant == task.task.quadrant) {
            cell.tasks.push(task);
        }
    }

    cells
}
