//! Diesel row models for matching persistence.

use super::schema::{assignments, talents, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: uuid::Uuid,
    pub description: String,
    pub embedding: Value,
    pub assigned: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    pub id: uuid::Uuid,
    pub description: String,
    pub embedding: Value,
    pub assigned: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub completed: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query result row for talent records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = talents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TalentRow {
    pub id: uuid::Uuid,
    pub name: String,
    pub embedding: Value,
    pub created_at: DateTime<Utc>,
}

/// Insert model for talent records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = talents)]
pub struct NewTalentRow {
    pub id: uuid::Uuid,
    pub name: String,
    pub embedding: Value,
    pub created_at: DateTime<Utc>,
}

/// Query result row for assignment records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AssignmentRow {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    pub talent_id: uuid::Uuid,
    pub status: String,
    pub extension_requested: bool,
    pub extension_reason: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for assignment records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = assignments)]
pub struct NewAssignmentRow {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    pub talent_id: uuid::Uuid,
    pub status: String,
    pub extension_requested: bool,
    pub extension_reason: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
