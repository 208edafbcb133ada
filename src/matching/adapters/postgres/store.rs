//! `PostgreSQL` record store for the matching engine.

use super::{
    models::{AssignmentRow, NewAssignmentRow, NewTalentRow, NewTaskRow, TalentRow, TaskRow},
    schema::{assignments, talents, tasks},
};
use crate::matching::{
    domain::{
        Assignment, AssignmentId, AssignmentStatus, Embedding, PersistedAssignmentData,
        PersistedTaskData, Talent, TalentId, Task, TaskId,
    },
    ports::{ChangeSet, EntityKind, ExclusionSets, MatchingStore, StoreError, StoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use serde_json::Value;

/// `PostgreSQL` connection pool type used by the matching store.
pub type MatchingPgPool = Pool<ConnectionManager<PgConnection>>;

/// Schema creation script; every statement is idempotent.
const CREATE_SCHEMA_SQL: &str =
    include_str!("../../../../migrations/2026-10-15-000000_create_matching_tables/up.sql");

const ACTIVE_ASSIGNMENT_INDEX: &str = "idx_assignments_one_active_per_task";
const TALENT_FOREIGN_KEY: &str = "assignments_talent_id_fkey";

const STATUS_ASSIGNED: &str = "assigned";
const STATUS_FAILED: &str = "failed";

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed matching store.
///
/// Commits run in a single transaction. Updates are compare-and-set on the
/// `version` column, which also takes the row lock for the rest of the
/// transaction; the partial unique index enforces one active assignment per
/// task.
#[derive(Debug, Clone)]
pub struct PostgresMatchingStore {
    pool: MatchingPgPool,
}

impl PostgresMatchingStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MatchingPgPool) -> Self {
        Self { pool }
    }

    /// Creates the matching tables and indexes when they are missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when a connection cannot be
    /// acquired or a statement fails.
    pub async fn apply_schema(&self) -> StoreResult<()> {
        self.run_blocking(|connection| {
            connection.batch_execute(CREATE_SCHEMA_SQL)?;
            Ok(())
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

#[async_trait]
impl MatchingStore for PostgresMatchingStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let row = to_new_task_row(task)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateTask(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn insert_talent(&self, talent: &Talent) -> StoreResult<()> {
        let talent_id = talent.id();
        let row = NewTalentRow {
            id: talent_id.into_inner(),
            name: talent.name().to_owned(),
            embedding: embedding_to_value(talent.embedding())?,
            created_at: talent.created_at(),
        };
        self.run_blocking(move |connection| {
            diesel::insert_into(talents::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateTalent(talent_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        self.run_blocking(move |connection| {
            let row = assignments::table
                .filter(assignments::id.eq(id.into_inner()))
                .select(AssignmentRow::as_select())
                .first::<AssignmentRow>(connection)
                .optional()?;
            row.map(row_to_assignment).transpose()
        })
        .await
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.run_blocking(|connection| {
            let rows = tasks::table
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn list_talents(&self) -> StoreResult<Vec<Talent>> {
        self.run_blocking(|connection| {
            let rows = talents::table
                .order(talents::id.asc())
                .select(TalentRow::as_select())
                .load::<TalentRow>(connection)?;
            rows.into_iter().map(row_to_talent).collect()
        })
        .await
    }

    async fn list_assignments(&self) -> StoreResult<Vec<Assignment>> {
        self.run_blocking(|connection| {
            let rows = assignments::table
                .order(assignments::created_at.asc())
                .select(AssignmentRow::as_select())
                .load::<AssignmentRow>(connection)?;
            rows.into_iter().map(row_to_assignment).collect()
        })
        .await
    }

    async fn count_talents(&self) -> StoreResult<usize> {
        self.run_blocking(|connection| {
            let count = talents::table.count().get_result::<i64>(connection)?;
            usize::try_from(count).map_err(StoreError::persistence)
        })
        .await
    }

    async fn open_tasks(&self) -> StoreResult<Vec<Task>> {
        self.run_blocking(|connection| {
            let rows = tasks::table
                .filter(tasks::assigned.eq(false))
                .filter(tasks::completed.eq(false))
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn expired_tasks(&self, now: DateTime<Utc>) -> StoreResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = tasks::table
                .filter(tasks::assigned.eq(true))
                .filter(tasks::completed.eq(false))
                .filter(tasks::deadline.lt(now))
                .order(tasks::created_at.asc())
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn failed_talents_by_task(&self) -> StoreResult<ExclusionSets> {
        self.run_blocking(|connection| {
            let pairs = assignments::table
                .filter(assignments::status.eq(STATUS_FAILED))
                .select((assignments::task_id, assignments::talent_id))
                .load::<(uuid::Uuid, uuid::Uuid)>(connection)?;
            let mut exclusions = ExclusionSets::new();
            for (task_id, talent_id) in pairs {
                exclusions
                    .entry(TaskId::from_uuid(task_id))
                    .or_default()
                    .insert(TalentId::from_uuid(talent_id));
            }
            Ok(exclusions)
        })
        .await
    }

    async fn pending_extensions(&self) -> StoreResult<Vec<Assignment>> {
        self.run_blocking(|connection| {
            let rows = assignments::table
                .filter(assignments::extension_requested.eq(true))
                .order(assignments::created_at.asc())
                .select(AssignmentRow::as_select())
                .load::<AssignmentRow>(connection)?;
            rows.into_iter().map(row_to_assignment).collect()
        })
        .await
    }

    async fn active_assignments_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Assignment>> {
        self.run_blocking(move |connection| {
            let rows = assignments::table
                .filter(assignments::task_id.eq(task_id.into_inner()))
                .filter(assignments::status.eq(STATUS_ASSIGNED))
                .order(assignments::created_at.asc())
                .select(AssignmentRow::as_select())
                .load::<AssignmentRow>(connection)?;
            rows.into_iter().map(row_to_assignment).collect()
        })
        .await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.run_blocking(move |connection| {
            connection.transaction::<(), StoreError, _>(|transaction| {
                for task in changes.task_updates() {
                    update_task(transaction, task)?;
                }
                for assignment in changes.assignment_updates() {
                    update_assignment(transaction, assignment)?;
                }
                for assignment in changes.assignment_inserts() {
                    insert_assignment(transaction, assignment)?;
                }
                Ok(())
            })
        })
        .await
    }
}

fn update_task(connection: &mut PgConnection, task: &Task) -> StoreResult<()> {
    let expected = version_to_db(task.version())?;
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(task.id().into_inner()))
            .filter(tasks::version.eq(expected)),
    )
    .set((
        tasks::assigned.eq(task.is_assigned()),
        tasks::deadline.eq(task.deadline()),
        tasks::completed.eq(task.is_completed()),
        tasks::version.eq(expected + 1),
        tasks::updated_at.eq(task.updated_at()),
    ))
    .execute(connection)?;

    if updated == 1 {
        return Ok(());
    }
    let exists = diesel::select(diesel::dsl::exists(
        tasks::table.filter(tasks::id.eq(task.id().into_inner())),
    ))
    .get_result::<bool>(connection)?;
    if exists {
        Err(StoreError::VersionConflict {
            kind: EntityKind::Task,
            id: task.id().to_string(),
            expected: task.version(),
        })
    } else {
        Err(StoreError::TaskNotFound(task.id()))
    }
}

fn update_assignment(connection: &mut PgConnection, assignment: &Assignment) -> StoreResult<()> {
    let expected = version_to_db(assignment.version())?;
    let updated = diesel::update(
        assignments::table
            .filter(assignments::id.eq(assignment.id().into_inner()))
            .filter(assignments::version.eq(expected)),
    )
    .set((
        assignments::status.eq(assignment.status().as_str()),
        assignments::extension_requested.eq(assignment.extension_requested()),
        assignments::extension_reason.eq(assignment.extension_reason()),
        assignments::version.eq(expected + 1),
        assignments::updated_at.eq(assignment.updated_at()),
    ))
    .execute(connection)
    .map_err(|err| map_assignment_write_error(err, assignment))?;

    if updated == 1 {
        return Ok(());
    }
    let exists = diesel::select(diesel::dsl::exists(
        assignments::table.filter(assignments::id.eq(assignment.id().into_inner())),
    ))
    .get_result::<bool>(connection)?;
    if exists {
        Err(StoreError::VersionConflict {
            kind: EntityKind::Assignment,
            id: assignment.id().to_string(),
            expected: assignment.version(),
        })
    } else {
        Err(StoreError::AssignmentNotFound(assignment.id()))
    }
}

fn insert_assignment(connection: &mut PgConnection, assignment: &Assignment) -> StoreResult<()> {
    let row = NewAssignmentRow {
        id: assignment.id().into_inner(),
        task_id: assignment.task_id().into_inner(),
        talent_id: assignment.talent_id().into_inner(),
        status: assignment.status().as_str().to_owned(),
        extension_requested: assignment.extension_requested(),
        extension_reason: assignment.extension_reason().to_owned(),
        version: version_to_db(assignment.version())?,
        created_at: assignment.created_at(),
        updated_at: assignment.updated_at(),
    };
    diesel::insert_into(assignments::table)
        .values(&row)
        .execute(connection)
        .map_err(|err| map_assignment_write_error(err, assignment))?;
    Ok(())
}

fn map_assignment_write_error(err: DieselError, assignment: &Assignment) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if constraint_is(info.as_ref(), ACTIVE_ASSIGNMENT_INDEX) =>
        {
            StoreError::ActiveAssignmentExists(assignment.task_id())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::DuplicateAssignment(assignment.id())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, ref info)
            if constraint_is(info.as_ref(), TALENT_FOREIGN_KEY) =>
        {
            StoreError::TalentNotFound(assignment.talent_id())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            StoreError::TaskNotFound(assignment.task_id())
        }
        _ => StoreError::persistence(err),
    }
}

fn constraint_is(info: &dyn DatabaseErrorInformation, name: &str) -> bool {
    info.constraint_name()
        .is_some_and(|constraint| constraint == name)
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version).map_err(StoreError::persistence)
}

fn version_from_db(version: i64) -> StoreResult<u64> {
    u64::try_from(version).map_err(StoreError::persistence)
}

fn embedding_to_value(embedding: &Embedding) -> StoreResult<Value> {
    serde_json::to_value(embedding.as_slice()).map_err(StoreError::persistence)
}

fn embedding_from_value(value: Value) -> StoreResult<Embedding> {
    let components =
        serde_json::from_value::<Vec<f64>>(value).map_err(StoreError::persistence)?;
    Embedding::new(components).map_err(StoreError::persistence)
}

fn to_new_task_row(task: &Task) -> StoreResult<NewTaskRow> {
    Ok(NewTaskRow {
        id: task.id().into_inner(),
        description: task.description().to_owned(),
        embedding: embedding_to_value(task.embedding())?,
        assigned: task.is_assigned(),
        deadline: task.deadline(),
        completed: task.is_completed(),
        version: version_to_db(task.version())?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> StoreResult<Task> {
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        description: row.description,
        embedding: embedding_from_value(row.embedding)?,
        assigned: row.assigned,
        deadline: row.deadline,
        completed: row.completed,
        version: version_from_db(row.version)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn row_to_talent(row: TalentRow) -> StoreResult<Talent> {
    Ok(Talent::from_persisted(
        TalentId::from_uuid(row.id),
        row.name,
        embedding_from_value(row.embedding)?,
        row.created_at,
    ))
}

fn row_to_assignment(row: AssignmentRow) -> StoreResult<Assignment> {
    let status =
        AssignmentStatus::try_from(row.status.as_str()).map_err(StoreError::persistence)?;
    Ok(Assignment::from_persisted(PersistedAssignmentData {
        id: AssignmentId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        talent_id: TalentId::from_uuid(row.talent_id),
        status,
        extension_requested: row.extension_requested,
        extension_reason: row.extension_reason,
        version: version_from_db(row.version)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}
