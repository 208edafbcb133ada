//! Diesel schema for matching persistence.

diesel::table! {
    /// Task records awaiting or holding an assignment.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Human-readable description.
        description -> Text,
        /// Embedding components as a JSON array.
        embedding -> Jsonb,
        /// Whether an assignment is active.
        assigned -> Bool,
        /// Deadline of the current or most recent assignment.
        deadline -> Nullable<Timestamptz>,
        /// Whether the task has been submitted.
        completed -> Bool,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Registered talent.
    talents (id) {
        /// Talent identifier.
        id -> Uuid,
        /// Display name.
        name -> Text,
        /// Embedding components as a JSON array.
        embedding -> Jsonb,
        /// Registration timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Assignments joining tasks and talent.
    assignments (id) {
        /// Assignment identifier.
        id -> Uuid,
        /// Referenced task.
        task_id -> Uuid,
        /// Referenced talent.
        talent_id -> Uuid,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Whether an extension request is pending.
        extension_requested -> Bool,
        /// Reason attached to the pending request.
        extension_reason -> Text,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(assignments -> tasks (task_id));
diesel::joinable!(assignments -> talents (talent_id));
diesel::allow_tables_to_appear_in_same_query!(tasks, talents, assignments);
