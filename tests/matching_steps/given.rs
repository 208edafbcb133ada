//! Given steps for matching lifecycle scenarios.

use super::world::{MatchingWorld, parse_embedding, run_async};
use chrono::Duration;
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::given;
use std::sync::Arc;
use talentflow::config::MatchThreshold;
use talentflow::matching::{
    adapters::ScriptedOracle,
    domain::{Assignment, Talent, Task},
    ports::{ChangeSet, ExtensionVerdict, MatchingStore},
};

#[given("a matching threshold of {threshold:f64}")]
fn matching_threshold(world: &mut MatchingWorld, threshold: f64) -> Result<(), eyre::Report> {
    let validated = MatchThreshold::new(threshold).wrap_err("threshold")?;
    world.config = world.config.clone().with_threshold(validated);
    Ok(())
}

#[given(r#"a talent named "{name}" with embedding "{embedding}""#)]
fn talent_with_embedding(
    world: &mut MatchingWorld,
    name: String,
    embedding: String,
) -> Result<(), eyre::Report> {
    let talent = Talent::new(name.as_str(), parse_embedding(&embedding)?, &*world.clock)
        .wrap_err("build talent")?;
    run_async(world.store.insert_talent(&talent)).wrap_err("store talent")?;
    world.talents.insert(name, talent);
    Ok(())
}

#[given(r#"an open task with embedding "{embedding}""#)]
fn open_task(world: &mut MatchingWorld, embedding: String) -> Result<(), eyre::Report> {
    let task = Task::new("Write release notes", parse_embedding(&embedding)?, &*world.clock)
        .wrap_err("build task")?;
    run_async(world.store.insert_task(&task)).wrap_err("store task")?;
    world.task = Some(task);
    Ok(())
}

fn assigned_task(
    world: &mut MatchingWorld,
    name: &str,
    deadline_offset: Duration,
) -> Result<(), eyre::Report> {
    let talent_id = world.talent(name)?.id();
    let created = Task::new(
        "Write release notes",
        parse_embedding("1.0, 0.0, 0.0")?,
        &*world.clock,
    )
    .wrap_err("build task")?;
    run_async(world.store.insert_task(&created)).wrap_err("store task")?;

    let now = world.now();
    let mut task = run_async(world.store.find_task(created.id()))
        .wrap_err("reload task")?
        .ok_or_else(|| eyre!("task missing after insert"))?;
    task.assign(now, deadline_offset).wrap_err("assign task")?;
    let assignment = Assignment::assigned_at(task.id(), talent_id, now);
    world.assignment_id = Some(assignment.id());

    let mut changes = ChangeSet::new();
    changes.update_task(task.clone());
    changes.insert_assignment(assignment);
    run_async(world.store.commit(changes)).wrap_err("commit assignment")?;
    world.task = Some(task);
    Ok(())
}

#[given(r#"a task assigned to "{name}" with a deadline {hours:i64} hours from now"#)]
fn task_due_in(world: &mut MatchingWorld, name: String, hours: i64) -> Result<(), eyre::Report> {
    assigned_task(world, &name, Duration::hours(hours))
}

#[given(r#"a task assigned to "{name}" with a deadline {hours:i64} hours ago"#)]
fn task_overdue_by(
    world: &mut MatchingWorld,
    name: String,
    hours: i64,
) -> Result<(), eyre::Report> {
    assigned_task(world, &name, -Duration::hours(hours))
}

#[given(r#"the assignment requests an extension because "{reason}""#)]
fn extension_requested(world: &mut MatchingWorld, reason: String) -> Result<(), eyre::Report> {
    let assignment_id = world
        .assignment_id
        .ok_or_else(|| eyre!("no assignment in scenario world"))?;
    let mut assignment = run_async(world.store.find_assignment(assignment_id))
        .wrap_err("load assignment")?
        .ok_or_else(|| eyre!("assignment {assignment_id} missing from store"))?;
    assignment
        .request_extension(&reason, world.now())
        .wrap_err("request extension")?;

    let mut changes = ChangeSet::new();
    changes.update_assignment(assignment);
    run_async(world.store.commit(changes)).wrap_err("commit extension request")?;
    Ok(())
}

#[given("the oracle approves extensions")]
fn oracle_approves(world: &mut MatchingWorld) {
    world.oracle = Arc::new(ScriptedOracle::new(ExtensionVerdict::Approve));
}

#[given("the oracle rejects extensions")]
fn oracle_rejects(world: &mut MatchingWorld) {
    world.oracle = Arc::new(ScriptedOracle::new(ExtensionVerdict::Reject));
}
