//! Then steps for matching lifecycle scenarios.

use super::world::{MatchingWorld, run_async};
use chrono::Duration;
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;
use talentflow::matching::{domain::AssignmentStatus, ports::MatchingStore};

#[then(r#"the task is assigned to "{name}""#)]
fn task_assigned_to(world: &mut MatchingWorld, name: String) -> Result<(), eyre::Report> {
    let expected = world.talent(&name)?.id();
    let task = world.stored_task()?;
    if !task.is_assigned() {
        return Err(eyre!("expected task {} to be assigned", task.id()));
    }
    let active = run_async(world.store.active_assignments_for_task(task.id()))
        .wrap_err("load active assignments")?;
    match active.as_slice() {
        [assignment] if assignment.talent_id() == expected => {
            world.assignment_id = Some(assignment.id());
            Ok(())
        }
        other => Err(eyre!(
            "expected one active assignment for '{name}', found {other:?}"
        )),
    }
}

#[then("the task deadline is {hours:i64} hours from now")]
fn deadline_from_now(world: &mut MatchingWorld, hours: i64) -> Result<(), eyre::Report> {
    let task = world.stored_task()?;
    let expected = world.now() + Duration::hours(hours);
    if task.deadline() != Some(expected) {
        return Err(eyre!(
            "expected deadline {expected}, found {:?}",
            task.deadline()
        ));
    }
    Ok(())
}

#[then("the task remains open")]
fn task_remains_open(world: &mut MatchingWorld) -> Result<(), eyre::Report> {
    let task = world.stored_task()?;
    if !task.is_open() {
        return Err(eyre!("expected task {} to be open", task.id()));
    }
    Ok(())
}

fn stored_assignment(
    world: &MatchingWorld,
) -> Result<talentflow::matching::domain::Assignment, eyre::Report> {
    let assignment_id = world
        .assignment_id
        .ok_or_else(|| eyre!("no assignment in scenario world"))?;
    run_async(world.store.find_assignment(assignment_id))
        .wrap_err("load assignment")?
        .ok_or_else(|| eyre!("assignment {assignment_id} missing from store"))
}

#[then("the extension request is cleared")]
fn extension_cleared(world: &mut MatchingWorld) -> Result<(), eyre::Report> {
    let assignment = stored_assignment(world)?;
    if assignment.extension_requested() || !assignment.extension_reason().is_empty() {
        return Err(eyre!(
            "expected extension request to be cleared on {}",
            assignment.id()
        ));
    }
    Ok(())
}

#[then(r#"the assignment status is "{status}""#)]
fn assignment_status(world: &mut MatchingWorld, status: String) -> Result<(), eyre::Report> {
    let expected =
        AssignmentStatus::try_from(status.as_str()).map_err(|err| eyre!("{err}"))?;
    let assignment = stored_assignment(world)?;
    if assignment.status() != expected {
        return Err(eyre!(
            "expected status {expected}, found {}",
            assignment.status()
        ));
    }
    Ok(())
}

#[then(r#"the oracle was asked about "{reason}""#)]
fn oracle_asked(world: &mut MatchingWorld, reason: String) -> Result<(), eyre::Report> {
    let received = world.oracle.received().wrap_err("read oracle script")?;
    if !received.iter().any(|plea| plea.justification == reason) {
        return Err(eyre!("oracle never saw '{reason}', got {received:?}"));
    }
    Ok(())
}
