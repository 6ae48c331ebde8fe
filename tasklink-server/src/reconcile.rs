//! Association reconciler: keeps `Task.assigned_user` and
//! `User.pending_tasks` mutually consistent across entity mutations.
//!
//! Tasks and users are stored independently with per-document atomicity
//! only, so every mutation that touches an assignment runs one of the entry
//! points below after the primary write. Each counterpart write is attempted
//! independently; a failure never rolls back the primary write or other
//! counterpart writes already applied. Callers log the returned error and
//! still report the primary mutation as successful.
//!
//! Invariants restored by this module (absent concurrent races):
//! - an assigned, not-completed task appears in exactly its owner's pending
//!   set, and in no other user's;
//! - a completed or unassigned task appears in no pending set;
//! - every pending-set entry names an existing task assigned to that user;
//! - `assigned_user_name` always matches the owner's name, or `"unassigned"`.

use std::collections::HashSet;

use tasklink_model::task::{Task, TaskId};
use tasklink_model::user::{User, UserId};

use crate::store::Store;

/// Errors from counterpart writes that failed after the primary write
/// succeeded. Non-fatal: the primary entity state stands.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A user document disappeared before its pending set could be updated.
    #[error("user {user_id} not found while updating pending set")]
    UserMissing {
        /// Id of the missing user.
        user_id: UserId,
    },
    /// A task document disappeared before its assignment could be updated.
    #[error("task {task_id} not found while updating assignment")]
    TaskMissing {
        /// Id of the missing task.
        task_id: TaskId,
    },
}

/// Reconciles a freshly created task.
///
/// If the task is assigned and not completed, adds it to the owner's pending
/// set (idempotent add). Nothing to remove: there is no previous state.
///
/// # Errors
///
/// Returns [`ReconcileError::UserMissing`] if the owner vanished between
/// assignment validation and this write.
pub async fn task_created(store: &Store, task: &Task) -> Result<(), ReconcileError> {
    let Some(owner) = task.assigned_user else {
        return Ok(());
    };
    if task.completed {
        return Ok(());
    }
    if store.add_pending(owner, task.id).await {
        Ok(())
    } else {
        Err(ReconcileError::UserMissing { user_id: owner })
    }
}

/// Reconciles a full task replacement.
///
/// Removal: the previous owner loses the task when ownership changed or the
/// task transitioned to completed. Addition: the new owner gains the task
/// when it is assigned and not completed — but only when membership could
/// actually have changed (ownership changed or the completed flag flipped),
/// so a replace that changes neither produces zero counterpart writes.
/// The *new* completed flag alone decides final membership.
///
/// # Errors
///
/// Returns [`ReconcileError::UserMissing`] if the new owner vanished before
/// the pending-set add.
pub async fn task_replaced(store: &Store, prev: &Task, next: &Task) -> Result<(), ReconcileError> {
    let prev_owner = prev.assigned_user;
    let next_owner = next.assigned_user;
    let owner_changed = prev_owner != next_owner;
    let completion_changed = prev.completed != next.completed;

    if let Some(owner) = prev_owner {
        let became_completed = !prev.completed && next.completed;
        if owner_changed || became_completed {
            // Remove before add so a same-owner transition can never leave
            // the id missing from the final membership decision below.
            store.remove_pending(owner, next.id).await;
        }
    }

    if let Some(owner) = next_owner
        && !next.completed
        && (owner_changed || completion_changed)
        && !store.add_pending(owner, next.id).await
    {
        return Err(ReconcileError::UserMissing { user_id: owner });
    }

    Ok(())
}

/// Reconciles a task deletion: removes the task from its owner's pending
/// set regardless of completion state.
pub async fn task_deleted(store: &Store, task: &Task) {
    if let Some(owner) = task.assigned_user {
        // Missing owner is a no-op: the set entry is gone either way.
        store.remove_pending(owner, task.id).await;
    }
}

/// Filters requested pending-task ids down to those naming an existing,
/// not-yet-completed task. Unknown, malformed, completed, and duplicate
/// entries are dropped silently — a deliberate policy, not a validation
/// error.
pub async fn filter_pending(store: &Store, requested: &[String]) -> Vec<TaskId> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for raw in requested {
        let Ok(id) = raw.parse::<TaskId>() else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        if let Some(task) = store.get_task(id).await
            && !task.completed
        {
            kept.push(id);
        }
    }
    kept
}

/// Reconciles a freshly created user whose (already filtered) pending set
/// has been persisted: claims each retained task for the new user.
///
/// # Errors
///
/// Returns the first [`ReconcileError`] encountered; remaining claims are
/// still attempted.
pub async fn user_created(store: &Store, user: &User) -> Result<(), ReconcileError> {
    let mut first_err = None;
    for task_id in &user.pending_tasks {
        if let Err(e) = claim_task(store, *task_id, user).await {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Reconciles a full user replacement. `next.pending_tasks` must already be
/// the filtered set and persisted.
///
/// Tasks dropped from the set lose their assignment, but only if they still
/// point at this user (a concurrent reassignment wins). Tasks added to the
/// set are claimed for this user.
///
/// # Errors
///
/// Returns the first [`ReconcileError`] encountered; remaining counterpart
/// writes are still attempted.
pub async fn user_replaced(store: &Store, prev: &User, next: &User) -> Result<(), ReconcileError> {
    let prev_set: HashSet<TaskId> = prev.pending_tasks.iter().copied().collect();
    let next_set: HashSet<TaskId> = next.pending_tasks.iter().copied().collect();
    let mut first_err = None;

    for task_id in prev_set.difference(&next_set) {
        store.clear_assignment_if_owner(*task_id, next.id).await;
    }

    for task_id in &next.pending_tasks {
        if prev_set.contains(task_id) {
            continue;
        }
        if let Err(e) = claim_task(store, *task_id, next).await {
            first_err.get_or_insert(e);
        }
    }

    first_err.map_or(Ok(()), Err)
}

/// Reconciles a user deletion: clears the assignment on every task that
/// pointed at the deleted user, regardless of completion state. The tasks
/// themselves are not deleted.
pub async fn user_deleted(store: &Store, user: &User) {
    for task in store.tasks_assigned_to(user.id).await {
        store.set_assignment(task.id, None).await;
    }
}

/// Points a task at `user`, evicting it from a previous owner's pending set
/// first. A task is never left pending under two users by the same logical
/// step.
async fn claim_task(store: &Store, task_id: TaskId, user: &User) -> Result<(), ReconcileError> {
    if let Some(task) = store.get_task(task_id).await
        && let Some(old_owner) = task.assigned_user
        && old_owner != user.id
    {
        store.remove_pending(old_owner, task_id).await;
    }
    if store
        .set_assignment(task_id, Some((user.id, &user.name)))
        .await
    {
        Ok(())
    } else {
        Err(ReconcileError::TaskMissing { task_id })
    }
}
