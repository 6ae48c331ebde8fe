//! In-memory document store for task and user entities.
//!
//! The [`Store`] keeps the two entity kinds in independent maps, each behind
//! its own [`RwLock`]. Every method acquires exactly one lock for the
//! duration of one document mutation, so atomicity is strictly per document;
//! there is no cross-entity transaction. Set mutations on a user's pending
//! list are idempotent: add-if-absent and remove-if-present.

use std::collections::HashMap;

use tasklink_model::task::{Task, TaskId, UNASSIGNED};
use tasklink_model::user::{User, UserId};
use tokio::sync::RwLock;

/// In-memory store holding task and user documents.
#[derive(Default)]
pub struct Store {
    tasks: RwLock<HashMap<TaskId, Task>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl Store {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- tasks ---

    /// Inserts a new task document.
    pub async fn insert_task(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task);
    }

    /// Returns a clone of the task with the given id, if it exists.
    pub async fn get_task(&self, id: TaskId) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(&id).cloned()
    }

    /// Replaces an existing task document, keyed by `task.id`.
    ///
    /// Returns `false` if no task with that id exists (nothing is written).
    pub async fn replace_task(&self, task: Task) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    /// Removes a task document, returning it if it existed.
    pub async fn remove_task(&self, id: TaskId) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(&id)
    }

    /// Overwrites a task's assignment fields in a single document write.
    ///
    /// `None` clears the assignment (`assigned_user = null`,
    /// `assigned_user_name = "unassigned"`). Returns `false` if the task
    /// does not exist.
    pub async fn set_assignment(
        &self,
        id: TaskId,
        assignment: Option<(UserId, &str)>,
    ) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) => {
                match assignment {
                    Some((user_id, name)) => {
                        task.assigned_user = Some(user_id);
                        task.assigned_user_name = name.to_string();
                    }
                    None => {
                        task.assigned_user = None;
                        task.assigned_user_name = UNASSIGNED.to_string();
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Clears a task's assignment only if it is currently assigned to
    /// `owner`. Returns `true` if the assignment was cleared.
    ///
    /// The conditional guards against clobbering a reassignment that raced
    /// ahead of this write.
    pub async fn clear_assignment_if_owner(&self, id: TaskId, owner: UserId) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&id) {
            Some(task) if task.assigned_user == Some(owner) => {
                task.assigned_user = None;
                task.assigned_user_name = UNASSIGNED.to_string();
                true
            }
            _ => false,
        }
    }

    /// Returns all tasks currently assigned to the given user.
    pub async fn tasks_assigned_to(&self, user_id: UserId) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        tasks
            .values()
            .filter(|t| t.assigned_user == Some(user_id))
            .cloned()
            .collect()
    }

    /// Returns a snapshot of all task documents in creation order.
    pub async fn tasks(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        // UUID v7 ids are time-ordered, so this is creation order.
        all.sort_by_key(|t| *t.id.as_uuid());
        all
    }

    // --- users ---

    /// Inserts a new user document.
    pub async fn insert_user(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }

    /// Returns a clone of the user with the given id, if it exists.
    pub async fn get_user(&self, id: UserId) -> Option<User> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }

    /// Replaces an existing user document, keyed by `user.id`.
    ///
    /// Returns `false` if no user with that id exists (nothing is written).
    pub async fn replace_user(&self, user: User) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user;
                true
            }
            None => false,
        }
    }

    /// Removes a user document, returning it if it existed.
    pub async fn remove_user(&self, id: UserId) -> Option<User> {
        let mut users = self.users.write().await;
        users.remove(&id)
    }

    /// Adds a task id to a user's pending set if not already present.
    ///
    /// Returns `false` if the user does not exist.
    pub async fn add_pending(&self, user_id: UserId, task_id: TaskId) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                if !user.pending_tasks.contains(&task_id) {
                    user.pending_tasks.push(task_id);
                }
                true
            }
            None => false,
        }
    }

    /// Removes a task id from a user's pending set if present.
    ///
    /// Returns `false` if the user does not exist; removal of an absent id
    /// is a successful no-op.
    pub async fn remove_pending(&self, user_id: UserId, task_id: TaskId) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                user.pending_tasks.retain(|t| *t != task_id);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if any user other than `excluding` has this email.
    ///
    /// Comparison is case-sensitive, matching the original service.
    pub async fn email_in_use(&self, email: &str, excluding: Option<UserId>) -> bool {
        let users = self.users.read().await;
        users
            .values()
            .any(|u| u.email == email && Some(u.id) != excluding)
    }

    /// Returns a snapshot of all user documents in creation order.
    pub async fn users(&self) -> Vec<User> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| *u.id.as_uuid());
        all
    }
}
