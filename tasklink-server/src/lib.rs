//! `tasklink` server library.
//!
//! Exposes the HTTP API server for use in tests and embedding. The server
//! stores task and user documents independently and runs an association
//! reconciler after every mutation to keep `Task.assignedUser` and
//! `User.pendingTasks` consistent with each other.

pub mod api;
pub mod config;
pub mod query;
pub mod reconcile;
pub mod store;
