//! Domain types for ibqueue
//!
//! - SchedulableItem: identity, priority distribution, cached sample, due date
//! - SharedItem: the handle the queue and its callers share
//! - initialize_item: turning a stored record into an incremental item

pub mod item;

pub use item::{PriorityDefaults, SchedulableItem, SharedItem, initialize_item};
