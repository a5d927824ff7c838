//! ibqueue - an incremental reading review queue
//!
//! Decides which single item to review next from the pool of items due
//! today. Each item carries a Beta(a, b) priority distribution; the queue is
//! ordered by one draw from each distribution, so high-variance items still
//! get their turn while the order stays stable within a day.

pub mod domain;
pub mod error;
pub mod priority;
pub mod properties;
pub mod scheduler;
pub mod storage;

pub use error::{IbqError, Result};
