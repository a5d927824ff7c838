//! Item storage: the due-items query contract and two stores implementing it.
//!
//! The scheduler only ever sees [`DueItemSource`]. Persistence of freshly
//! drawn samples goes through [`PriorityWriter`], invoked by the application.

mod jsonl;
mod memory;
mod traits;

pub use jsonl::JsonlItemStore;
pub use memory::MemoryItemStore;
pub use traits::{DueItemSource, DueQuery, PriorityUpdate, PriorityWriter, StoredItemRecord};
