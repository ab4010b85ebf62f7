// Aggregates the split model files
pub mod adapter;
pub mod filter;
pub mod item;
pub mod parser;

pub use filter::{Statistics, StatusFilter, TaskFilter};
pub use item::{Priority, Task, TaskDraft, TaskId, TaskPatch};
