// todolist - Active/completed task lists with write-through key-value persistence

pub mod clock;
pub mod config;
pub mod file_kv;
pub mod kv;
pub mod sqlite_kv;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use clock::{Clock, ClockGuard, Ticks};
pub use config::{Backend, Config, ConfigOverrides};
pub use file_kv::FileKv;
pub use kv::{KvStore, MemoryKv};
pub use sqlite_kv::SqliteKv;
pub use store::{COMPLETED_KEY, Change, Draft, Rejection, TASKS_KEY, TaskStore};
pub use task::{Task, now_ms};
