//! Convenience re-exports.

pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::pool::{Pool, PoolStats};
pub use crate::task::{Task, TaskState};
