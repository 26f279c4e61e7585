pub mod application;
pub mod domain;
pub mod infrastructure;

// 重新导出错误类型
pub use tally_core::error::{Result, SyncError};
