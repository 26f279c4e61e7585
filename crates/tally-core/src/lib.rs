pub mod inventory;
pub mod types;

pub mod config;
pub mod error;

pub mod canonical;
pub mod retry;
pub mod shutdown;
pub mod telemetry;

pub use error::{Result, SyncError};
