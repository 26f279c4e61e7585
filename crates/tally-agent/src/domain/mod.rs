pub mod status;

pub use status::{AgentStatus, CycleReport, CycleResult};
