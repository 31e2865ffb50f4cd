//! CLI commands for fretpath.
//!
//! - **Practice commands**: recommend, log (the practice loop)
//! - **Inspection commands**: status
//! - **Utility commands**: init, rebuild

// Practice commands
pub mod log_cmd;
pub mod recommend;

// Inspection commands
pub mod status;

// Utility commands
pub mod init;
pub mod rebuild;

pub use init::InitCommand;
pub use log_cmd::LogCommand;
pub use rebuild::RebuildCommand;
pub use recommend::RecommendCommand;
pub use status::StatusCommand;
