//! Database connection, provisioning and schema creation

pub mod init;
pub mod outcome;

pub use init::*;
pub use outcome::StepOutcome;
