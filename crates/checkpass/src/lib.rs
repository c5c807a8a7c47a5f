//! Library surface of the checkpass binary crate
//!
//! The binary is a thin shell over these modules so the driver, the local
//! conversation, and the lockout tracker stay testable in-process.

pub mod cli;
pub mod config;
pub mod conv_local;
pub mod driver;
pub mod lockout;
