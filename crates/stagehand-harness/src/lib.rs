#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod walkthrough;

pub use cli::run_from_env;
pub use error::{HarnessError, Result};
