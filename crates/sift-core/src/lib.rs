pub mod config;
pub mod error;

pub use config::SiftConfig;
pub use error::{Result, SiftError};
