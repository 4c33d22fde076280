pub mod config;
pub mod error;
pub mod types;

pub use config::ThaliConfig;
pub use error::{Result, ThaliError};
pub use types::*;
