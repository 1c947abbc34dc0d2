pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod upstream;

pub use config::Config;
pub use error::{Error, Result};
