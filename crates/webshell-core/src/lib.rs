pub mod config;
pub mod error;

pub use config::WebshellConfig;
pub use error::{Result, WebshellError};
