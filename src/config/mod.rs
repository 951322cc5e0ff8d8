//! Configuration types and loading for git-smartmsg

mod error;
mod loader;
mod suggest;

pub use error::ConfigError;
pub use loader::SmartmsgConfig;
pub use suggest::SuggestConfig;
