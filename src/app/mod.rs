pub mod config;
pub mod pipeline;

pub use config::{Cli, Config, StorageBackend};
pub use pipeline::Pipeline;
