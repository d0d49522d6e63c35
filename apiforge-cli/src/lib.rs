//! Library half of the `apiforge` binary, shared with its integration tests.

pub mod app;
pub mod config;

pub use app::App;
pub use config::{CliConfig, load_config};
