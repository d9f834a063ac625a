//! CLI command handlers.

pub mod config;
pub mod info;
pub mod reduce;

pub use config::{run_config_check, run_config_show};
pub use info::run_info;
pub use reduce::{ReduceCommandInput, run_reduce};
