pub mod core;
pub mod output;
mod shell;

pub use shell::{run_cli, SCRIPT_ENV};
