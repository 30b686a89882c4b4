pub mod cli;
pub mod load_config;
pub mod tools;

pub use cli::{run, Cli, Commands};
