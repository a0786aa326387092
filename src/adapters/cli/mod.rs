//! CLI Adapter
//!
//! Command-line interface for the scanner.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{
    execute, CheckConfigCmd, CliApp, Command, CooldownsCmd, EvaluateCmd, RunCmd,
    DEFAULT_CONFIG_PATH,
};
