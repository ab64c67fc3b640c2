// Allow uninlined format args for cleaner bail!/anyhow! macros
#![allow(clippy::uninlined_format_args)]
#![doc = include_str!("../README.md")]

pub mod bundler;
pub mod config;
pub mod error;
pub mod file;
mod paths;
pub mod scripts;
pub mod select;
pub mod sourcemaps;
pub mod task;

#[macro_use]
extern crate lazy_static;

pub use config::BuildConfig;
pub use error::BuildError;
pub use scripts::{run_scripts, BuildSummary, WrittenBundle};
pub use task::TaskRegistry;
pub use anyhow;
