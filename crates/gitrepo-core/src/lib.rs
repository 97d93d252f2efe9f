//! `gitrepo` Core Library
//!
//! Drives a local git repository through the `git` executable:
//! - Repository handles (working tree or bare)
//! - Argument-vector construction per operation
//! - Subprocess execution with interleaved output capture
//! - Parsers for branch listings
//! - Configuration resolution and tracing setup

pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod git;
pub mod parse;
pub mod repo;
pub mod tracing_init;
pub mod workflow;

pub use command::{GitCommand, Operation};
pub use config::Config;
pub use error::{Error, Result};
pub use executor::{Completion, Execution, Executor, OutputChunk, OutputLog, ProcessHandle, Stream};
pub use git::GitRepo;
pub use repo::Repository;
