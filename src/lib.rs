//! A small JVM-style runtime: a class file parser, a stack-based bytecode interpreter that runs
//! methods against per-call frames, and a heap reclaimed by explicit mark-and-sweep collection.
//!
//! Most users want `vm::Runtime`, which ties the pieces together.

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
#[macro_use]
pub mod logging;
pub mod model;
pub mod parser;
pub mod util;
pub mod vm;

pub use crate::config::VmOptions;
pub use crate::error::{Error, Result};
pub use crate::vm::Runtime;
