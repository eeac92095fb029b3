//! Parsed, immutable structures of a loaded class file.

pub mod class_file;
