//! Contains a parser for a Java class file.
//!
//! # Examples
//!
//! Basic usage:
//! ```
//! use mini_jvm::parser::class_file::parse_class_file;
//! use mini_jvm::error::ClassFormatError;
//!
//! let data = [0xDE, 0xAD, 0xBE, 0xEF];
//! assert_eq!(parse_class_file(&data).unwrap_err(), ClassFormatError::BadMagic { found: 0xDEADBEEF });
//! ```

pub mod reader;

pub mod class_file;
