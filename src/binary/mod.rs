//! Low-level package binary format.
//!
//! Packages are big-endian and randomly seekable. Every level (the package
//! itself, each item payload, each child block, each controller record)
//! starts with a section index table:
//!
//! ```text
//! +--------------------+
//! | count              |  u8
//! +--------------------+
//! | use_short          |  u8 (1 = i16 offsets, else i32)
//! +--------------------+
//! | offset[0..count]   |  relative to the table start, 0 = absent
//! +--------------------+
//! | ... sections ...   |
//! +--------------------+
//! ```
//!
//! Variable-length records are prefixed with their length, so a reader can
//! always jump to the next record after consuming the fields it knows.

pub mod format;
mod cursor;

pub use cursor::*;
