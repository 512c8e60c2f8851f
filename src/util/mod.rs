//! Utility types and functions for fgui.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Rect`], [`Margin`], [`Color`] - Value types stored in packages
//! - Math type re-exports from glam
//! - [`Config`] - Runtime configuration

mod error;
mod math;
mod config;

pub use error::*;
pub use math::*;
pub use config::*;
