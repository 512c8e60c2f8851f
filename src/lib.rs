//! # fgui
//!
//! Runtime core for binary UI packages: a decoder for the package format
//! (item directory, sprites, component payloads) and the live object tree
//! driven by controllers, gears and relations.
//!
//! Rendering, input, fonts and audio belong to the host; this crate hands
//! it decoded assets and the current state of every object.
//!
//! ## Modules
//!
//! - [`util`] - Errors, geometry and color types, runtime configuration
//! - [`binary`] - Big-endian cursor and section tables
//! - [`package`] - Package decoding, lazy item assets, the url registry
//! - [`component`] - Component payloads: children, controllers, gears, relations
//! - [`engine`] - The live [`Tree`]: controllers, gears, tweens, relations
//! - [`fixture`] - Writers producing package bytes for tests and tools
//!
//! ## Example
//!
//! ```ignore
//! use fgui::prelude::*;
//!
//! let package = Package::open("ui/Main.fui", &Config::default())?;
//! let mut registry = Registry::new();
//! registry.add(package.clone());
//!
//! let item = package.item_by_name("Window").unwrap();
//! let mut tree = Tree::build(&registry, item, Config::default())?;
//! let tab = tree.controller_by_name(tree.root(), "tab").unwrap();
//! tree.set_selected_index(tab, 1)?;
//! tree.update(0.016);
//! ```

pub mod util;
pub mod binary;
pub mod package;
pub mod component;
pub mod engine;
pub mod fixture;

// Re-export commonly used types
pub use util::{Config, Error, Result};
pub use package::{Package, PackageItem, Registry};
pub use engine::Tree;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Color, Config, Error, Rect, Result, Vec2};
    pub use crate::package::{ItemAsset, Package, PackageItem, PackageItemType, Registry};
    pub use crate::component::{ComponentData, GearSlot, GearValue, ObjectType};
    pub use crate::engine::{ControllerRef, ObjectId, Tree, TreeEvent};
}
