//! Decoded UI packages.
//!
//! A [`Package`] owns the raw package buffer. Its item directory records
//! only the byte range of each item's payload; the payload itself is decoded
//! on first access through [`PackageItem::asset`] and memoized, value or
//! error, exactly once.
//!
//! ```ignore
//! use fgui::prelude::*;
//!
//! let pkg = Package::open("ui/Main.fui", &Config::default())?;
//! let item = pkg.item_by_name("Window").ok_or(Error::ItemNotFound("Window".into()))?;
//! let comp = item.component()?;
//! println!("{} children", comp.children.len());
//! ```

mod asset;
mod decode;
mod registry;

pub use asset::*;
pub use registry::*;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock, Weak};

use rayon::prelude::*;
use tracing::debug;

use crate::binary::{ByteRange, Cursor};
use crate::component::{ComponentData, ObjectType};
use crate::util::{Config, Error, Rect, Result, Vec2};

/// Kind of a package item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PackageItemType {
    Image = 0,
    MovieClip = 1,
    Sound = 2,
    Component = 3,
    Atlas = 4,
    Font = 5,
    Swf = 6,
    Misc = 7,
    Unknown = 8,
    Spine = 9,
    DragonBones = 10,
}

impl PackageItemType {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Image,
            1 => Self::MovieClip,
            2 => Self::Sound,
            3 => Self::Component,
            4 => Self::Atlas,
            5 => Self::Font,
            6 => Self::Swf,
            7 => Self::Misc,
            9 => Self::Spine,
            10 => Self::DragonBones,
            _ => Self::Unknown,
        }
    }
}

/// Package this one depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    pub name: String,
}

/// Image item options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageOptions {
    pub scale9_grid: Option<Rect>,
    pub tile_grid_index: i32,
    pub scale_by_tile: bool,
    pub smoothing: bool,
}

/// Region of an atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub atlas: String,
    pub rect: Rect,
    pub rotated: bool,
    pub offset: Vec2,
    pub original_size: Vec2,
}

/// Alpha mask used for pixel-precise hit testing of an image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelHitTestData {
    pub pixel_width: i32,
    pub scale: f32,
    /// Mask bytes inside the package buffer.
    pub pixels: ByteRange,
}

/// Entry of a package's item directory.
#[derive(Debug)]
pub struct PackageItem {
    pub item_type: PackageItemType,
    pub id: String,
    pub name: String,
    pub file: Option<String>,
    pub exported: bool,
    pub width: i32,
    pub height: i32,
    /// Object type built from this item, when it builds one.
    pub object_type: Option<ObjectType>,
    pub image: Option<ImageOptions>,
    pub smoothing: bool,
    pub skeleton_anchor: Option<Vec2>,
    /// Branch item ids, parallel to [`Package::branches`].
    pub branches: Vec<String>,
    pub high_resolution: Vec<String>,
    /// Specialized payload inside the package buffer.
    pub range: ByteRange,
    package: Weak<Package>,
    asset: OnceLock<Result<ItemAsset>>,
}

impl PackageItem {
    pub(crate) fn new(item_type: PackageItemType) -> Self {
        Self {
            item_type,
            id: String::new(),
            name: String::new(),
            file: None,
            exported: false,
            width: 0,
            height: 0,
            object_type: None,
            image: None,
            smoothing: false,
            skeleton_anchor: None,
            branches: Vec::new(),
            high_resolution: Vec::new(),
            range: ByteRange::default(),
            package: Weak::new(),
            asset: OnceLock::new(),
        }
    }

    /// Owning package, while it is alive.
    pub fn package(&self) -> Option<Arc<Package>> {
        self.package.upgrade()
    }

    /// Payload bytes inside `package`.
    pub fn bytes<'a>(&self, package: &'a Package) -> Result<&'a [u8]> {
        self.range.slice(&package.data)
    }

    /// Decoded payload. The first call decodes; later calls, from any
    /// thread, share the memoized value or error.
    pub fn asset(&self) -> Result<&ItemAsset> {
        self.asset
            .get_or_init(|| self.decode_asset())
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether the payload has been decoded (successfully or not).
    pub fn is_decoded(&self) -> bool {
        self.asset.get().is_some()
    }

    /// Decoded component payload.
    pub fn component(&self) -> Result<&ComponentData> {
        match self.asset()? {
            ItemAsset::Component(c) => Ok(c),
            _ => Err(Error::NotAComponent(self.id.clone())),
        }
    }

    /// `ui://` url of this item.
    pub fn url(&self) -> Option<String> {
        self.package().map(|p| format!("ui://{}{}", p.id, self.id))
    }

    fn decode_asset(&self) -> Result<ItemAsset> {
        let package = self
            .package()
            .ok_or_else(|| Error::other(format!("package of item {} was dropped", self.id)))?;
        let bytes = self.bytes(&package)?;
        let mut cur = Cursor::new(bytes)
            .with_strings(&package.strings)
            .with_version(package.version);
        debug!("decoding {:?} item {} ({} bytes)", self.item_type, self.id, bytes.len());

        Ok(match self.item_type {
            PackageItemType::Component => {
                let object_type = self.object_type.unwrap_or(ObjectType::Component);
                ItemAsset::Component(ComponentData::decode(&mut cur, object_type)?)
            }
            PackageItemType::MovieClip => ItemAsset::MovieClip(MovieClipData::decode(&mut cur)?),
            PackageItemType::Font => ItemAsset::Font(FontData::decode(&mut cur)?),
            _ => ItemAsset::Raw(self.range),
        })
    }
}

/// A decoded package.
pub struct Package {
    id: String,
    name: String,
    version: i32,
    dependencies: Vec<Dependency>,
    branches: Vec<String>,
    branch_index: Option<usize>,
    strings: Vec<String>,
    items: Vec<Arc<PackageItem>>,
    items_by_id: HashMap<String, usize>,
    items_by_name: HashMap<String, usize>,
    sprites: HashMap<String, Sprite>,
    hit_tests: HashMap<String, PixelHitTestData>,
    data: Vec<u8>,
}

impl Package {
    /// Read and decode a package file.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Arc<Self>> {
        let path = path.as_ref();
        debug!("opening package {}", path.display());
        let data = std::fs::read(path)?;
        Self::decode(data, config)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Raw package buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn items(&self) -> &[Arc<PackageItem>] {
        &self.items
    }

    pub fn item_by_id(&self, id: &str) -> Option<&Arc<PackageItem>> {
        self.items_by_id.get(id).map(|&i| &self.items[i])
    }

    pub fn item_by_name(&self, name: &str) -> Option<&Arc<PackageItem>> {
        self.items_by_name.get(name).map(|&i| &self.items[i])
    }

    pub fn sprite(&self, id: &str) -> Option<&Sprite> {
        self.sprites.get(id)
    }

    pub fn sprites(&self) -> impl Iterator<Item = (&str, &Sprite)> {
        self.sprites.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn pixel_hit_test(&self, item_id: &str) -> Option<&PixelHitTestData> {
        self.hit_tests.get(item_id)
    }

    /// The variant of `item` for the active branch, or `item` itself.
    pub fn resolve_branch<'a>(&'a self, item: &'a Arc<PackageItem>) -> &'a Arc<PackageItem> {
        self.branch_index
            .and_then(|i| item.branches.get(i))
            .filter(|id| !id.is_empty())
            .and_then(|id| self.item_by_id(id))
            .unwrap_or(item)
    }

    /// Decode every lazily decoded item payload in parallel.
    pub fn preload_all(&self) -> Result<()> {
        self.items.par_iter().try_for_each(|item| item.asset().map(|_| ()))
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("items", &self.items.len())
            .field("sprites", &self.sprites.len())
            .finish()
    }
}
