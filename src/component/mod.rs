//! Decoded component payloads.
//!
//! A component item's payload is a section table (see [`crate::binary`])
//! whose sections hold geometry, controllers, children, relations, hit-test
//! data, transitions, a per-type extension tail, scroll settings and tree
//! nodes. Only what the runtime needs is interpreted; byte ranges are kept
//! for the rest so widget layers can pick them up later.
//!
//! All [`ByteRange`]s in this module are relative to the owning item's
//! payload (see [`PackageItem::bytes`](crate::package::PackageItem::bytes)).

mod controller;
mod decode;
mod gear;
mod relation;

pub use controller::*;
pub use gear::*;
pub use relation::*;

use crate::binary::ByteRange;
use crate::util::{IVec2, Margin, Vec2};

/// Runtime object kind of a child or component item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Image = 0,
    MovieClip = 1,
    Swf = 2,
    #[default]
    Graph = 3,
    Loader = 4,
    Group = 5,
    Text = 6,
    RichText = 7,
    InputText = 8,
    Component = 9,
    List = 10,
    Label = 11,
    Button = 12,
    ComboBox = 13,
    ProgressBar = 14,
    Slider = 15,
    ScrollBar = 16,
    Tree = 17,
    Loader3D = 18,
}

impl ObjectType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use ObjectType::*;
        Some(match v {
            0 => Image,
            1 => MovieClip,
            2 => Swf,
            3 => Graph,
            4 => Loader,
            5 => Group,
            6 => Text,
            7 => RichText,
            8 => InputText,
            9 => Component,
            10 => List,
            11 => Label,
            12 => Button,
            13 => ComboBox,
            14 => ProgressBar,
            15 => Slider,
            16 => ScrollBar,
            17 => Tree,
            18 => Loader3D,
            _ => return None,
        })
    }

    /// Types built from a component item, carrying children and controllers.
    pub fn is_component(self) -> bool {
        use ObjectType::*;
        matches!(
            self,
            Component | List | Label | Button | ComboBox | ProgressBar | Slider | ScrollBar | Tree
        )
    }
}

/// Overflow handling of a component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
}

impl Overflow {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Hidden,
            2 => Self::Scroll,
            _ => Self::Visible,
        }
    }
}

/// Minimum and maximum size; zero means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeLimits {
    pub min: Vec2,
    pub max: Vec2,
}

/// Scroll settings (component section 7).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScrollConfig {
    pub scroll_type: u8,
    pub scroll_bar_display: u8,
    pub flags: i32,
    pub margin: Option<Margin>,
    pub vt_scroll_bar: Option<String>,
    pub hz_scroll_bar: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
}

/// Mask child reference (component section 4).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskData {
    pub child: usize,
    pub reversed: bool,
}

/// Pixel hit-test binding (component section 4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitTestData {
    pub item_id: String,
    pub pos: IVec2,
}

/// Authored transition timeline, located but not interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionData {
    pub name: String,
    pub range: ByteRange,
}

/// Per-type extension tail of a component (section 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionData {
    pub object_type: ObjectType,
    pub range: ByteRange,
}

/// Property override applied to a descendant of a component child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyOverride {
    /// Dot-separated child name path from the overridden child.
    pub path: String,
    pub property: i16,
    pub value: Option<String>,
}

/// One entry of a component's children list.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentChild {
    pub object_type: ObjectType,
    /// Source item id.
    pub src: Option<String>,
    /// Package id of `src` when it lives in another package.
    pub pkg: Option<String>,
    pub id: String,
    pub name: String,
    pub xy: Vec2,
    /// Explicit size; `None` keeps the source item's size.
    pub size: Option<Vec2>,
    pub size_limits: Option<SizeLimits>,
    pub scale: Vec2,
    pub skew: Vec2,
    pub pivot: Option<(Vec2, bool)>,
    pub alpha: f32,
    pub rotation: f32,
    pub visible: bool,
    pub touchable: bool,
    pub grayed: bool,
    pub blend_mode: u8,
    pub color_filter: Option<[f32; 4]>,
    pub data: Option<String>,
    pub tooltips: Option<String>,
    pub group: Option<usize>,
    pub gears: Vec<GearData>,
    pub relations: Vec<RelationData>,
    /// Controller of the parent used as page controller for scrolling.
    pub page_controller: Option<usize>,
    /// `(controller name, page id)` selections applied at build.
    pub controller_overrides: Vec<(String, String)>,
    pub property_overrides: Vec<PropertyOverride>,
    /// The child's whole block, for widget-specific sections.
    pub block: ByteRange,
}

impl ComponentChild {
    pub(crate) fn new(object_type: ObjectType, block: ByteRange) -> Self {
        Self {
            object_type,
            src: None,
            pkg: None,
            id: String::new(),
            name: String::new(),
            xy: Vec2::ZERO,
            size: None,
            size_limits: None,
            scale: Vec2::ONE,
            skew: Vec2::ZERO,
            pivot: None,
            alpha: 1.0,
            rotation: 0.0,
            visible: true,
            touchable: true,
            grayed: false,
            blend_mode: 0,
            color_filter: None,
            data: None,
            tooltips: None,
            group: None,
            gears: Vec::new(),
            relations: Vec::new(),
            page_controller: None,
            controller_overrides: Vec::new(),
            property_overrides: Vec::new(),
            block,
        }
    }

    /// Gear bound to `slot`, if any.
    pub fn gear(&self, slot: GearSlot) -> Option<&GearData> {
        self.gears.iter().find(|g| g.slot == slot)
    }
}

/// Decoded component item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentData {
    pub source_size: Vec2,
    pub init_size: Vec2,
    pub size_limits: Option<SizeLimits>,
    pub pivot: Vec2,
    pub pivot_as_anchor: bool,
    pub margin: Margin,
    pub overflow: Overflow,
    pub clip_softness: Option<IVec2>,
    pub scroll: Option<ScrollConfig>,
    pub controllers: Vec<ControllerData>,
    pub children: Vec<ComponentChild>,
    /// Relations declared on the component itself.
    pub relations: Vec<RelationData>,
    pub mask: Option<MaskData>,
    pub opaque: bool,
    pub hit_test: Option<HitTestData>,
    pub transitions: Vec<TransitionData>,
    pub extension: Option<ExtensionData>,
    pub tree_nodes: Option<ByteRange>,
}

impl ComponentData {
    pub fn child_by_name(&self, name: &str) -> Option<&ComponentChild> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn controller_by_name(&self, name: &str) -> Option<&ControllerData> {
        self.controllers.iter().find(|c| c.name == name)
    }
}
