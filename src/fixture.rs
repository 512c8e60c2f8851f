//! Minimal package writer used to author fixtures.
//!
//! The runtime only ever reads packages; this module writes the same layout
//! so tests and tools can produce byte-exact inputs without the authoring
//! tool. It covers the subset of fields the decoder interprets.

use std::cell::RefCell;
use std::collections::HashMap;

use byteorder::{BigEndian, WriteBytesExt};

use crate::binary::format::{
    PACKAGE_MAGIC, HEADER_RESERVED, STRING_REF_EMPTY, STRING_REF_NULL, VERSION_BRANCHES,
    VERSION_CUSTOM_EASE, VERSION_ANIMATION_EXT,
};
use crate::component::HomePage;
use crate::util::Color;

// ============================================================================
// Byte writer
// ============================================================================

/// Big-endian byte writer mirroring [`Cursor`](crate::binary::Cursor).
///
/// Writes go to a `Vec<u8>`, which never fails, so io results are dropped.
#[derive(Default, Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        let _ = self.buf.write_i16::<BigEndian>(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let _ = self.buf.write_u16::<BigEndian>(v);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        let _ = self.buf.write_i32::<BigEndian>(v);
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let _ = self.buf.write_u32::<BigEndian>(v);
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        let _ = self.buf.write_f32::<BigEndian>(v);
        self
    }

    pub fn color(&mut self, c: Color) -> &mut Self {
        self.buf.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        self
    }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    /// u16 length-prefixed UTF-8 string.
    pub fn string(&mut self, s: &str) -> &mut Self {
        self.u16(s.len() as u16);
        self.bytes(s.as_bytes())
    }

    /// String-table reference.
    pub fn s(&mut self, pool: &StringPool, s: &str) -> &mut Self {
        self.u16(pool.id(s))
    }

    /// Optional string-table reference.
    pub fn s_opt(&mut self, pool: &StringPool, s: Option<&str>) -> &mut Self {
        self.u16(pool.opt(s))
    }

    /// Record with an i16 length prefix.
    pub fn record_i16(&mut self, f: impl FnOnce(&mut ByteWriter)) -> &mut Self {
        let mut inner = ByteWriter::new();
        f(&mut inner);
        self.i16(inner.len() as i16);
        self.bytes(&inner.buf)
    }

    /// Record with an i32 length prefix.
    pub fn record_i32(&mut self, f: impl FnOnce(&mut ByteWriter)) -> &mut Self {
        let mut inner = ByteWriter::new();
        f(&mut inner);
        self.i32(inner.len() as i32);
        self.bytes(&inner.buf)
    }

    /// Sub-buffer with an i32 length prefix.
    pub fn buffer(&mut self, payload: &[u8]) -> &mut Self {
        self.i32(payload.len() as i32);
        self.bytes(payload)
    }

    /// Section index table followed by the section bodies.
    pub fn sections(&mut self, f: impl FnOnce(&mut Sections)) -> &mut Self {
        let mut sections = Sections::default();
        f(&mut sections);
        sections.write(self);
        self
    }
}

/// Builder for a section index table.
#[derive(Default, Debug)]
pub struct Sections {
    bodies: Vec<Option<Vec<u8>>>,
}

impl Sections {
    /// Append a present section.
    pub fn section(&mut self, f: impl FnOnce(&mut ByteWriter)) -> &mut Self {
        let mut w = ByteWriter::new();
        f(&mut w);
        self.bodies.push(Some(w.into_bytes()));
        self
    }

    /// Append a present section from prepared bytes.
    pub fn section_bytes(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.bodies.push(Some(bytes));
        self
    }

    /// Append an absent section (zero offset).
    pub fn skip_section(&mut self) -> &mut Self {
        self.bodies.push(None);
        self
    }

    fn write(self, w: &mut ByteWriter) {
        let count = self.bodies.len();
        let header = 2 + 4 * count;
        w.u8(count as u8).u8(0);
        let mut offset = header;
        for body in &self.bodies {
            match body {
                Some(b) => {
                    w.i32(offset as i32);
                    offset += b.len();
                }
                None => {
                    w.i32(0);
                }
            }
        }
        for body in self.bodies.into_iter().flatten() {
            w.bytes(&body);
        }
    }
}

/// String table under construction.
#[derive(Default, Debug)]
pub struct StringPool {
    inner: RefCell<(Vec<String>, HashMap<String, u16>)>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `s`, interning it on first use.
    pub fn id(&self, s: &str) -> u16 {
        if s.is_empty() {
            return STRING_REF_EMPTY;
        }
        let mut inner = self.inner.borrow_mut();
        if let Some(&i) = inner.1.get(s) {
            return i;
        }
        let i = inner.0.len() as u16;
        inner.0.push(s.to_string());
        inner.1.insert(s.to_string(), i);
        i
    }

    pub fn opt(&self, s: Option<&str>) -> u16 {
        s.map(|s| self.id(s)).unwrap_or(STRING_REF_NULL)
    }

    pub fn strings(&self) -> Vec<String> {
        self.inner.borrow().0.clone()
    }
}

// ============================================================================
// Package fixture
// ============================================================================

/// Payload of a fixture item.
#[derive(Debug, Clone)]
pub enum PayloadFixture {
    None,
    Raw(Vec<u8>),
    Component(ComponentFixture),
}

/// One entry of the item directory.
#[derive(Debug, Clone)]
pub struct ItemFixture {
    pub item_type: u8,
    pub id: String,
    pub name: String,
    pub file: Option<String>,
    pub width: i32,
    pub height: i32,
    pub exported: bool,
    pub extension: u8,
    pub branch: Option<String>,
    pub payload: PayloadFixture,
}

impl ItemFixture {
    fn base(item_type: u8, id: &str, name: &str) -> Self {
        Self {
            item_type,
            id: id.into(),
            name: name.into(),
            file: None,
            width: 0,
            height: 0,
            exported: true,
            extension: 0,
            branch: None,
            payload: PayloadFixture::None,
        }
    }

    pub fn image(id: &str, name: &str, width: i32, height: i32) -> Self {
        Self { width, height, ..Self::base(0, id, name) }
    }

    pub fn sound(id: &str, name: &str, file: &str) -> Self {
        Self { file: Some(file.into()), ..Self::base(2, id, name) }
    }

    pub fn movie_clip(id: &str, name: &str, payload: Vec<u8>) -> Self {
        Self { payload: PayloadFixture::Raw(payload), ..Self::base(1, id, name) }
    }

    pub fn font(id: &str, name: &str, payload: Vec<u8>) -> Self {
        Self { payload: PayloadFixture::Raw(payload), ..Self::base(5, id, name) }
    }

    pub fn component(id: &str, name: &str, component: ComponentFixture) -> Self {
        Self {
            width: component.width,
            height: component.height,
            payload: PayloadFixture::Component(component),
            ..Self::base(3, id, name)
        }
    }

    pub fn with_extension(mut self, object_type: u8) -> Self {
        self.extension = object_type;
        self
    }

    fn write(&self, w: &mut ByteWriter, pool: &StringPool, version: i32) {
        w.u8(self.item_type)
            .s(pool, &self.id)
            .s(pool, &self.name)
            .s_opt(pool, None)
            .s_opt(pool, self.file.as_deref())
            .bool(self.exported)
            .i32(self.width)
            .i32(self.height);
        let payload = match &self.payload {
            PayloadFixture::None => Vec::new(),
            PayloadFixture::Raw(b) => b.clone(),
            PayloadFixture::Component(c) => c.encode(pool, version),
        };
        match self.item_type {
            0 => {
                w.u8(0).bool(true);
            }
            1 => {
                w.bool(true).buffer(&payload);
            }
            3 => {
                w.u8(self.extension).buffer(&payload);
            }
            5 => {
                w.buffer(&payload);
            }
            9 | 10 => {
                w.f32(0.0).f32(0.0);
            }
            _ => {}
        }
        if version >= VERSION_BRANCHES {
            w.s_opt(pool, self.branch.as_deref()).u8(0).u8(0);
        }
    }
}

/// Whole-package fixture.
#[derive(Debug)]
pub struct PackageFixture {
    pub pool: StringPool,
    pub id: String,
    pub name: String,
    pub version: i32,
    pub compressed: bool,
    pub dependencies: Vec<(String, String)>,
    pub items: Vec<ItemFixture>,
    /// (sprite id, atlas id, x, y, w, h)
    pub sprites: Vec<(String, String, i32, i32, i32, i32)>,
    /// (item id, pixel width, scale divisor, pixels)
    pub hit_tests: Vec<(String, i32, u8, Vec<u8>)>,
}

impl PackageFixture {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            pool: StringPool::new(),
            id: id.into(),
            name: name.into(),
            version: 2,
            compressed: false,
            dependencies: Vec::new(),
            items: Vec::new(),
            sprites: Vec::new(),
            hit_tests: Vec::new(),
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn item(mut self, item: ItemFixture) -> Self {
        self.items.push(item);
        self
    }

    pub fn dependency(mut self, id: &str, name: &str) -> Self {
        self.dependencies.push((id.into(), name.into()));
        self
    }

    pub fn sprite(mut self, id: &str, atlas: &str, rect: [i32; 4]) -> Self {
        self.sprites.push((id.into(), atlas.into(), rect[0], rect[1], rect[2], rect[3]));
        self
    }

    pub fn hit_test(mut self, id: &str, pixel_width: i32, divisor: u8, pixels: &[u8]) -> Self {
        self.hit_tests.push((id.into(), pixel_width, divisor, pixels.to_vec()));
        self
    }

    /// Encode the package.
    pub fn build(&self) -> Vec<u8> {
        let pool = &self.pool;
        let version = self.version;

        let mut deps = ByteWriter::new();
        deps.i16(self.dependencies.len() as i16);
        for (id, name) in &self.dependencies {
            deps.s(pool, id).s(pool, name);
        }
        if version >= VERSION_BRANCHES {
            deps.i16(0);
        }

        let mut items = ByteWriter::new();
        items.i16(self.items.len() as i16);
        for item in &self.items {
            items.record_i32(|w| item.write(w, pool, version));
        }

        let mut sprites = ByteWriter::new();
        sprites.i16(self.sprites.len() as i16);
        for (id, atlas, x, y, w, h) in &self.sprites {
            sprites.record_i16(|s| {
                s.s(pool, id).s(pool, atlas).i32(*x).i32(*y).i32(*w).i32(*h).bool(false);
                if version >= VERSION_BRANCHES {
                    s.bool(false);
                }
            });
        }

        let mut misc = ByteWriter::new();
        misc.i16(self.hit_tests.len() as i16);
        for (id, pixel_width, divisor, pixels) in &self.hit_tests {
            misc.record_i32(|m| {
                m.s(pool, id).i32(0).i32(*pixel_width).u8(*divisor).buffer(pixels);
            });
        }

        let mut strings = ByteWriter::new();
        let table = pool.strings();
        strings.i32(table.len() as i32);
        for s in &table {
            strings.string(s);
        }

        let mut w = ByteWriter::new();
        w.u32(PACKAGE_MAGIC)
            .i32(version)
            .bool(self.compressed)
            .string(&self.id)
            .string(&self.name)
            .bytes(&[0u8; HEADER_RESERVED]);
        w.sections(|s| {
            s.section_bytes(deps.into_bytes())
                .section_bytes(items.into_bytes())
                .section_bytes(sprites.into_bytes());
            if self.hit_tests.is_empty() {
                s.skip_section();
            } else {
                s.section_bytes(misc.into_bytes());
            }
            s.section_bytes(strings.into_bytes());
        });
        w.into_bytes()
    }
}

// ============================================================================
// Component fixture
// ============================================================================

/// Controller record.
#[derive(Debug, Clone, Default)]
pub struct ControllerFixture {
    pub name: String,
    /// (page id, page name)
    pub pages: Vec<(String, String)>,
    pub auto_radio: bool,
    pub home_page: HomePage,
    pub actions: Vec<ActionFixture>,
}

impl ControllerFixture {
    /// Controller whose page ids are `"0".."n"` and names are `names`.
    pub fn new(name: &str, names: &[&str]) -> Self {
        Self {
            name: name.into(),
            pages: names.iter().enumerate().map(|(i, n)| (i.to_string(), n.to_string())).collect(),
            ..Default::default()
        }
    }

    /// Write the controller's section table (without the record prefix).
    pub fn write(&self, w: &mut ByteWriter, pool: &StringPool, version: i32) {
        w.sections(|s| {
            s.section(|w| {
                w.s(pool, &self.name).bool(self.auto_radio);
            });
            s.section(|w| {
                w.i16(self.pages.len() as i16);
                for (id, name) in &self.pages {
                    w.s(pool, id).s(pool, name);
                }
                if version >= VERSION_BRANCHES {
                    match &self.home_page {
                        HomePage::Default => { w.u8(0); }
                        HomePage::Index(i) => { w.u8(1).i16(*i as i16); }
                        HomePage::Branch => { w.u8(2); }
                        HomePage::Var(name) => { w.u8(3).s(pool, name); }
                    }
                }
            });
            s.section(|w| {
                w.i16(self.actions.len() as i16);
                for a in &self.actions {
                    w.record_i16(|w| a.write(w, pool));
                }
            });
        });
    }
}

/// Controller action record.
#[derive(Debug, Clone)]
pub enum ActionFixture {
    PlayTransition { from: Vec<String>, to: Vec<String>, name: String, stop_on_exit: bool },
    ChangePage { from: Vec<String>, to: Vec<String>, object_id: Option<String>, controller: String, target_page: String },
}

impl ActionFixture {
    fn write(&self, w: &mut ByteWriter, pool: &StringPool) {
        let pages = |w: &mut ByteWriter, list: &[String]| {
            w.i16(list.len() as i16);
            for p in list {
                w.s(pool, p);
            }
        };
        match self {
            Self::PlayTransition { from, to, name, stop_on_exit } => {
                w.u8(0);
                pages(w, from.as_slice());
                pages(w, to.as_slice());
                w.s(pool, name).i32(1).f32(0.0).bool(*stop_on_exit);
            }
            Self::ChangePage { from, to, object_id, controller, target_page } => {
                w.u8(1);
                pages(w, from.as_slice());
                pages(w, to.as_slice());
                w.s_opt(pool, object_id.as_deref()).s(pool, controller).s(pool, target_page);
            }
        }
    }
}

/// Gear slot value.
#[derive(Debug, Clone, PartialEq)]
pub enum GearValueFixture {
    XY(i32, i32),
    Size(i32, i32, f32, f32),
    Look(f32, f32, bool, bool),
    Color(Color, Color),
    Animation(bool, i32),
    Str(Option<String>),
    Int(i32),
}

impl GearValueFixture {
    fn write(&self, w: &mut ByteWriter, pool: &StringPool) {
        match self {
            Self::XY(x, y) => { w.i32(*x).i32(*y); }
            Self::Size(width, height, sx, sy) => { w.i32(*width).i32(*height).f32(*sx).f32(*sy); }
            Self::Look(a, r, g, t) => { w.f32(*a).f32(*r).bool(*g).bool(*t); }
            Self::Color(c, s) => { w.color(*c).color(*s); }
            Self::Animation(p, f) => { w.bool(*p).i32(*f); }
            Self::Str(s) => { w.s_opt(pool, s.as_deref()); }
            Self::Int(v) => { w.i32(*v); }
        }
    }
}

/// Gear record.
#[derive(Debug, Clone, Default)]
pub struct GearFixture {
    pub slot: u8,
    pub controller: i16,
    pub values: Vec<(String, GearValueFixture)>,
    pub default: Option<GearValueFixture>,
    /// Page sets of display gears.
    pub pages: Vec<String>,
    /// (ease, duration, delay)
    pub tween: Option<(u8, f32, f32)>,
    pub condition: u8,
    /// Custom ease path points (x, y), written as straight segments.
    pub custom_path: Vec<(f32, f32)>,
    /// Bytes appended after the known fields; readers must skip them.
    pub trailing: Vec<u8>,
}

impl GearFixture {
    pub fn xy(controller: i16, values: &[(&str, i32, i32)], default: Option<(i32, i32)>) -> Self {
        Self {
            slot: 1,
            controller,
            values: values.iter().map(|(p, x, y)| (p.to_string(), GearValueFixture::XY(*x, *y))).collect(),
            default: default.map(|(x, y)| GearValueFixture::XY(x, y)),
            ..Default::default()
        }
    }

    pub fn display(controller: i16, pages: &[&str]) -> Self {
        Self {
            slot: 0,
            controller,
            pages: pages.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn display2(controller: i16, pages: &[&str], condition: u8) -> Self {
        Self { slot: 8, condition, ..Self::display(controller, pages) }
    }

    pub fn with_tween(mut self, ease: u8, duration: f32, delay: f32) -> Self {
        self.tween = Some((ease, duration, delay));
        self
    }

    /// Write the gear body, slot byte first.
    pub fn write(&self, w: &mut ByteWriter, pool: &StringPool, version: i32) {
        w.u8(self.slot).i16(self.controller);
        let display = self.slot == 0 || self.slot == 8;
        if display {
            w.i16(self.pages.len() as i16);
            for p in &self.pages {
                w.s(pool, p);
            }
        } else {
            w.i16(self.values.len() as i16);
            for (page, value) in &self.values {
                w.s(pool, page);
                value.write(w, pool);
            }
            match &self.default {
                Some(v) => {
                    w.bool(true);
                    v.write(w, pool);
                }
                None => {
                    w.bool(false);
                }
            }
        }
        match self.tween {
            Some((ease, duration, delay)) => {
                w.bool(true).u8(ease).f32(duration).f32(delay);
            }
            None => {
                w.bool(false);
            }
        }
        if version >= VERSION_BRANCHES {
            if self.slot == 1 {
                w.bool(false);
            } else if self.slot == 8 {
                w.u8(self.condition);
            }
        }
        if version >= VERSION_CUSTOM_EASE && matches!(self.tween, Some((31, _, _))) {
            w.i32(self.custom_path.len() as i32);
            for (x, y) in &self.custom_path {
                w.u8(3).f32(*x).f32(*y);
            }
        }
        if version >= VERSION_ANIMATION_EXT && self.slot == 5 {
            for (page, _) in &self.values {
                w.s(pool, page).s_opt(pool, None).s_opt(pool, None);
            }
            w.bool(false);
        }
        w.bytes(&self.trailing);
    }
}

/// Relation record: target index (-1 for parent) and (type, percent) defs.
#[derive(Debug, Clone, Default)]
pub struct RelationFixture {
    pub target: i16,
    pub defs: Vec<(u8, bool)>,
}

impl RelationFixture {
    pub fn new(target: i16, defs: &[(u8, bool)]) -> Self {
        Self { target, defs: defs.to_vec() }
    }
}

fn write_relations(w: &mut ByteWriter, relations: &[RelationFixture]) {
    w.u8(relations.len() as u8);
    for r in relations {
        w.i16(r.target).u8(r.defs.len() as u8);
        for (t, p) in &r.defs {
            w.u8(*t).bool(*p);
        }
    }
}

/// Child record.
#[derive(Debug, Clone)]
pub struct ChildFixture {
    pub object_type: u8,
    pub src: Option<String>,
    pub pkg: Option<String>,
    pub id: String,
    pub name: String,
    pub xy: (i32, i32),
    pub size: Option<(i32, i32)>,
    pub scale: Option<(f32, f32)>,
    pub alpha: f32,
    pub rotation: f32,
    pub visible: bool,
    pub touchable: bool,
    pub grayed: bool,
    pub gears: Vec<GearFixture>,
    pub relations: Vec<RelationFixture>,
    /// Controller page overrides for component children: (controller, page id).
    pub overrides: Vec<(String, String)>,
    /// Property overrides for component children: (path, property id, value).
    pub properties: Vec<(String, i16, String)>,
    /// Bytes appended after the basic section; readers must skip them.
    pub trailing: Vec<u8>,
}

impl ChildFixture {
    /// Plain graph child with an explicit size.
    pub fn graph(id: &str, name: &str, xy: (i32, i32), size: (i32, i32)) -> Self {
        Self {
            object_type: 3,
            src: None,
            pkg: None,
            id: id.into(),
            name: name.into(),
            xy,
            size: Some(size),
            scale: None,
            alpha: 1.0,
            rotation: 0.0,
            visible: true,
            touchable: true,
            grayed: false,
            gears: Vec::new(),
            relations: Vec::new(),
            overrides: Vec::new(),
            properties: Vec::new(),
            trailing: Vec::new(),
        }
    }

    /// Child instantiated from a package item.
    pub fn from_item(object_type: u8, src: &str, id: &str, name: &str, xy: (i32, i32)) -> Self {
        Self {
            object_type,
            src: Some(src.into()),
            size: None,
            ..Self::graph(id, name, xy, (0, 0))
        }
    }

    pub fn gear(mut self, gear: GearFixture) -> Self {
        self.gears.push(gear);
        self
    }

    pub fn relation(mut self, relation: RelationFixture) -> Self {
        self.relations.push(relation);
        self
    }

    /// Write the child block's section table.
    pub fn write(&self, w: &mut ByteWriter, pool: &StringPool, version: i32) {
        w.sections(|s| {
            s.section(|w| {
                w.u8(self.object_type)
                    .s_opt(pool, self.src.as_deref())
                    .s_opt(pool, self.pkg.as_deref())
                    .s(pool, &self.id)
                    .s(pool, &self.name)
                    .i32(self.xy.0)
                    .i32(self.xy.1);
                match self.size {
                    Some((width, height)) => { w.bool(true).i32(width).i32(height); }
                    None => { w.bool(false); }
                }
                w.bool(false);
                match self.scale {
                    Some((sx, sy)) => { w.bool(true).f32(sx).f32(sy); }
                    None => { w.bool(false); }
                }
                w.bool(false).bool(false);
                w.f32(self.alpha)
                    .f32(self.rotation)
                    .bool(self.visible)
                    .bool(self.touchable)
                    .bool(self.grayed)
                    .u8(0)
                    .u8(0)
                    .s_opt(pool, None)
                    .bytes(&self.trailing);
            });
            s.section(|w| {
                w.s_opt(pool, None).i16(-1);
            });
            s.section(|w| {
                w.i16(self.gears.len() as i16);
                for g in &self.gears {
                    w.record_i16(|w| g.write(w, pool, version));
                }
            });
            s.section(|w| write_relations(w, &self.relations));
            s.section(|w| {
                w.i16(-1).i16(self.overrides.len() as i16);
                for (c, p) in &self.overrides {
                    w.s(pool, c).s(pool, p);
                }
                if version >= VERSION_BRANCHES {
                    w.i16(self.properties.len() as i16);
                    for (path, prop, value) in &self.properties {
                        w.s(pool, path).i16(*prop).s(pool, value);
                    }
                }
            });
        });
    }
}

/// Component payload.
#[derive(Debug, Clone, Default)]
pub struct ComponentFixture {
    pub width: i32,
    pub height: i32,
    pub pivot: Option<(f32, f32, bool)>,
    pub margin: Option<[i32; 4]>,
    pub overflow: u8,
    pub controllers: Vec<ControllerFixture>,
    pub children: Vec<ChildFixture>,
    pub relations: Vec<RelationFixture>,
    pub opaque: bool,
    pub transitions: Vec<String>,
    pub extension: Option<Vec<u8>>,
}

impl ComponentFixture {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height, opaque: true, ..Default::default() }
    }

    pub fn controller(mut self, c: ControllerFixture) -> Self {
        self.controllers.push(c);
        self
    }

    pub fn child(mut self, c: ChildFixture) -> Self {
        self.children.push(c);
        self
    }

    /// Encode the component payload.
    pub fn encode(&self, pool: &StringPool, version: i32) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.sections(|s| {
            s.section(|w| {
                w.i32(self.width).i32(self.height).bool(false);
                match self.pivot {
                    Some((x, y, anchor)) => { w.bool(true).f32(x).f32(y).bool(anchor); }
                    None => { w.bool(false); }
                }
                match self.margin {
                    Some(m) => { w.bool(true).i32(m[0]).i32(m[1]).i32(m[2]).i32(m[3]); }
                    None => { w.bool(false); }
                }
                w.u8(self.overflow).bool(false);
            });
            s.section(|w| {
                w.i16(self.controllers.len() as i16);
                for c in &self.controllers {
                    w.record_i16(|w| c.write(w, pool, version));
                }
            });
            s.section(|w| {
                w.i16(self.children.len() as i16);
                for c in &self.children {
                    w.record_i16(|w| c.write(w, pool, version));
                }
            });
            s.section(|w| write_relations(w, &self.relations));
            s.section(|w| {
                w.i16(0).bool(self.opaque).i16(-1).s_opt(pool, None).i32(0).i32(0);
            });
            s.section(|w| {
                w.i16(self.transitions.len() as i16);
                for name in &self.transitions {
                    w.record_i16(|w| {
                        w.s(pool, name).i32(0).bool(false);
                    });
                }
            });
            match &self.extension {
                Some(ext) => { s.section_bytes(ext.clone()); }
                None => { s.skip_section(); }
            }
            if self.overflow == 2 {
                s.section(|w| {
                    w.u8(2).u8(1).i32(0).bool(false);
                    for _ in 0..4 {
                        w.s_opt(pool, None);
                    }
                });
            }
        });
        w.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_interns_and_sentinels() {
        let pool = StringPool::new();
        assert_eq!(pool.id("a"), 0);
        assert_eq!(pool.id("b"), 1);
        assert_eq!(pool.id("a"), 0);
        assert_eq!(pool.id(""), STRING_REF_EMPTY);
        assert_eq!(pool.opt(None), STRING_REF_NULL);
        assert_eq!(pool.strings(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_sections_layout() {
        let mut w = ByteWriter::new();
        w.sections(|s| {
            s.skip_section().section(|w| { w.u8(7); });
        });
        let b = w.into_bytes();
        assert_eq!(&b[..2], &[2, 0]);
        assert_eq!(&b[2..6], &[0, 0, 0, 0]);
        assert_eq!(&b[6..10], &10i32.to_be_bytes());
        assert_eq!(b[10], 7);
    }
}
