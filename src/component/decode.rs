//! Component payload decoder.

use tracing::{debug, trace};

use super::*;
use crate::binary::format::{child_section, component_section, VERSION_BRANCHES};
use crate::binary::Cursor;
use crate::util::{Error, Result};

/// Treat a truncated optional section as absent.
fn optional<T>(what: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(Error::Truncated { pos, .. }) => {
            debug!("{} is short at {}, treating as absent", what, pos);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Read an i16 count of i16 length-prefixed records, handing each record a
/// cursor bounded to it. A short record is skipped; the next one still
/// starts at the recorded position.
fn read_records<T>(
    cur: &mut Cursor<'_>,
    what: &str,
    mut read: impl FnMut(&mut Cursor<'_>) -> Result<Option<T>>,
) -> Result<Vec<T>> {
    let count = cur.read_i16()?.max(0) as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let next = cur.record_end_i16()?;
        let mut record = cur.sub_cursor(next)?;
        if let Some(Some(v)) = optional(what, read(&mut record))? {
            out.push(v);
        }
        cur.set_pos(next)?;
    }
    Ok(out)
}

fn read_vec2_i32(cur: &mut Cursor<'_>) -> Result<Vec2> {
    let x = cur.read_i32()?;
    let y = cur.read_i32()?;
    Ok(Vec2::new(x as f32, y as f32))
}

fn read_vec2_f32(cur: &mut Cursor<'_>) -> Result<Vec2> {
    Ok(Vec2::new(cur.read_f32()?, cur.read_f32()?))
}

fn read_size_limits(cur: &mut Cursor<'_>) -> Result<SizeLimits> {
    let min_w = cur.read_i32()? as f32;
    let max_w = cur.read_i32()? as f32;
    let min_h = cur.read_i32()? as f32;
    let max_h = cur.read_i32()? as f32;
    Ok(SizeLimits { min: Vec2::new(min_w, min_h), max: Vec2::new(max_w, max_h) })
}

fn read_margin(cur: &mut Cursor<'_>) -> Result<Margin> {
    Ok(Margin {
        top: cur.read_i32()?,
        bottom: cur.read_i32()?,
        left: cur.read_i32()?,
        right: cur.read_i32()?,
    })
}

impl ComponentData {
    /// Decode a component payload. The cursor covers the item payload and
    /// sits on its section table.
    pub fn decode(cur: &mut Cursor<'_>, object_type: ObjectType) -> Result<Self> {
        let mut data = ComponentData::default();

        if cur.seek_section(0, component_section::GEOMETRY)? {
            optional("component geometry", data.read_geometry(cur))?;
        }

        if cur.seek_section(0, component_section::CONTROLLERS)? {
            data.controllers = optional("controllers", read_records(cur, "controller", |r| {
                ControllerData::read(r).map(Some)
            }))?
            .unwrap_or_default();
        }

        if cur.seek_section(0, component_section::CHILDREN)? {
            data.children = optional("children", read_records(cur, "child", |r| {
                read_child(r).map(Some)
            }))?
            .unwrap_or_default();
        }

        if cur.seek_section(0, component_section::RELATIONS)? {
            data.relations = optional("relations", read_relations(cur))?.unwrap_or_default();
        }

        if cur.seek_section(0, component_section::HIT_TEST)? {
            optional("hit test", data.read_hit_test(cur))?;
        }

        if cur.seek_section(0, component_section::TRANSITIONS)? {
            data.transitions = optional("transitions", read_records(cur, "transition", |r| {
                let name = r.read_s_owned()?.unwrap_or_default();
                Ok(Some(TransitionData { name, range: r.range(0, r.len()) }))
            }))?
            .unwrap_or_default();
        }

        if object_type != ObjectType::Component {
            data.extension = cur
                .section_range(0, component_section::EXTENSION)?
                .map(|range| ExtensionData { object_type, range });
        }

        if data.overflow == Overflow::Scroll && cur.seek_section(0, component_section::SCROLL)? {
            data.scroll = optional("scroll", read_scroll(cur))?;
        }

        data.tree_nodes = cur.section_range(0, component_section::TREE_NODES)?;

        debug!(
            "component decoded: {} children, {} controllers, {} transitions",
            data.children.len(),
            data.controllers.len(),
            data.transitions.len()
        );
        Ok(data)
    }

    fn read_geometry(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        self.source_size = read_vec2_i32(cur)?;
        self.init_size = self.source_size;
        if cur.read_bool()? {
            self.size_limits = Some(read_size_limits(cur)?);
        }
        if cur.read_bool()? {
            self.pivot = read_vec2_f32(cur)?;
            self.pivot_as_anchor = cur.read_bool()?;
        }
        if cur.read_bool()? {
            self.margin = read_margin(cur)?;
        }
        self.overflow = Overflow::from_u8(cur.read_u8()?);
        if cur.read_bool()? {
            self.clip_softness = Some(IVec2::new(cur.read_i32()?, cur.read_i32()?));
        }
        Ok(())
    }

    fn read_hit_test(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        cur.skip(2)?;
        self.opaque = cur.read_bool()?;
        let mask = cur.read_i16()?;
        if mask != -1 {
            let reversed = cur.read_bool()?;
            if mask >= 0 {
                self.mask = Some(MaskData { child: mask as usize, reversed });
            }
        }
        let item = cur.read_s_owned()?;
        let pos = IVec2::new(cur.read_i32()?, cur.read_i32()?);
        self.hit_test = item.map(|item_id| HitTestData { item_id, pos });
        Ok(())
    }
}

fn read_scroll(cur: &mut Cursor<'_>) -> Result<ScrollConfig> {
    let scroll_type = cur.read_u8()?;
    let scroll_bar_display = cur.read_u8()?;
    let flags = cur.read_i32()?;
    let margin = if cur.read_bool()? { Some(read_margin(cur)?) } else { None };
    Ok(ScrollConfig {
        scroll_type,
        scroll_bar_display,
        flags,
        margin,
        vt_scroll_bar: cur.read_s_owned()?,
        hz_scroll_bar: cur.read_s_owned()?,
        header: cur.read_s_owned()?,
        footer: cur.read_s_owned()?,
    })
}

/// Decode one child block; the cursor is bounded to the block.
fn read_child(cur: &mut Cursor<'_>) -> Result<ComponentChild> {
    let block = cur.range(0, cur.len());
    if !cur.seek_section(0, child_section::BASIC)? {
        return Err(Error::invalid("child block has no basic section"));
    }
    let raw = cur.read_u8()?;
    let object_type = ObjectType::from_u8(raw)
        .ok_or_else(|| Error::invalid(format!("unknown object type {}", raw)))?;
    let mut child = ComponentChild::new(object_type, block);
    read_basic(cur, &mut child)?;

    if cur.seek_section(0, child_section::AFTER_ADD)? {
        optional("child tooltips", (|| {
            child.tooltips = cur.read_s_owned()?;
            let group = cur.read_i16()?;
            child.group = (group >= 0).then_some(group as usize);
            Ok(())
        })())?;
    }

    if cur.seek_section(0, child_section::GEARS)? {
        child.gears = optional("gears", read_records(cur, "gear", |r| {
            let raw = r.read_u8()?;
            match GearSlot::from_u8(raw) {
                Some(slot) => GearData::read(slot, r).map(Some),
                None => {
                    debug!("skipping unknown gear slot {}", raw);
                    Ok(None)
                }
            }
        }))?
        .unwrap_or_default();
    }

    if cur.seek_section(0, child_section::RELATIONS)? {
        child.relations = optional("child relations", read_relations(cur))?.unwrap_or_default();
    }

    if object_type.is_component() && cur.seek_section(0, child_section::INSTANCE)? {
        optional("instance overrides", read_instance(cur, &mut child))?;
    }

    trace!("child {} ({:?}) decoded", child.name, child.object_type);
    Ok(child)
}

fn read_basic(cur: &mut Cursor<'_>, child: &mut ComponentChild) -> Result<()> {
    child.src = cur.read_s_owned()?;
    child.pkg = cur.read_s_owned()?;
    child.id = cur.read_s_owned()?.unwrap_or_default();
    child.name = cur.read_s_owned()?.unwrap_or_default();
    child.xy = read_vec2_i32(cur)?;
    if cur.read_bool()? {
        child.size = Some(read_vec2_i32(cur)?);
    }
    if cur.read_bool()? {
        child.size_limits = Some(read_size_limits(cur)?);
    }
    if cur.read_bool()? {
        child.scale = read_vec2_f32(cur)?;
    }
    if cur.read_bool()? {
        child.skew = read_vec2_f32(cur)?;
    }
    if cur.read_bool()? {
        let pivot = read_vec2_f32(cur)?;
        child.pivot = Some((pivot, cur.read_bool()?));
    }
    child.alpha = cur.read_f32()?;
    child.rotation = cur.read_f32()?;
    child.visible = cur.read_bool()?;
    child.touchable = cur.read_bool()?;
    child.grayed = cur.read_bool()?;
    child.blend_mode = cur.read_u8()?;
    if cur.read_u8()? == 1 {
        child.color_filter = Some([cur.read_f32()?, cur.read_f32()?, cur.read_f32()?, cur.read_f32()?]);
    }
    child.data = cur.read_s_owned()?;
    Ok(())
}

fn read_instance(cur: &mut Cursor<'_>, child: &mut ComponentChild) -> Result<()> {
    let page_controller = cur.read_i16()?;
    child.page_controller = (page_controller >= 0).then_some(page_controller as usize);

    let count = cur.read_i16()?.max(0);
    for _ in 0..count {
        let controller = cur.read_s_owned()?;
        let page = cur.read_s_owned()?;
        if let (Some(c), Some(p)) = (controller, page) {
            child.controller_overrides.push((c, p));
        }
    }

    if cur.version() >= VERSION_BRANCHES {
        let count = cur.read_i16()?.max(0);
        for _ in 0..count {
            let path = cur.read_s_owned()?.unwrap_or_default();
            let property = cur.read_i16()?;
            let value = cur.read_s_owned()?;
            child.property_overrides.push(PropertyOverride { path, property, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        ChildFixture, ComponentFixture, ControllerFixture, GearFixture, RelationFixture, StringPool,
    };

    fn decode(fixture: &ComponentFixture, version: i32, object_type: ObjectType) -> (ComponentData, Vec<u8>) {
        let pool = StringPool::new();
        let bytes = fixture.encode(&pool, version);
        let strings = pool.strings();
        let mut cur = Cursor::new(&bytes).with_strings(&strings).with_version(version);
        (ComponentData::decode(&mut cur, object_type).unwrap(), bytes)
    }

    #[test]
    fn test_geometry_and_children() {
        let mut fixture = ComponentFixture::new(200, 100)
            .child(ChildFixture::graph("n0", "bg", (0, 0), (200, 100)))
            .child(ChildFixture::graph("n1", "icon", (10, 20), (32, 32)));
        fixture.pivot = Some((0.5, 0.5, true));
        fixture.margin = Some([1, 2, 3, 4]);
        let (data, _) = decode(&fixture, 2, ObjectType::Component);

        assert_eq!(data.source_size, Vec2::new(200.0, 100.0));
        assert_eq!(data.init_size, data.source_size);
        assert_eq!(data.pivot, Vec2::splat(0.5));
        assert!(data.pivot_as_anchor);
        assert_eq!(data.margin, Margin { top: 1, bottom: 2, left: 3, right: 4 });
        assert!(data.opaque);
        assert_eq!(data.children.len(), 2);
        let icon = data.child_by_name("icon").unwrap();
        assert_eq!(icon.id, "n1");
        assert_eq!(icon.xy, Vec2::new(10.0, 20.0));
        assert_eq!(icon.size, Some(Vec2::new(32.0, 32.0)));
        assert_eq!(icon.object_type, ObjectType::Graph);
    }

    #[test]
    fn test_trailing_bytes_in_records_are_skipped() {
        let mut first = ChildFixture::graph("n0", "a", (1, 2), (3, 4));
        first.trailing = vec![0xAA; 13];
        let mut gear = GearFixture::xy(0, &[("0", 5, 5)], None);
        gear.trailing = vec![0xBB; 7];
        let first = first.gear(gear);
        let fixture = ComponentFixture::new(10, 10)
            .controller(ControllerFixture::new("c", &["p0", "p1"]))
            .child(first)
            .child(ChildFixture::graph("n1", "b", (6, 7), (8, 9)));
        let (data, _) = decode(&fixture, 2, ObjectType::Component);

        assert_eq!(data.children.len(), 2);
        assert_eq!(data.children[0].gears.len(), 1);
        assert_eq!(data.children[1].name, "b");
        assert_eq!(data.children[1].xy, Vec2::new(6.0, 7.0));
    }

    #[test]
    fn test_child_blocks_do_not_overlap() {
        let fixture = ComponentFixture::new(10, 10)
            .child(ChildFixture::graph("n0", "a", (0, 0), (1, 1)))
            .child(ChildFixture::graph("n1", "b", (0, 0), (1, 1)))
            .child(ChildFixture::graph("n2", "c", (0, 0), (1, 1)));
        let (data, bytes) = decode(&fixture, 2, ObjectType::Component);

        for (i, a) in data.children.iter().enumerate() {
            assert!(a.block.end() <= bytes.len());
            for b in &data.children[i + 1..] {
                assert!(!a.block.overlaps(&b.block));
            }
        }
    }

    #[test]
    fn test_relations_and_overrides() {
        let mut button = ChildFixture::from_item(12, "btn", "n1", "button", (0, 0))
            .relation(RelationFixture::new(-1, &[(6, false), (14, true)]));
        button.overrides.push(("state".into(), "1".into()));
        button.properties.push(("title".into(), 0, "Go".into()));
        let mut fixture = ComponentFixture::new(10, 10).child(button);
        fixture.relations.push(RelationFixture::new(-1, &[(24, false)]));
        let (data, _) = decode(&fixture, 2, ObjectType::Component);

        assert_eq!(data.relations.len(), 1);
        let child = &data.children[0];
        assert_eq!(child.object_type, ObjectType::Button);
        assert_eq!(child.src.as_deref(), Some("btn"));
        assert_eq!(child.relations[0].defs.len(), 2);
        assert_eq!(child.controller_overrides, vec![("state".to_string(), "1".to_string())]);
        assert_eq!(child.property_overrides[0].value.as_deref(), Some("Go"));
        assert_eq!(child.page_controller, None);
    }

    #[test]
    fn test_transitions_extension_and_scroll() {
        let mut fixture = ComponentFixture::new(10, 10);
        fixture.transitions = vec!["t0".into(), "t1".into()];
        fixture.extension = Some(vec![1, 2, 3, 4, 5]);
        fixture.overflow = 2;
        let (data, bytes) = decode(&fixture, 2, ObjectType::Button);

        assert_eq!(data.overflow, Overflow::Scroll);
        let names: Vec<_> = data.transitions.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["t0", "t1"]);
        let ext = data.extension.unwrap();
        assert_eq!(ext.object_type, ObjectType::Button);
        assert_eq!(ext.range.slice(&bytes).unwrap(), &[1, 2, 3, 4, 5]);
        let scroll = data.scroll.unwrap();
        assert_eq!(scroll.scroll_type, 2);
        assert_eq!(scroll.scroll_bar_display, 1);
        assert_eq!(data.tree_nodes, None);
    }

    #[test]
    fn test_missing_sections_are_absent() {
        let mut w = crate::fixture::ByteWriter::new();
        w.sections(|s| {
            s.section(|w| {
                w.i32(50).i32(60);
            });
        });
        let bytes = w.into_bytes();
        let mut cur = Cursor::new(&bytes);
        let data = ComponentData::decode(&mut cur, ObjectType::Component).unwrap();
        assert_eq!(data.source_size, Vec2::new(50.0, 60.0));
        assert!(data.children.is_empty());
        assert!(data.controllers.is_empty());
        assert!(!data.opaque);
    }
}
