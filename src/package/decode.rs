//! Package header and segment decoding.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use super::*;
use crate::binary::format::{segment, HEADER_RESERVED, PACKAGE_MAGIC, VERSION_BRANCHES};

/// Everything decoded from the top level, before items are tied to the
/// package they live in.
#[derive(Default)]
struct Parts {
    id: String,
    name: String,
    version: i32,
    dependencies: Vec<Dependency>,
    branches: Vec<String>,
    branch_index: Option<usize>,
    strings: Vec<String>,
    items: Vec<PackageItem>,
    items_by_id: HashMap<String, usize>,
    items_by_name: HashMap<String, usize>,
    sprites: HashMap<String, Sprite>,
    hit_tests: HashMap<String, PixelHitTestData>,
}

impl Package {
    /// Decode a package buffer.
    ///
    /// Only the top level is decoded here; item payloads are decoded on
    /// first access. Any truncation in the top level fails the whole call.
    #[tracing::instrument(skip_all, fields(len = data.len()))]
    pub fn decode(data: Vec<u8>, config: &Config) -> Result<Arc<Self>> {
        let parts = Parts::read(&data, config)?;
        debug!(
            "package {} ({}) v{}: {} items, {} sprites, {} strings",
            parts.name,
            parts.id,
            parts.version,
            parts.items.len(),
            parts.sprites.len(),
            parts.strings.len()
        );

        Ok(Arc::new_cyclic(|weak| Package {
            id: parts.id,
            name: parts.name,
            version: parts.version,
            dependencies: parts.dependencies,
            branches: parts.branches,
            branch_index: parts.branch_index,
            strings: parts.strings,
            items: parts
                .items
                .into_iter()
                .map(|mut item| {
                    item.package = weak.clone();
                    Arc::new(item)
                })
                .collect(),
            items_by_id: parts.items_by_id,
            items_by_name: parts.items_by_name,
            sprites: parts.sprites,
            hit_tests: parts.hit_tests,
            data,
        }))
    }
}

impl Parts {
    fn read(data: &[u8], config: &Config) -> Result<Self> {
        let mut parts = Parts::default();
        let mut cur = Cursor::new(data);

        if cur.read_u32()? != PACKAGE_MAGIC {
            return Err(Error::InvalidSignature);
        }
        parts.version = cur.read_i32()?;
        let compressed = cur.read_bool()?;
        parts.id = cur.read_string()?;
        parts.name = cur.read_string()?;
        cur.skip(HEADER_RESERVED)?;
        if compressed {
            return Err(Error::CompressedUnsupported);
        }
        let table = cur.pos();

        // Strings come first: every other segment refers to them.
        if cur.seek_section(table, segment::STRING_TABLE)? {
            let count = cur.read_i32()?.max(0) as usize;
            parts.strings.reserve(count);
            for _ in 0..count {
                parts.strings.push(cur.read_string()?);
            }
        }
        if cur.seek_section(table, segment::CUSTOM_STRINGS)? {
            let count = cur.read_i32()?.max(0);
            for _ in 0..count {
                let index = cur.read_u16()? as usize;
                let len = cur.read_i32()?.max(0) as usize;
                let value = cur.read_string_len(len)?;
                match parts.strings.get_mut(index) {
                    Some(s) => *s = value,
                    None => debug!("custom string {} outside string table", index),
                }
            }
        }

        let strings = std::mem::take(&mut parts.strings);
        let mut cur = cur.with_strings(&strings).with_version(parts.version);

        if cur.seek_section(table, segment::DEPENDENCIES)? {
            parts.read_dependencies(&mut cur, config)?;
        }
        if cur.seek_section(table, segment::ITEMS)? {
            parts.read_items(&mut cur)?;
        }
        if cur.seek_section(table, segment::SPRITES)? {
            parts.read_sprites(&mut cur)?;
        }
        if cur.seek_section(table, segment::MISC)? {
            parts.read_misc(&mut cur)?;
        }

        parts.strings = strings;
        Ok(parts)
    }

    fn read_dependencies(&mut self, cur: &mut Cursor<'_>, config: &Config) -> Result<()> {
        let count = cur.read_i16()?.max(0);
        for _ in 0..count {
            let id = cur.read_s_owned()?.unwrap_or_default();
            let name = cur.read_s_owned()?.unwrap_or_default();
            self.dependencies.push(Dependency { id, name });
        }

        if cur.version() >= VERSION_BRANCHES {
            let count = cur.read_i16()?.max(0) as usize;
            self.branches = cur.read_s_array(count)?.into_iter().map(Option::unwrap_or_default).collect();
            self.branch_index = config
                .branch
                .as_deref()
                .and_then(|b| self.branches.iter().position(|x| x == b));
        }
        Ok(())
    }

    fn read_items(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let count = cur.read_i16()?.max(0);
        for _ in 0..count {
            let next = cur.record_end_i32()?;
            let item = self.read_item(cur)?;
            trace!("item {} {:?} '{}'", item.id, item.item_type, item.name);

            let index = self.items.len();
            self.items_by_id.insert(item.id.clone(), index);
            self.items_by_name.insert(item.name.clone(), index);
            self.items.push(item);
            cur.set_pos(next)?;
        }
        Ok(())
    }

    fn read_item(&mut self, cur: &mut Cursor<'_>) -> Result<PackageItem> {
        let mut item = PackageItem::new(PackageItemType::from_u8(cur.read_u8()?));
        item.id = cur.read_s_owned()?.unwrap_or_default();
        item.name = cur.read_s_owned()?.unwrap_or_default();
        let _path = cur.read_s()?;
        item.file = cur.read_s_owned()?.filter(|f| !f.is_empty());
        item.exported = cur.read_bool()?;
        item.width = cur.read_i32()?;
        item.height = cur.read_i32()?;

        match item.item_type {
            PackageItemType::Image => {
                item.object_type = Some(ObjectType::Image);
                let mut image = ImageOptions::default();
                match cur.read_u8()? {
                    1 => {
                        let x = cur.read_i32()? as f32;
                        let y = cur.read_i32()? as f32;
                        let w = cur.read_i32()? as f32;
                        let h = cur.read_i32()? as f32;
                        image.scale9_grid = Some(Rect::new(x, y, w, h));
                        image.tile_grid_index = cur.read_i32()?;
                    }
                    2 => image.scale_by_tile = true,
                    _ => {}
                }
                image.smoothing = cur.read_bool()?;
                item.smoothing = image.smoothing;
                item.image = Some(image);
            }
            PackageItemType::MovieClip => {
                item.object_type = Some(ObjectType::MovieClip);
                item.smoothing = cur.read_bool()?;
                item.range = cur.read_buffer()?;
            }
            PackageItemType::Font => {
                item.range = cur.read_buffer()?;
            }
            PackageItemType::Component => {
                let extension = cur.read_u8()?;
                item.object_type = Some(if extension > 0 {
                    ObjectType::from_u8(extension).unwrap_or(ObjectType::Component)
                } else {
                    ObjectType::Component
                });
                item.range = cur.read_buffer()?;
            }
            PackageItemType::Swf => item.object_type = Some(ObjectType::Swf),
            PackageItemType::Spine | PackageItemType::DragonBones => {
                item.object_type = Some(ObjectType::Loader3D);
                item.skeleton_anchor = Some(Vec2::new(cur.read_f32()?, cur.read_f32()?));
            }
            _ => {}
        }

        if cur.version() >= VERSION_BRANCHES {
            if let Some(branch) = cur.read_s()? {
                item.name = format!("{}/{}", branch, item.name);
            }
            let branch_count = cur.read_u8()? as usize;
            if branch_count > 0 {
                if self.branches.is_empty() {
                    if let Some(alias) = cur.read_s_owned()? {
                        self.items_by_id.insert(alias, self.items.len());
                    }
                } else {
                    item.branches = cur.read_s_array(branch_count)?.into_iter().map(Option::unwrap_or_default).collect();
                }
            }
            let high_res = cur.read_u8()? as usize;
            if high_res > 0 {
                item.high_resolution = cur.read_s_array(high_res)?.into_iter().map(Option::unwrap_or_default).collect();
            }
        }
        Ok(item)
    }

    fn read_sprites(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let count = cur.read_i16()?.max(0);
        for _ in 0..count {
            let next = cur.record_end_i16()?;
            let id = cur.read_s_owned()?.unwrap_or_default();
            let atlas = cur.read_s_owned()?.unwrap_or_default();
            let x = cur.read_i32()? as f32;
            let y = cur.read_i32()? as f32;
            let w = cur.read_i32()? as f32;
            let h = cur.read_i32()? as f32;
            let rect = Rect::new(x, y, w, h);
            let rotated = cur.read_bool()?;
            let (offset, original_size) = if cur.version() >= VERSION_BRANCHES && cur.read_bool()? {
                let offset = Vec2::new(cur.read_i32()? as f32, cur.read_i32()? as f32);
                let size = Vec2::new(cur.read_i32()? as f32, cur.read_i32()? as f32);
                (offset, size)
            } else {
                (Vec2::ZERO, rect.size())
            };
            self.sprites.insert(id, Sprite { atlas, rect, rotated, offset, original_size });
            cur.set_pos(next)?;
        }
        Ok(())
    }

    fn read_misc(&mut self, cur: &mut Cursor<'_>) -> Result<()> {
        let count = cur.read_i16()?.max(0);
        for _ in 0..count {
            let next = cur.record_end_i32()?;
            let id = cur.read_s_owned()?.unwrap_or_default();
            cur.skip(4)?;
            let pixel_width = cur.read_i32()?;
            let divisor = cur.read_u8()?.max(1);
            let pixels = cur.read_buffer()?;
            self.hit_tests.insert(id, PixelHitTestData { pixel_width, scale: 1.0 / divisor as f32, pixels });
            cur.set_pos(next)?;
        }
        Ok(())
    }
}
