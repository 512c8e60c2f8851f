//! Gear records: per-object property bindings keyed by controller page.

use tracing::debug;

use crate::binary::Cursor;
use crate::binary::format::{VERSION_ANIMATION_EXT, VERSION_BRANCHES, VERSION_CUSTOM_EASE};
use crate::engine::{EaseType, PathPoint};
use crate::util::{Color, Result, Vec2};

/// Property slot a gear drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GearSlot {
    Display = 0,
    XY = 1,
    Size = 2,
    Look = 3,
    Color = 4,
    Animation = 5,
    Text = 6,
    Icon = 7,
    Display2 = 8,
    FontSize = 9,
}

impl GearSlot {
    /// Number of slots.
    pub const COUNT: usize = 10;

    /// All slots in application order.
    pub const ALL: [GearSlot; Self::COUNT] = [
        Self::Display, Self::XY, Self::Size, Self::Look, Self::Color,
        Self::Animation, Self::Text, Self::Icon, Self::Display2, Self::FontSize,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display and Display2 carry page sets instead of values.
    #[inline]
    pub fn is_display(self) -> bool {
        matches!(self, Self::Display | Self::Display2)
    }
}

/// Value stored by a gear for one page.
#[derive(Clone, Debug, PartialEq)]
pub enum GearValue {
    XY(Vec2),
    Size { size: Vec2, scale: Vec2 },
    Look { alpha: f32, rotation: f32, grayed: bool, touchable: bool },
    Color { color: Color, stroke: Color },
    Animation { playing: bool, frame: i32 },
    Text(Option<String>),
    Icon(Option<String>),
    FontSize(i32),
}

impl GearValue {
    fn read(slot: GearSlot, cur: &mut Cursor<'_>) -> Result<Option<Self>> {
        Ok(Some(match slot {
            GearSlot::XY => {
                let x = cur.read_i32()?;
                let y = cur.read_i32()?;
                Self::XY(Vec2::new(x as f32, y as f32))
            }
            GearSlot::Size => {
                let w = cur.read_i32()?;
                let h = cur.read_i32()?;
                let sx = cur.read_f32()?;
                let sy = cur.read_f32()?;
                Self::Size { size: Vec2::new(w as f32, h as f32), scale: Vec2::new(sx, sy) }
            }
            GearSlot::Look => Self::Look {
                alpha: cur.read_f32()?,
                rotation: cur.read_f32()?,
                grayed: cur.read_bool()?,
                touchable: cur.read_bool()?,
            },
            GearSlot::Color => Self::Color { color: cur.read_color()?, stroke: cur.read_color()? },
            GearSlot::Animation => Self::Animation { playing: cur.read_bool()?, frame: cur.read_i32()? },
            GearSlot::Text => Self::Text(cur.read_s_owned()?),
            GearSlot::Icon => Self::Icon(cur.read_s_owned()?),
            GearSlot::FontSize => Self::FontSize(cur.read_i32()?),
            GearSlot::Display | GearSlot::Display2 => return Ok(None),
        }))
    }
}

/// Tween settings of a gear.
#[derive(Clone, Debug, PartialEq)]
pub struct TweenConfig {
    pub ease: EaseType,
    pub duration: f32,
    pub delay: f32,
    /// Control path for [`EaseType::Custom`].
    pub custom_path: Vec<PathPoint>,
}

/// Animation name/skin pair stored by animation gears.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationExt {
    pub animation: Option<String>,
    pub skin: Option<String>,
}

/// Decoded gear record.
#[derive(Clone, Debug, PartialEq)]
pub struct GearData {
    pub slot: GearSlot,
    /// Index into the parent component's controllers.
    pub controller: i16,
    /// Values keyed by page id, in authored order.
    pub values: Vec<(String, GearValue)>,
    pub default: Option<GearValue>,
    /// Page ids for Display/Display2 gears.
    pub pages: Vec<String>,
    /// Display2 combinator: 0 = AND, anything else = OR.
    pub condition: u8,
    pub tween: Option<TweenConfig>,
    /// XY gear positions as fractions of the parent size.
    pub percent_values: Option<(Vec<(String, Vec2)>, Option<Vec2>)>,
    /// Animation gear name/skin values.
    pub animation_ext: Vec<(String, AnimationExt)>,
    pub animation_ext_default: Option<AnimationExt>,
}

impl GearData {
    fn empty(slot: GearSlot, controller: i16) -> Self {
        Self {
            slot,
            controller,
            values: Vec::new(),
            default: None,
            pages: Vec::new(),
            condition: 0,
            tween: None,
            percent_values: None,
            animation_ext: Vec::new(),
            animation_ext_default: None,
        }
    }

    /// Value for `page_id`, falling back to the default.
    pub fn value(&self, page_id: Option<&str>) -> Option<&GearValue> {
        page_id
            .and_then(|p| self.values.iter().find(|(k, _)| k == p).map(|(_, v)| v))
            .or(self.default.as_ref())
    }

    /// Decode a gear body; the slot byte has already been read.
    pub fn read(slot: GearSlot, cur: &mut Cursor<'_>) -> Result<Self> {
        let controller = cur.read_i16()?;
        let mut gear = Self::empty(slot, controller);
        let count = cur.read_i16()?.max(0) as usize;

        if slot.is_display() {
            gear.pages = cur.read_s_array(count)?.into_iter().flatten().collect();
        } else {
            for _ in 0..count {
                let Some(page) = cur.read_s_owned()? else { continue };
                if let Some(v) = GearValue::read(slot, cur)? {
                    gear.values.push((page, v));
                }
            }
            if cur.read_bool()? {
                gear.default = GearValue::read(slot, cur)?;
            }
        }

        if cur.read_bool()? {
            let ease = EaseType::from_u8(cur.read_u8()?);
            let duration = cur.read_f32()?;
            let delay = cur.read_f32()?;
            gear.tween = Some(TweenConfig { ease, duration, delay, custom_path: Vec::new() });
        }

        if cur.version() >= VERSION_BRANCHES {
            match slot {
                GearSlot::XY => {
                    if cur.read_bool()? {
                        let mut values = Vec::new();
                        for _ in 0..count {
                            let Some(page) = cur.read_s_owned()? else { continue };
                            values.push((page, Vec2::new(cur.read_f32()?, cur.read_f32()?)));
                        }
                        let default = if cur.read_bool()? {
                            Some(Vec2::new(cur.read_f32()?, cur.read_f32()?))
                        } else {
                            None
                        };
                        gear.percent_values = Some((values, default));
                    }
                }
                GearSlot::Display2 => gear.condition = cur.read_u8()?,
                _ => {}
            }
        }

        if cur.version() >= VERSION_CUSTOM_EASE {
            if let Some(tween) = gear.tween.as_mut().filter(|t| t.ease == EaseType::Custom) {
                tween.custom_path = read_path(cur)?;
            }
        }

        if cur.version() >= VERSION_ANIMATION_EXT && slot == GearSlot::Animation {
            for _ in 0..count {
                let Some(page) = cur.read_s_owned()? else { continue };
                let ext = AnimationExt { animation: cur.read_s_owned()?, skin: cur.read_s_owned()? };
                gear.animation_ext.push((page, ext));
            }
            if cur.read_bool()? {
                gear.animation_ext_default = Some(AnimationExt {
                    animation: cur.read_s_owned()?,
                    skin: cur.read_s_owned()?,
                });
            }
        }

        debug!(slot = ?slot, controller, pages = gear.values.len() + gear.pages.len(), "gear decoded");
        Ok(gear)
    }
}

/// Read a path: i32 point count, each point tagged with its curve type.
fn read_path(cur: &mut Cursor<'_>) -> Result<Vec<PathPoint>> {
    let count = cur.read_i32()?.max(0) as usize;
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let curve = cur.read_u8()?;
        let pos = Vec2::new(cur.read_f32()?, cur.read_f32()?);
        match curve {
            // Bezier: one control point
            1 => cur.skip(8)?,
            // Cubic bezier: two control points
            2 => cur.skip(16)?,
            _ => {}
        }
        points.push(PathPoint { pos, curve });
    }
    Ok(points)
}
