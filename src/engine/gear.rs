//! Runtime gears: a gear record bound to a live controller.

use super::tween::{Channels, Tween};
use super::ControllerRef;
use crate::component::{AnimationExt, GearData, GearSlot, GearValue};
use crate::util::{Color, Vec2};

/// Gear attached to one object at one slot.
#[derive(Clone, Debug)]
pub struct Gear {
    data: GearData,
    controller: ControllerRef,
    /// Value used for pages without an entry.
    default: Option<GearValue>,
    pub(crate) tween: Option<Tween>,
}

impl Gear {
    /// Bind `data` to `controller`. `initial` is the owner's value at
    /// attach time, used when the record carries no default.
    pub fn new(data: GearData, controller: ControllerRef, initial: Option<GearValue>) -> Self {
        let default = data.default.clone().or(initial);
        Self { data, controller, default, tween: None }
    }

    pub fn slot(&self) -> GearSlot {
        self.data.slot
    }

    pub fn data(&self) -> &GearData {
        &self.data
    }

    pub fn controller(&self) -> ControllerRef {
        self.controller
    }

    pub fn default_value(&self) -> Option<&GearValue> {
        self.default.as_ref()
    }

    pub fn is_tweening(&self) -> bool {
        self.tween.is_some()
    }

    /// Value for `page`, falling back to the default.
    pub fn value(&self, page: Option<&str>) -> Option<GearValue> {
        page.and_then(|p| self.data.values.iter().find(|(k, _)| k == p))
            .map(|(_, v)| v.clone())
            .or_else(|| self.default.clone())
    }

    /// Position for `page` as a fraction of the parent size, when the
    /// gear stores percent positions.
    pub fn percent_value(&self, page: Option<&str>) -> Option<Vec2> {
        let (values, default) = self.data.percent_values.as_ref()?;
        page.and_then(|p| values.iter().find(|(k, _)| k == p))
            .map(|(_, v)| *v)
            .or(*default)
    }

    /// Animation name and skin for `page`.
    pub fn animation_ext(&self, page: Option<&str>) -> Option<&AnimationExt> {
        page.and_then(|p| self.data.animation_ext.iter().find(|(k, _)| k == p))
            .map(|(_, v)| v)
            .or(self.data.animation_ext_default.as_ref())
    }

    /// Whether the controller's current page is in the display page set.
    /// An empty set admits every page.
    pub fn is_member(&self, page: Option<&str>) -> bool {
        self.data.pages.is_empty() || page.is_some_and(|p| self.data.pages.iter().any(|x| x == p))
    }

    /// Whether this slot can be tweened with the record's settings.
    pub fn can_tween(&self) -> bool {
        matches!(self.data.slot, GearSlot::XY | GearSlot::Size | GearSlot::Look | GearSlot::Color)
            && self.data.tween.is_some()
    }
}

/// Interpolated channels of a tweenable value.
pub(crate) fn channels(value: &GearValue) -> Option<Channels> {
    Some(match value {
        GearValue::XY(p) => [p.x, p.y, 0.0, 0.0],
        GearValue::Size { size, scale } => [size.x, size.y, scale.x, scale.y],
        GearValue::Look { alpha, rotation, .. } => [*alpha, *rotation, 0.0, 0.0],
        GearValue::Color { color, .. } => color.to_array(),
        _ => return None,
    })
}

/// Rebuild a value from channels, taking the non-interpolated parts from
/// `template`.
pub(crate) fn from_channels(template: &GearValue, c: Channels) -> GearValue {
    match template {
        GearValue::XY(_) => GearValue::XY(Vec2::new(c[0], c[1])),
        GearValue::Size { .. } => GearValue::Size {
            size: Vec2::new(c[0], c[1]),
            scale: Vec2::new(c[2], c[3]),
        },
        GearValue::Look { grayed, touchable, .. } => GearValue::Look {
            alpha: c[0],
            rotation: c[1],
            grayed: *grayed,
            touchable: *touchable,
        },
        GearValue::Color { stroke, .. } => GearValue::Color { color: Color::from_array(c), stroke: *stroke },
        other => other.clone(),
    }
}
