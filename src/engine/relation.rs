//! Relation geometry.
//!
//! Each entry remembers the frame its target had when the entry was last
//! applied. When the target changes, every definition moves or resizes the
//! owner by the difference between the remembered and the new frame, so
//! re-applying against an unchanged target never drifts.

use smallvec::SmallVec;
use tracing::trace;

use super::ObjectId;
use crate::component::{RelationDef, RelationType};
use crate::util::Rect;

/// How the owner is related to the target in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetKind {
    /// The target is the owner's container; only its size matters.
    Parent,
    /// The target shares the owner's container.
    Sibling,
    /// The target is a child of the owner; only size definitions apply.
    Child,
}

impl TargetKind {
    /// Frame of the target as seen from the owner.
    pub fn frame(self, rect: Rect) -> Rect {
        match self {
            Self::Parent => Rect::new(0.0, 0.0, rect.width, rect.height),
            Self::Sibling | Self::Child => rect,
        }
    }
}

/// Relation definitions of one owner against one target.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationEntry {
    pub target: ObjectId,
    pub kind: TargetKind,
    pub defs: SmallVec<[RelationDef; 2]>,
    /// Target frame at the last application.
    pub(crate) snapshot: Rect,
}

impl RelationEntry {
    pub fn new(target: ObjectId, kind: TargetKind, defs: &[RelationDef], target_rect: Rect) -> Self {
        Self { target, kind, defs: defs.into(), snapshot: kind.frame(target_rect) }
    }

    pub fn snapshot(&self) -> Rect {
        self.snapshot
    }

    /// Remember `target_rect` without moving the owner.
    pub(crate) fn sync(&mut self, target_rect: Rect) {
        self.snapshot = self.kind.frame(target_rect);
    }

    /// Apply every definition to `owner` for the target's new rect, then
    /// remember the new frame.
    pub fn apply(&mut self, owner: Rect, target_rect: Rect) -> Rect {
        let new = self.kind.frame(target_rect);
        let old = self.snapshot;
        let mut rect = owner;
        for def in &self.defs {
            if self.kind == TargetKind::Child && !is_size(def.kind) {
                continue;
            }
            rect = apply_def(*def, rect, old, new);
        }
        self.snapshot = new;
        trace!("relation -> {:?}: {:?} => {:?}", self.target, owner, rect);
        rect
    }
}

fn is_size(kind: RelationType) -> bool {
    matches!(kind, RelationType::Width | RelationType::Height | RelationType::Size)
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    Center,
    End,
}

fn h(r: Rect, a: Anchor) -> f32 {
    match a {
        Anchor::Start => r.x,
        Anchor::Center => r.x + r.width * 0.5,
        Anchor::End => r.x + r.width,
    }
}

fn v(r: Rect, a: Anchor) -> f32 {
    match a {
        Anchor::Start => r.y,
        Anchor::Center => r.y + r.height * 0.5,
        Anchor::End => r.y + r.height,
    }
}

/// New position of an owner anchor that followed the target from `old_t`
/// to `new_t`. Percent definitions scale the offset with the target span.
fn follow(anchor: f32, old_t: f32, new_t: f32, ratio: Option<f32>) -> f32 {
    let offset = anchor - old_t;
    new_t + ratio.map_or(offset, |r| offset * r)
}

fn ratio(percent: bool, old: f32, new: f32) -> Option<f32> {
    (percent && old > 0.0).then(|| new / old)
}

/// Apply one definition.
pub fn apply_def(def: RelationDef, owner: Rect, old: Rect, new: Rect) -> Rect {
    use Anchor::*;
    use RelationType::*;

    let mut r = owner;
    let rx = ratio(def.percent, old.width, new.width);
    let ry = ratio(def.percent, old.height, new.height);

    let mut move_x = |own: Anchor, tgt: Anchor, r: &mut Rect| {
        let anchor = h(*r, own);
        r.x += follow(anchor, h(old, tgt), h(new, tgt), rx) - anchor;
    };
    let move_y = |own: Anchor, tgt: Anchor, r: &mut Rect| {
        let anchor = v(*r, own);
        r.y += follow(anchor, v(old, tgt), v(new, tgt), ry) - anchor;
    };

    match def.kind {
        LeftLeft => move_x(Start, Start, &mut r),
        LeftCenter => move_x(Start, Center, &mut r),
        LeftRight => move_x(Start, End, &mut r),
        CenterCenter => move_x(Center, Center, &mut r),
        RightLeft => move_x(End, Start, &mut r),
        RightCenter => move_x(End, Center, &mut r),
        RightRight => move_x(End, End, &mut r),

        TopTop => move_y(Start, Start, &mut r),
        TopMiddle => move_y(Start, Center, &mut r),
        TopBottom => move_y(Start, End, &mut r),
        MiddleMiddle => move_y(Center, Center, &mut r),
        BottomTop => move_y(End, Start, &mut r),
        BottomMiddle => move_y(End, Center, &mut r),
        BottomBottom => move_y(End, End, &mut r),

        Width => r.width = follow_size(r.width, old.width, new.width, def.percent),
        Height => r.height = follow_size(r.height, old.height, new.height, def.percent),
        Size => {
            r.width = follow_size(r.width, old.width, new.width, def.percent);
            r.height = follow_size(r.height, old.height, new.height, def.percent);
        }

        LeftExtLeft | LeftExtRight => {
            let tgt = if def.kind == LeftExtLeft { Start } else { End };
            let left = follow(r.x, h(old, tgt), h(new, tgt), rx);
            r.width -= left - r.x;
            r.x = left;
        }
        RightExtLeft | RightExtRight => {
            let tgt = if def.kind == RightExtLeft { Start } else { End };
            let right = follow(r.x + r.width, h(old, tgt), h(new, tgt), rx);
            r.width = right - r.x;
        }
        TopExtTop | TopExtBottom => {
            let tgt = if def.kind == TopExtTop { Start } else { End };
            let top = follow(r.y, v(old, tgt), v(new, tgt), ry);
            r.height -= top - r.y;
            r.y = top;
        }
        BottomExtTop | BottomExtBottom => {
            let tgt = if def.kind == BottomExtTop { Start } else { End };
            let bottom = follow(r.y + r.height, v(old, tgt), v(new, tgt), ry);
            r.height = bottom - r.y;
        }
    }

    r.width = r.width.max(0.0);
    r.height = r.height.max(0.0);
    r
}

fn follow_size(current: f32, old: f32, new: f32, percent: bool) -> f32 {
    match ratio(percent, old, new) {
        Some(k) => current * k,
        None => current + (new - old),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(kind: RelationType, percent: bool) -> RelationDef {
        RelationDef { kind, percent }
    }

    #[test]
    fn test_right_right_follows_dx() {
        for width in [10.0, 50.0, 200.0] {
            let target = Rect::new(100.0, 0.0, 40.0, 40.0);
            let owner = Rect::new(0.0, 0.0, width, 20.0);
            let mut entry = RelationEntry::new(ObjectId(1), TargetKind::Sibling, &[def(RelationType::RightRight, false)], target);

            let moved = Rect::new(137.0, 25.0, 40.0, 40.0);
            let out = entry.apply(owner, moved);
            assert_eq!(out.x_max() - owner.x_max(), 37.0);
            assert_eq!(out.width, width);
            assert_eq!(out.y, owner.y);
        }
    }

    #[test]
    fn test_parent_position_is_ignored() {
        let mut entry = RelationEntry::new(
            ObjectId(0),
            TargetKind::Parent,
            &[def(RelationType::RightRight, false), def(RelationType::BottomBottom, false)],
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        let owner = Rect::new(80.0, 80.0, 10.0, 10.0);
        assert_eq!(entry.apply(owner, Rect::new(500.0, 500.0, 100.0, 100.0)), owner);
        let grown = entry.apply(owner, Rect::new(0.0, 0.0, 150.0, 120.0));
        assert_eq!(grown, Rect::new(130.0, 100.0, 10.0, 10.0));
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let defs = [
            def(RelationType::CenterCenter, true),
            def(RelationType::Width, true),
            def(RelationType::TopExtBottom, false),
        ];
        let mut entry = RelationEntry::new(ObjectId(2), TargetKind::Sibling, &defs, Rect::new(0.0, 0.0, 50.0, 50.0));
        let target = Rect::new(10.0, 20.0, 80.0, 70.0);
        let once = entry.apply(Rect::new(5.0, 5.0, 20.0, 20.0), target);
        let twice = entry.apply(once, target);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_percent_width() {
        let mut entry = RelationEntry::new(
            ObjectId(0),
            TargetKind::Parent,
            &[def(RelationType::Width, true)],
            Rect::new(0.0, 0.0, 200.0, 100.0),
        );
        let out = entry.apply(Rect::new(0.0, 0.0, 50.0, 10.0), Rect::new(0.0, 0.0, 300.0, 100.0));
        assert_eq!(out.width, 75.0);

        let mut plain = RelationEntry::new(
            ObjectId(0),
            TargetKind::Parent,
            &[def(RelationType::Width, false)],
            Rect::new(0.0, 0.0, 200.0, 100.0),
        );
        let out = plain.apply(Rect::new(0.0, 0.0, 50.0, 10.0), Rect::new(0.0, 0.0, 300.0, 100.0));
        assert_eq!(out.width, 150.0);
    }

    #[test]
    fn test_ext_keeps_opposite_edge() {
        let mut entry = RelationEntry::new(
            ObjectId(1),
            TargetKind::Sibling,
            &[def(RelationType::LeftExtRight, false)],
            Rect::new(0.0, 0.0, 40.0, 10.0),
        );
        let owner = Rect::new(50.0, 0.0, 100.0, 10.0);
        let out = entry.apply(owner, Rect::new(0.0, 0.0, 60.0, 10.0));
        assert_eq!(out.x, 70.0);
        assert_eq!(out.x_max(), owner.x_max());
    }

    #[test]
    fn test_child_target_only_resizes() {
        let mut entry = RelationEntry::new(
            ObjectId(3),
            TargetKind::Child,
            &[def(RelationType::LeftLeft, false), def(RelationType::Width, false)],
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        let out = entry.apply(Rect::new(0.0, 0.0, 100.0, 100.0), Rect::new(30.0, 0.0, 25.0, 10.0));
        assert_eq!(out, Rect::new(0.0, 0.0, 115.0, 100.0));
    }
}
