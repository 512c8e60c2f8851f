//! Relation records: anchor-style constraints between an owner and a target.

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::binary::Cursor;
use crate::binary::format::RELATION_TARGET_PARENT;
use crate::util::Result;

/// How an owner edge, center or size follows its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationType {
    LeftLeft = 0,
    LeftCenter = 1,
    LeftRight = 2,
    CenterCenter = 3,
    RightLeft = 4,
    RightCenter = 5,
    RightRight = 6,

    TopTop = 7,
    TopMiddle = 8,
    TopBottom = 9,
    MiddleMiddle = 10,
    BottomTop = 11,
    BottomMiddle = 12,
    BottomBottom = 13,

    Width = 14,
    Height = 15,

    LeftExtLeft = 16,
    LeftExtRight = 17,
    RightExtLeft = 18,
    RightExtRight = 19,
    TopExtTop = 20,
    TopExtBottom = 21,
    BottomExtTop = 22,
    BottomExtBottom = 23,

    Size = 24,
}

impl RelationType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use RelationType::*;
        Some(match v {
            0 => LeftLeft,
            1 => LeftCenter,
            2 => LeftRight,
            3 => CenterCenter,
            4 => RightLeft,
            5 => RightCenter,
            6 => RightRight,
            7 => TopTop,
            8 => TopMiddle,
            9 => TopBottom,
            10 => MiddleMiddle,
            11 => BottomTop,
            12 => BottomMiddle,
            13 => BottomBottom,
            14 => Width,
            15 => Height,
            16 => LeftExtLeft,
            17 => LeftExtRight,
            18 => RightExtLeft,
            19 => RightExtRight,
            20 => TopExtTop,
            21 => TopExtBottom,
            22 => BottomExtTop,
            23 => BottomExtBottom,
            24 => Size,
            _ => return None,
        })
    }

    /// Whether the relation concerns the horizontal axis.
    pub fn is_horizontal(self) -> bool {
        use RelationType::*;
        matches!(
            self,
            LeftLeft | LeftCenter | LeftRight | CenterCenter | RightLeft | RightCenter
                | RightRight | Width | LeftExtLeft | LeftExtRight | RightExtLeft
                | RightExtRight | Size
        )
    }

    /// Whether the relation concerns the vertical axis.
    pub fn is_vertical(self) -> bool {
        use RelationType::*;
        matches!(
            self,
            TopTop | TopMiddle | TopBottom | MiddleMiddle | BottomTop | BottomMiddle
                | BottomBottom | Height | TopExtTop | TopExtBottom | BottomExtTop
                | BottomExtBottom | Size
        )
    }
}

/// One `(type, percent)` definition of a relation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationDef {
    pub kind: RelationType,
    pub percent: bool,
}

/// Target of a relation entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationTarget {
    /// The owner's container.
    Parent,
    /// Child `i` of the component that declares the relation.
    Child(usize),
}

/// Definitions grouped under one target, in authored order.
#[derive(Clone, Debug, PartialEq)]
pub struct RelationData {
    pub target: RelationTarget,
    pub defs: SmallVec<[RelationDef; 2]>,
}

/// Read a relation block: u8 entry count, each an i16 target and defs.
///
/// Unknown relation types are skipped; the rest of the entry still applies.
/// Entries with a target index below -1 are dropped whole.
pub fn read_relations(cur: &mut Cursor<'_>) -> Result<Vec<RelationData>> {
    let count = cur.read_u8()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = cur.read_i16()?;
        let target = if index == RELATION_TARGET_PARENT {
            Some(RelationTarget::Parent)
        } else if index >= 0 {
            Some(RelationTarget::Child(index as usize))
        } else {
            None
        };
        let def_count = cur.read_u8()?;
        let mut defs = SmallVec::new();
        for _ in 0..def_count {
            let raw = cur.read_u8()?;
            let percent = cur.read_bool()?;
            match RelationType::from_u8(raw) {
                Some(kind) => defs.push(RelationDef { kind, percent }),
                None => debug!("skipping unknown relation type {}", raw),
            }
        }
        match target {
            Some(target) => out.push(RelationData { target, defs }),
            None => warn!("dropping relation with target index {}", index),
        }
    }
    Ok(out)
}
