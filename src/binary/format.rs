//! Package format constants and structures.

/// Magic value at the start of a package, read as a big-endian u32 ("FGUI").
pub const PACKAGE_MAGIC: u32 = 0x4647_5549;

/// Bytes reserved after the package name.
pub const HEADER_RESERVED: usize = 20;

/// String-ref index meaning "no string".
pub const STRING_REF_NULL: u16 = 65534;

/// String-ref index meaning "empty string".
pub const STRING_REF_EMPTY: u16 = 65533;

/// Package segments, addressed through the index table after the header.
pub mod segment {
    pub const DEPENDENCIES: usize = 0;
    pub const ITEMS: usize = 1;
    pub const SPRITES: usize = 2;
    pub const MISC: usize = 3;
    pub const STRING_TABLE: usize = 4;
    pub const CUSTOM_STRINGS: usize = 5;
}

/// Sections of a component item payload.
pub mod component_section {
    pub const GEOMETRY: usize = 0;
    pub const CONTROLLERS: usize = 1;
    pub const CHILDREN: usize = 2;
    pub const RELATIONS: usize = 3;
    pub const HIT_TEST: usize = 4;
    pub const TRANSITIONS: usize = 5;
    pub const EXTENSION: usize = 6;
    pub const SCROLL: usize = 7;
    pub const TREE_NODES: usize = 8;
}

/// Sections of a child block inside a component's children list.
pub mod child_section {
    pub const BASIC: usize = 0;
    pub const AFTER_ADD: usize = 1;
    pub const GEARS: usize = 2;
    pub const RELATIONS: usize = 3;
    pub const INSTANCE: usize = 4;
}

/// Sections of a controller record.
pub mod controller_section {
    pub const HEADER: usize = 0;
    pub const PAGES: usize = 1;
    pub const ACTIONS: usize = 2;
}

/// Format version that introduced branches, home pages and gear extensions.
pub const VERSION_BRANCHES: i32 = 2;

/// Format version that introduced custom ease paths in gear tweens.
pub const VERSION_CUSTOM_EASE: i32 = 4;

/// Format version that introduced animation gear extension values.
pub const VERSION_ANIMATION_EXT: i32 = 6;

/// Relation target index meaning "the owner's parent".
pub const RELATION_TARGET_PARENT: i16 = -1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(&PACKAGE_MAGIC.to_be_bytes(), b"FGUI");
    }

    #[test]
    fn test_sentinels_distinct() {
        assert_ne!(STRING_REF_NULL, STRING_REF_EMPTY);
    }
}
