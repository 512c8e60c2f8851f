//! Lazily decoded item payloads.

use tracing::debug;

use crate::binary::{ByteRange, Cursor};
use crate::component::ComponentData;
use crate::util::{Rect, Result};

/// Decoded payload of a package item.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemAsset {
    Component(ComponentData),
    MovieClip(MovieClipData),
    Font(FontData),
    /// Payload handed over untouched (images, sounds, skeletons, ...).
    Raw(ByteRange),
}

impl ItemAsset {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::MovieClip(_) => "movieclip",
            Self::Font(_) => "font",
            Self::Raw(_) => "raw",
        }
    }
}

/// One frame of a movie clip.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub rect: Rect,
    /// Extra delay after this frame, in seconds.
    pub add_delay: f32,
    pub sprite: Option<String>,
}

/// Movie clip timing and frames.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieClipData {
    /// Seconds per frame.
    pub interval: f32,
    pub swing: bool,
    /// Delay between loops, in seconds.
    pub repeat_delay: f32,
    pub frames: Vec<Frame>,
}

impl MovieClipData {
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self> {
        let mut data = Self::default();
        if cur.seek_section(0, 0)? {
            data.interval = cur.read_i32()? as f32 / 1000.0;
            data.swing = cur.read_bool()?;
            data.repeat_delay = cur.read_i32()? as f32 / 1000.0;
        }
        if cur.seek_section(0, 1)? {
            let count = cur.read_i16()?.max(0);
            for _ in 0..count {
                let next = cur.record_end_i16()?;
                let x = cur.read_i32()? as f32;
                let y = cur.read_i32()? as f32;
                let w = cur.read_i32()? as f32;
                let h = cur.read_i32()? as f32;
                data.frames.push(Frame {
                    rect: Rect::new(x, y, w, h),
                    add_delay: cur.read_i32()? as f32 / 1000.0,
                    sprite: cur.read_s_owned()?,
                });
                cur.set_pos(next)?;
            }
        }
        debug!("movie clip: {} frames", data.frames.len());
        Ok(data)
    }
}

/// One glyph of a bitmap font.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub sprite: Option<String>,
    /// Position inside the font texture (ttf fonts).
    pub bxy: (i32, i32),
    pub offset: (i32, i32),
    pub size: (i32, i32),
    pub advance: i32,
    pub channel: u8,
}

/// Bitmap or ttf-backed font.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FontData {
    pub ttf: bool,
    pub tint: bool,
    pub resizable: bool,
    pub has_channel: bool,
    pub size: i32,
    pub x_advance: i32,
    pub line_height: i32,
    pub glyphs: Vec<Glyph>,
}

impl FontData {
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self> {
        let mut data = Self::default();
        if cur.seek_section(0, 0)? {
            data.ttf = cur.read_bool()?;
            data.tint = cur.read_bool()?;
            data.resizable = cur.read_bool()?;
            data.has_channel = cur.read_bool()?;
            data.size = cur.read_i32()?;
            data.x_advance = cur.read_i32()?;
            data.line_height = cur.read_i32()?;
        }
        if cur.seek_section(0, 1)? {
            let count = cur.read_i32()?.max(0);
            for _ in 0..count {
                let next = cur.record_end_i16()?;
                let ch = cur.read_char()?;
                let sprite = cur.read_s_owned()?;
                let bxy = (cur.read_i32()?, cur.read_i32()?);
                let offset = (cur.read_i32()?, cur.read_i32()?);
                let size = (cur.read_i32()?, cur.read_i32()?);
                let advance = cur.read_i32()?;
                let channel = cur.read_u8()?;
                data.glyphs.push(Glyph { ch, sprite, bxy, offset, size, advance, channel });
                cur.set_pos(next)?;
            }
        }
        debug!("font: {} glyphs", data.glyphs.len());
        Ok(data)
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.ch == ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ByteWriter, StringPool};

    #[test]
    fn test_movie_clip() {
        let pool = StringPool::new();
        let mut w = ByteWriter::new();
        w.sections(|s| {
            s.section(|w| {
                w.i32(100).bool(true).i32(500);
            });
            s.section(|w| {
                w.i16(2);
                w.record_i16(|w| {
                    w.i32(0).i32(0).i32(8).i32(8).i32(0).s(&pool, "spr0");
                });
                w.record_i16(|w| {
                    w.i32(8).i32(0).i32(8).i32(8).i32(250).s(&pool, "spr1").u8(0xEE);
                });
            });
        });
        let bytes = w.into_bytes();
        let strings = pool.strings();
        let mut cur = Cursor::new(&bytes).with_strings(&strings);
        let mc = MovieClipData::decode(&mut cur).unwrap();

        assert_eq!(mc.interval, 0.1);
        assert!(mc.swing);
        assert_eq!(mc.repeat_delay, 0.5);
        assert_eq!(mc.frames.len(), 2);
        assert_eq!(mc.frames[1].add_delay, 0.25);
        assert_eq!(mc.frames[1].sprite.as_deref(), Some("spr1"));
    }

    #[test]
    fn test_font_glyphs() {
        let pool = StringPool::new();
        let mut w = ByteWriter::new();
        w.sections(|s| {
            s.section(|w| {
                w.bool(false).bool(true).bool(false).bool(false).i32(24).i32(0).i32(30);
            });
            s.section(|w| {
                w.i32(1);
                w.record_i16(|w| {
                    w.u16('A' as u16)
                        .s(&pool, "g_a")
                        .i32(0).i32(0)
                        .i32(1).i32(2)
                        .i32(12).i32(20)
                        .i32(13)
                        .u8(0);
                });
            });
        });
        let bytes = w.into_bytes();
        let strings = pool.strings();
        let mut cur = Cursor::new(&bytes).with_strings(&strings);
        let font = FontData::decode(&mut cur).unwrap();

        assert!(font.tint);
        assert_eq!(font.size, 24);
        assert_eq!(font.line_height, 30);
        let a = font.glyph('A').unwrap();
        assert_eq!(a.offset, (1, 2));
        assert_eq!(a.advance, 13);
        assert!(font.glyph('B').is_none());
    }
}
