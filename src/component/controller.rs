//! Controller records.

use tracing::{debug, warn};

use crate::binary::Cursor;
use crate::binary::format::{controller_section, VERSION_BRANCHES};
use crate::util::Result;

/// Rule choosing a controller's initial page.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum HomePage {
    /// First page.
    #[default]
    Default,
    /// Fixed page index.
    Index(i32),
    /// Page whose name equals the active branch name.
    Branch,
    /// Page whose name equals the value of a named variable.
    Var(String),
}

/// Action run when a controller moves between page sets.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionData {
    PlayTransition {
        from: Vec<String>,
        to: Vec<String>,
        transition: String,
        play_times: i32,
        delay: f32,
        stop_on_exit: bool,
    },
    ChangePage {
        from: Vec<String>,
        to: Vec<String>,
        /// Id of the child that owns the target controller; `None` is the owner itself.
        object_id: Option<String>,
        controller: String,
        target_page: String,
    },
}

impl ActionData {
    fn pages(&self) -> (&[String], &[String]) {
        match self {
            Self::PlayTransition { from, to, .. } | Self::ChangePage { from, to, .. } => (from, to),
        }
    }

    /// Whether a move from `from` to `to` triggers this action.
    /// Empty page sets match any page.
    pub fn matches(&self, from: Option<&str>, to: Option<&str>) -> bool {
        let (from_set, to_set) = self.pages();
        let hit = |set: &[String], page: Option<&str>| {
            set.is_empty() || page.is_some_and(|p| set.iter().any(|s| s == p))
        };
        hit(from_set, from) && hit(to_set, to)
    }

    fn read(cur: &mut Cursor<'_>) -> Result<Option<Self>> {
        let kind = cur.read_u8()?;
        let from = read_page_list(cur)?;
        let to = read_page_list(cur)?;
        Ok(match kind {
            0 => Some(Self::PlayTransition {
                from,
                to,
                transition: cur.read_s_owned()?.unwrap_or_default(),
                play_times: cur.read_i32()?,
                delay: cur.read_f32()?,
                stop_on_exit: cur.read_bool()?,
            }),
            1 => Some(Self::ChangePage {
                from,
                to,
                object_id: cur.read_s_owned()?,
                controller: cur.read_s_owned()?.unwrap_or_default(),
                target_page: cur.read_s_owned()?.unwrap_or_default(),
            }),
            other => {
                debug!("skipping controller action type {}", other);
                None
            }
        })
    }
}

fn read_page_list(cur: &mut Cursor<'_>) -> Result<Vec<String>> {
    let count = cur.read_i16()?.max(0) as usize;
    Ok(cur.read_s_array(count)?.into_iter().flatten().collect())
}

/// Decoded controller record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerData {
    pub name: String,
    pub page_ids: Vec<String>,
    pub page_names: Vec<String>,
    pub auto_radio: bool,
    pub home_page: HomePage,
    pub actions: Vec<ActionData>,
}

impl ControllerData {
    /// Decode a controller record whose section table starts at the cursor.
    pub fn read(cur: &mut Cursor<'_>) -> Result<Self> {
        let table = cur.pos();
        let mut data = Self::default();

        if cur.seek_section(table, controller_section::HEADER)? {
            data.name = cur.read_s_owned()?.unwrap_or_default();
            data.auto_radio = cur.read_bool()?;
        }

        if cur.seek_section(table, controller_section::PAGES)? {
            let count = cur.read_i16()?.max(0);
            for _ in 0..count {
                let id = cur.read_s_owned()?.unwrap_or_default();
                let name = cur.read_s_owned()?.unwrap_or_default();
                // Page indices must match the file order.
                if data.page_ids.contains(&id) {
                    warn!("controller {}: duplicate page id {}", data.name, id);
                }
                data.page_ids.push(id);
                data.page_names.push(name);
            }
            if cur.version() >= VERSION_BRANCHES {
                data.home_page = match cur.read_u8()? {
                    1 => HomePage::Index(cur.read_i16()? as i32),
                    2 => HomePage::Branch,
                    3 => HomePage::Var(cur.read_s_owned()?.unwrap_or_default()),
                    _ => HomePage::Default,
                };
            }
        }

        if cur.seek_section(table, controller_section::ACTIONS)? {
            let count = cur.read_i16()?.max(0);
            for _ in 0..count {
                let next = cur.record_end_i16()?;
                if let Some(action) = ActionData::read(cur)? {
                    data.actions.push(action);
                }
                cur.set_pos(next)?;
            }
        }

        debug!("controller {} decoded with {} pages", data.name, data.page_ids.len());
        Ok(data)
    }
}
