//! Runtime controllers: named finite-state page selectors.

use std::fmt;

use tracing::{debug, warn};

use crate::component::{ActionData, ControllerData, HomePage};
use crate::util::{Config, Error, Result};

/// A completed page change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerChange {
    pub controller: String,
    pub previous_index: i32,
    pub selected_index: i32,
    pub previous_page_id: Option<String>,
    pub selected_page_id: Option<String>,
}

/// Handle returned by [`Controller::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ControllerChange)>;

/// Named page selector. Page ids are the binding key for gears; page names
/// are cosmetic.
pub struct Controller {
    name: String,
    page_ids: Vec<String>,
    page_names: Vec<String>,
    auto_radio: bool,
    selected: i32,
    previous: i32,
    actions: Vec<ActionData>,
    /// Set while the change is being propagated.
    pub(crate) changing: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Controller {
    /// Empty controller with no pages.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page_ids: Vec::new(),
            page_names: Vec::new(),
            auto_radio: false,
            selected: -1,
            previous: -1,
            actions: Vec::new(),
            changing: false,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Controller from decoded data, positioned on its home page.
    pub fn from_data(data: &ControllerData, config: &Config) -> Self {
        let mut c = Self::new(data.name.clone());
        c.page_ids = data.page_ids.clone();
        c.page_names = data.page_names.clone();
        c.auto_radio = data.auto_radio;
        c.actions = data.actions.clone();
        c.selected = c.home_index(&data.home_page, config);
        c
    }

    fn home_index(&self, home: &HomePage, config: &Config) -> i32 {
        if self.page_ids.is_empty() {
            return -1;
        }
        let by_name = |name: Option<&str>| name.and_then(|n| self.page_index_by_name(n));
        let index = match home {
            HomePage::Default => None,
            HomePage::Index(i) => Some(*i).filter(|&i| i >= 0 && (i as usize) < self.page_ids.len()),
            HomePage::Branch => by_name(config.branch.as_deref()),
            HomePage::Var(name) => by_name(config.var(name)),
        };
        index.unwrap_or(0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_radio(&self) -> bool {
        self.auto_radio
    }

    pub fn actions(&self) -> &[ActionData] {
        &self.actions
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    pub fn page_ids(&self) -> &[String] {
        &self.page_ids
    }

    pub fn page_names(&self) -> &[String] {
        &self.page_names
    }

    pub fn selected_index(&self) -> i32 {
        self.selected
    }

    pub fn previous_index(&self) -> i32 {
        self.previous
    }

    fn page_at(pages: &[String], index: i32) -> Option<&str> {
        usize::try_from(index).ok().and_then(|i| pages.get(i)).map(String::as_str)
    }

    pub fn selected_page_id(&self) -> Option<&str> {
        Self::page_at(&self.page_ids, self.selected)
    }

    /// Name of the selected page.
    pub fn selected_page(&self) -> Option<&str> {
        Self::page_at(&self.page_names, self.selected)
    }

    pub fn previous_page_id(&self) -> Option<&str> {
        Self::page_at(&self.page_ids, self.previous)
    }

    pub fn page_index_by_id(&self, id: &str) -> Option<i32> {
        self.page_ids.iter().position(|p| p == id).map(|i| i as i32)
    }

    pub fn page_index_by_name(&self, name: &str) -> Option<i32> {
        self.page_names.iter().position(|p| p == name).map(|i| i as i32)
    }

    pub fn has_page(&self, name: &str) -> bool {
        self.page_index_by_name(name).is_some()
    }

    /// Id of the other page of a two-page controller.
    pub fn opposite_page_id(&self, id: &str) -> Option<&str> {
        match self.page_index_by_id(id)? {
            0 if self.page_ids.len() > 1 => Some(self.page_ids[1].as_str()),
            1 => Some(self.page_ids[0].as_str()),
            _ => None,
        }
    }

    /// Select a page by index. `-1` clears the selection.
    ///
    /// Returns `None` when the page is already selected.
    pub fn set_selected_index(&mut self, index: i32) -> Result<Option<ControllerChange>> {
        if index < -1 || index >= self.page_ids.len() as i32 {
            return Err(Error::IndexOutOfRange { index, count: self.page_ids.len() });
        }
        if index == self.selected {
            return Ok(None);
        }
        let change = ControllerChange {
            controller: self.name.clone(),
            previous_index: self.selected,
            selected_index: index,
            previous_page_id: self.selected_page_id().map(str::to_owned),
            selected_page_id: Self::page_at(&self.page_ids, index).map(str::to_owned),
        };
        self.previous = self.selected;
        self.selected = index;
        debug!(
            "controller {}: {:?} -> {:?}",
            self.name, change.previous_page_id, change.selected_page_id
        );
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        Ok(Some(change))
    }

    /// Select a page by id. Unknown ids are ignored.
    pub fn set_selected_page_id(&mut self, id: &str) -> Result<Option<ControllerChange>> {
        match self.page_index_by_id(id) {
            Some(i) => self.set_selected_index(i),
            None => {
                warn!("controller {}: no page with id {}", self.name, id);
                Ok(None)
            }
        }
    }

    /// Select a page by name. Unknown names are ignored.
    pub fn set_selected_page_name(&mut self, name: &str) -> Result<Option<ControllerChange>> {
        match self.page_index_by_name(name) {
            Some(i) => self.set_selected_index(i),
            None => {
                warn!("controller {}: no page named {}", self.name, name);
                Ok(None)
            }
        }
    }

    /// Add a page at `index` (clamped to the end). Returns the new page id.
    ///
    /// The selection follows its page.
    pub fn add_page(&mut self, index: usize, name: impl Into<String>) -> String {
        let id = self.next_page_id();
        let index = index.min(self.page_ids.len());
        self.page_ids.insert(index, id.clone());
        self.page_names.insert(index, name.into());
        if self.selected < 0 {
            self.selected = 0;
        } else if index as i32 <= self.selected {
            self.selected += 1;
        }
        id
    }

    fn next_page_id(&self) -> String {
        let mut n = self.page_ids.len();
        loop {
            let id = n.to_string();
            if !self.page_ids.contains(&id) {
                return id;
            }
            n += 1;
        }
    }

    /// Remove the page at `index`, keeping the selection in range.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        if index >= self.page_ids.len() {
            return Err(Error::IndexOutOfRange { index: index as i32, count: self.page_ids.len() });
        }
        self.page_ids.remove(index);
        self.page_names.remove(index);
        let count = self.page_ids.len() as i32;
        if self.selected >= count {
            self.selected = count - 1;
        } else if (index as i32) < self.selected {
            self.selected -= 1;
        }
        self.previous = -1;
        Ok(())
    }

    pub fn clear_pages(&mut self) {
        self.page_ids.clear();
        self.page_names.clear();
        self.selected = -1;
        self.previous = -1;
    }

    /// Register a change listener.
    pub fn add_listener(&mut self, f: impl FnMut(&ControllerChange) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(f)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("page_ids", &self.page_ids)
            .field("page_names", &self.page_names)
            .field("selected", &self.selected)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn controller(names: &[&str]) -> Controller {
        let data = ControllerData {
            name: "c".into(),
            page_ids: (0..names.len()).map(|i| i.to_string()).collect(),
            page_names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        };
        Controller::from_data(&data, &Config::default())
    }

    #[test]
    fn test_same_page_notifies_once() {
        let mut c = controller(&["a", "b"]);
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        c.add_listener(move |_| counter.set(counter.get() + 1));

        assert!(c.set_selected_page_id("1").unwrap().is_some());
        assert!(c.set_selected_page_id("1").unwrap().is_none());
        assert_eq!(fired.get(), 1);
        assert_eq!(c.selected_page(), Some("b"));
        assert_eq!(c.previous_index(), 0);
    }

    #[test]
    fn test_out_of_range_and_unknown() {
        let mut c = controller(&["a", "b"]);
        assert_eq!(c.set_selected_index(2), Err(Error::IndexOutOfRange { index: 2, count: 2 }));
        assert!(c.set_selected_page_id("nope").unwrap().is_none());
        assert!(c.set_selected_page_name("nope").unwrap().is_none());
        assert_eq!(c.selected_index(), 0);
        let change = c.set_selected_index(-1).unwrap().unwrap();
        assert_eq!(change.selected_page_id, None);
    }

    #[test]
    fn test_home_pages() {
        let mut data = ControllerData {
            name: "lang".into(),
            page_ids: vec!["0".into(), "1".into(), "2".into()],
            page_names: vec!["en".into(), "fr".into(), "de".into()],
            ..Default::default()
        };
        data.home_page = HomePage::Branch;
        let cfg = Config::default().with_branch("de").with_var("lang", "fr");
        assert_eq!(Controller::from_data(&data, &cfg).selected_index(), 2);

        data.home_page = HomePage::Var("lang".into());
        assert_eq!(Controller::from_data(&data, &cfg).selected_index(), 1);

        data.home_page = HomePage::Index(9);
        assert_eq!(Controller::from_data(&data, &cfg).selected_index(), 0);

        // Page ids never match a branch name.
        data.home_page = HomePage::Branch;
        let by_id = Config::default().with_branch("2");
        assert_eq!(Controller::from_data(&data, &by_id).selected_index(), 0);

        assert_eq!(Controller::new("empty").selected_index(), -1);
    }

    #[test]
    fn test_page_editing_keeps_arrays_parallel() {
        let mut c = controller(&["a", "b"]);
        c.set_selected_index(1).unwrap();
        let id = c.add_page(0, "z");
        assert_eq!(id, "2");
        assert_eq!(c.page_ids().len(), c.page_names().len());
        assert_eq!(c.selected_page(), Some("b"));

        c.remove_page(2).unwrap();
        assert_eq!(c.page_ids().len(), 2);
        assert_eq!(c.selected_index(), 1);
        assert_eq!(c.opposite_page_id("2"), Some("0"));

        c.clear_pages();
        assert_eq!(c.selected_page_id(), None);
    }
}
