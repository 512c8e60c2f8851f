//! Explicit package registry for `ui://` url resolution.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{Package, PackageItem};

/// Url scheme of package items.
pub const URL_PREFIX: &str = "ui://";

/// Length of a package id inside an id-form url.
const PACKAGE_ID_LEN: usize = 8;

/// Registry handle shared between threads.
pub type SharedRegistry = Arc<RwLock<Registry>>;

/// Packages known to one host session, by id and by name.
#[derive(Debug, Default)]
pub struct Registry {
    by_id: HashMap<String, Arc<Package>>,
    by_name: HashMap<String, Arc<Package>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in a lock for sharing between threads.
    pub fn shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register a package, returning the one it replaces.
    pub fn add(&mut self, package: Arc<Package>) -> Option<Arc<Package>> {
        debug!("registering package {} ({})", package.name(), package.id());
        let previous = self.by_id.insert(package.id().to_string(), package.clone());
        if let Some(prev) = &previous {
            if prev.name() != package.name() {
                self.by_name.remove(prev.name());
            }
        }
        self.by_name.insert(package.name().to_string(), package);
        previous
    }

    /// Remove a package by id or name.
    pub fn remove(&mut self, id_or_name: &str) -> Option<Arc<Package>> {
        let package = self
            .by_id
            .remove(id_or_name)
            .or_else(|| self.by_name.get(id_or_name).cloned())?;
        self.by_id.remove(package.id());
        self.by_name.remove(package.name());
        Some(package)
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Package>> {
        self.by_id.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Package>> {
        self.by_name.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolve `ui://<pkgId><itemId>` or `ui://<pkgName>/<itemName>`.
    pub fn item_by_url(&self, url: &str) -> Option<Arc<PackageItem>> {
        let rest = url.strip_prefix(URL_PREFIX)?;
        match rest.split_once('/') {
            Some((pkg_name, item_name)) => {
                self.by_name(pkg_name)?.item_by_name(item_name).cloned()
            }
            None => {
                if rest.len() <= PACKAGE_ID_LEN || !rest.is_char_boundary(PACKAGE_ID_LEN) {
                    return None;
                }
                let (pkg_id, item_id) = rest.split_at(PACKAGE_ID_LEN);
                self.by_id(pkg_id)?.item_by_id(item_id).cloned()
            }
        }
    }

    /// Rewrite a name-form url to its id form. Id-form urls pass through;
    /// urls naming unknown packages or items yield `None`.
    pub fn normalize_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(URL_PREFIX)?;
        match rest.split_once('/') {
            None => Some(url.to_string()),
            Some((pkg_name, item_name)) => {
                let package = self.by_name(pkg_name)?;
                let item = package.item_by_name(item_name)?;
                Some(format!("{}{}{}", URL_PREFIX, package.id(), item.id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ItemFixture, PackageFixture};
    use crate::util::Config;

    fn registry() -> Registry {
        let bytes = PackageFixture::new("pkg00001", "Basics")
            .item(ItemFixture::image("img01", "star", 8, 8))
            .build();
        let mut reg = Registry::new();
        reg.add(Package::decode(bytes, &Config::default()).unwrap());
        reg
    }

    #[test]
    fn test_lookup_by_url() {
        let reg = registry();
        assert_eq!(reg.item_by_url("ui://pkg00001img01").unwrap().name, "star");
        assert_eq!(reg.item_by_url("ui://Basics/star").unwrap().id, "img01");
        assert!(reg.item_by_url("ui://Basics/moon").is_none());
        assert!(reg.item_by_url("ui://pkg0000").is_none());
        assert!(reg.item_by_url("http://pkg00001img01").is_none());
    }

    #[test]
    fn test_normalize_url() {
        let reg = registry();
        assert_eq!(reg.normalize_url("ui://Basics/star").as_deref(), Some("ui://pkg00001img01"));
        assert_eq!(reg.normalize_url("ui://pkg00001img01").as_deref(), Some("ui://pkg00001img01"));
        assert_eq!(reg.normalize_url("ui://Other/star"), None);
        assert_eq!(reg.normalize_url("star"), None);
    }

    #[test]
    fn test_add_remove() {
        let mut reg = registry();
        assert_eq!(reg.len(), 1);
        assert!(reg.by_name("Basics").is_some());
        let removed = reg.remove("Basics").unwrap();
        assert_eq!(removed.id(), "pkg00001");
        assert!(reg.is_empty());
        assert!(reg.by_id("pkg00001").is_none());
        assert!(reg.remove("pkg00001").is_none());
    }

    #[test]
    fn test_shared_handle() {
        let shared = registry().shared();
        let reader = shared.clone();
        let handle = std::thread::spawn(move || reader.read().item_by_url("ui://Basics/star").is_some());
        assert!(handle.join().unwrap());
        assert_eq!(shared.read().len(), 1);
    }
}
