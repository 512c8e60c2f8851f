//! Instantiating a [`Tree`] from a component item.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Controller, ControllerRef, ObjectId, Tree};
use crate::component::{ComponentChild, ComponentData, ObjectType, RelationData, RelationTarget};
use crate::package::{Package, PackageItem, PackageItemType, Registry};
use crate::util::{Config, Result, Vec2};

impl Tree {
    /// Build the object tree of a component item.
    ///
    /// Children whose source cannot be resolved are kept as plain objects,
    /// and bindings to missing controllers or objects are skipped with a
    /// warning. Gears are applied without tweens and no events are recorded.
    #[tracing::instrument(skip_all, fields(item = %item.name))]
    pub fn build(registry: &Registry, item: &Arc<PackageItem>, config: Config) -> Result<Self> {
        let component = item.component()?;
        let mut tree = Tree::new(config);
        tree.building = true;

        let root = tree.root();
        {
            let node = &mut tree.nodes[root.0];
            node.id = item.id.clone();
            node.name = item.name.clone();
            node.object_type = item.object_type.unwrap_or(ObjectType::Component);
            node.item = Some(item.clone());
        }

        let mut builder = Builder { registry, stack: vec![item_key(item)] };
        builder.component(&mut tree, root, item, component)?;

        tree.building = false;
        tree.events.clear();
        info!("built {} objects from {}", tree.len(), item.name);
        Ok(tree)
    }
}

/// `(package id, item id)` of an item, for recursion checks.
fn item_key(item: &PackageItem) -> (String, String) {
    let package = item.package().map(|p| p.id().to_string()).unwrap_or_default();
    (package, item.id.clone())
}

struct Builder<'a> {
    registry: &'a Registry,
    /// Components being expanded, outermost first.
    stack: Vec<(String, String)>,
}

impl Builder<'_> {
    /// Populate `node` from `component`.
    fn component(
        &mut self,
        tree: &mut Tree,
        node: ObjectId,
        item: &Arc<PackageItem>,
        component: &ComponentData,
    ) -> Result<()> {
        {
            let n = &mut tree.nodes[node.0];
            n.props.size = component.init_size;
            n.props.pivot = component.pivot;
            n.props.pivot_as_anchor = component.pivot_as_anchor;
            n.transitions = component.transitions.iter().map(|t| t.name.clone()).collect();
        }
        for data in &component.controllers {
            let controller = Controller::from_data(data, &tree.config);
            tree.add_controller(node, controller);
        }

        let package = item.package();
        let mut ids = Vec::with_capacity(component.children.len());
        for child in &component.children {
            ids.push(self.child(tree, node, package.as_ref(), child)?);
        }

        for (child, &id) in component.children.iter().zip(&ids) {
            for gear in &child.gears {
                let cref = match usize::try_from(gear.controller) {
                    Ok(index) if index < component.controllers.len() => ControllerRef { owner: node, index },
                    _ => {
                        warn!("{}: gear {:?} has no controller {}", child.name, gear.slot, gear.controller);
                        continue;
                    }
                };
                if let Err(e) = tree.add_gear(id, gear.clone(), cref) {
                    warn!("{}: {}", child.name, e);
                }
            }
            for relation in &child.relations {
                let target = match relation.target {
                    RelationTarget::Parent => Some(node),
                    RelationTarget::Child(i) => ids.get(i).copied().filter(|&t| t != id),
                };
                self.relate(tree, id, target, relation, &child.name);
            }
        }

        for relation in &component.relations {
            let target = match relation.target {
                RelationTarget::Parent => tree.parent(node),
                RelationTarget::Child(i) => ids.get(i).copied(),
            };
            if target.is_none() && relation.target == RelationTarget::Parent {
                debug!("{}: no parent for component relation", item.name);
                continue;
            }
            self.relate(tree, node, target, relation, &item.name);
        }

        for (child, &id) in component.children.iter().zip(&ids) {
            apply_overrides(tree, id, child);
        }

        tree.apply_all_controllers(node);
        Ok(())
    }

    fn relate(&self, tree: &mut Tree, owner: ObjectId, target: Option<ObjectId>, relation: &RelationData, name: &str) {
        let Some(target) = target else {
            warn!("{}: relation target {:?} not found", name, relation.target);
            return;
        };
        if let Err(e) = tree.add_relation(owner, target, &relation.defs) {
            warn!("{}: {}", name, e);
        }
    }

    fn child(
        &mut self,
        tree: &mut Tree,
        parent: ObjectId,
        package: Option<&Arc<Package>>,
        child: &ComponentChild,
    ) -> Result<ObjectId> {
        let id = tree.add_child(parent, &child.id, &child.name, child.object_type);
        {
            let p = &mut tree.nodes[id.0].props;
            p.xy = child.xy;
            p.scale = child.scale;
            p.skew = child.skew;
            if let Some((pivot, as_anchor)) = child.pivot {
                p.pivot = pivot;
                p.pivot_as_anchor = as_anchor;
            }
            p.alpha = child.alpha;
            p.rotation = child.rotation;
            p.visible = child.visible;
            p.touchable = child.touchable;
            p.grayed = child.grayed;
            p.data = child.data.clone();
        }

        let source = child.src.as_deref().and_then(|src| self.resolve(package, child.pkg.as_deref(), src));
        if let (Some(src), None) = (&child.src, &source) {
            warn!("{}: source item {} not found", child.name, src);
        }

        if let Some(item) = &source {
            tree.nodes[id.0].item = Some(item.clone());
            tree.nodes[id.0].props.size = Vec2::new(item.width as f32, item.height as f32);
            if item.item_type == PackageItemType::Component {
                self.nested(tree, id, item, &child.name)?;
            }
        }

        if let Some(size) = child.size {
            tree.set_size(id, size);
        }
        Ok(id)
    }

    /// Expand a component child unless it is already being expanded.
    fn nested(&mut self, tree: &mut Tree, id: ObjectId, item: &Arc<PackageItem>, name: &str) -> Result<()> {
        let key = item_key(item);
        if self.stack.contains(&key) {
            warn!("{}: component {} includes itself", name, item.name);
            return Ok(());
        }
        let component = match item.component() {
            Ok(c) => c,
            Err(e) => {
                warn!("{}: {}", name, e);
                return Ok(());
            }
        };
        self.stack.push(key);
        let result = self.component(tree, id, item, component);
        self.stack.pop();
        result
    }

    fn resolve(&self, package: Option<&Arc<Package>>, pkg_id: Option<&str>, src: &str) -> Option<Arc<PackageItem>> {
        let package = match pkg_id {
            Some(id) if package.map_or(true, |p| p.id() != id) => self.registry.by_id(id)?,
            _ => package?,
        };
        let item = package.item_by_id(src)?;
        Some(package.resolve_branch(item).clone())
    }
}

/// Instance controller selections and property overrides of a child.
fn apply_overrides(tree: &mut Tree, id: ObjectId, child: &ComponentChild) {
    for (name, page) in &child.controller_overrides {
        let Some(cref) = tree.controller_by_name(id, name) else {
            warn!("{}: no controller {}", child.name, name);
            continue;
        };
        if let Err(e) = tree.set_selected_page_id(cref, page) {
            warn!("{}: {}", child.name, e);
        }
    }
    for o in &child.property_overrides {
        match tree.child_by_path(id, &o.path) {
            Some(target) => tree.set_property(target, o.property, o.value.as_deref()),
            None => warn!("{}: override path {} not found", child.name, o.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::GearSlot;
    use crate::fixture::*;
    use crate::util::Error;

    const VERSION: i32 = 2;

    fn registry(fixture: PackageFixture) -> (Registry, Arc<Package>) {
        let package = Package::decode(fixture.version(VERSION).build(), &Config::default()).unwrap();
        let mut reg = Registry::new();
        reg.add(package.clone());
        (reg, package)
    }

    /// Panel: 100x40 with a "state" controller, a label glued to the right edge.
    fn panel() -> ItemFixture {
        let label = ChildFixture::graph("p1", "label", (90, 0), (10, 10))
            .relation(RelationFixture::new(-1, &[(6, false)]))
            .gear(GearFixture::display(0, &["1"]));
        let panel = ComponentFixture::new(100, 40)
            .controller(ControllerFixture::new("state", &["off", "on"]))
            .child(label);
        ItemFixture::component("comp02", "Panel", panel)
    }

    fn main(panel_child: ChildFixture) -> ItemFixture {
        let button = ChildFixture::graph("n1", "button", (0, 0), (20, 20))
            .gear(GearFixture::xy(0, &[("1", 50, 60)], None).with_tween(0, 1.0, 0.0));
        let main = ComponentFixture::new(300, 200)
            .controller(ControllerFixture::new("page", &["a", "b"]))
            .child(button)
            .child(panel_child);
        ItemFixture::component("comp01", "Main", main)
    }

    #[test]
    fn test_build_nested_component() {
        let mut panel_child = ChildFixture::from_item(9, "comp02", "n2", "panel", (10, 10));
        panel_child.size = Some((160, 40));
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(main(panel_child)).item(panel()));
        let tree = Tree::build(&reg, pkg.item_by_name("Main").unwrap(), Config::default()).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.size(tree.root()), Vec2::new(300.0, 200.0));
        let panel = tree.child_by_name(tree.root(), "panel").unwrap();
        assert_eq!(tree.node(panel).unwrap().item().unwrap().name, "Panel");
        assert_eq!(tree.size(panel), Vec2::new(160.0, 40.0));

        // Resizing the panel moved its right-glued label.
        let label = tree.child_by_path(tree.root(), "panel.label").unwrap();
        assert_eq!(tree.xy(label), Vec2::new(150.0, 0.0));
        assert!(!tree.is_visible(label));
        assert!(tree.controller_by_name(panel, "state").is_some());
    }

    #[test]
    fn test_build_applies_gears_without_tweens() {
        let panel_child = ChildFixture::from_item(9, "comp02", "n2", "panel", (10, 10));
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(main(panel_child)).item(panel()));
        let mut tree = Tree::build(&reg, pkg.item_by_name("Main").unwrap(), Config::default()).unwrap();
        assert!(!tree.is_tweening());
        assert!(tree.drain_events().is_empty());

        let button = tree.child_by_name(tree.root(), "button").unwrap();
        assert!(tree.gear(button, GearSlot::XY).is_some());
        let page = tree.controller_by_name(tree.root(), "page").unwrap();
        tree.set_selected_page_name(page, "b").unwrap();
        assert!(tree.is_tweening());
        tree.update(1.0);
        assert_eq!(tree.xy(button), Vec2::new(50.0, 60.0));

        // Page "a" has no value; the initial position is the default.
        tree.set_selected_page_name(page, "a").unwrap();
        tree.update(1.0);
        assert_eq!(tree.xy(button), Vec2::ZERO);
    }

    #[test]
    fn test_controller_override_at_build() {
        let mut panel_child = ChildFixture::from_item(9, "comp02", "n2", "panel", (10, 10));
        panel_child.overrides = vec![("state".into(), "1".into())];
        panel_child.properties = vec![("label".into(), 0, "Go".into())];
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(main(panel_child)).item(panel()));
        let tree = Tree::build(&reg, pkg.item_by_name("Main").unwrap(), Config::default()).unwrap();

        let panel = tree.child_by_name(tree.root(), "panel").unwrap();
        let state = tree.controller_by_name(panel, "state").unwrap();
        assert_eq!(tree.controller(state).unwrap().selected_page(), Some("on"));
        let label = tree.child_by_name(panel, "label").unwrap();
        assert!(tree.is_visible(label));
        assert_eq!(tree.props(label).unwrap().text.as_deref(), Some("Go"));
    }

    #[test]
    fn test_unresolved_bindings_are_skipped() {
        let orphan = ChildFixture::from_item(0, "missing", "n1", "orphan", (0, 0))
            .gear(GearFixture::display(3, &["0"]))
            .relation(RelationFixture::new(7, &[(0, false)]));
        let main = ComponentFixture::new(50, 50).child(orphan);
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(ItemFixture::component("comp01", "Main", main)));
        let tree = Tree::build(&reg, pkg.item_by_name("Main").unwrap(), Config::default()).unwrap();

        let orphan = tree.child_by_name(tree.root(), "orphan").unwrap();
        assert!(tree.node(orphan).unwrap().item().is_none());
        assert!(tree.node(orphan).unwrap().gears().is_empty());
        assert!(tree.relations(orphan).is_empty());
        assert!(tree.is_visible(orphan));
    }

    #[test]
    fn test_self_including_component_stops() {
        let main = ComponentFixture::new(50, 50).child(ChildFixture::from_item(9, "comp01", "n1", "again", (0, 0)));
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(ItemFixture::component("comp01", "Main", main)));
        let tree = Tree::build(&reg, pkg.item_by_name("Main").unwrap(), Config::default()).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_non_component_root_fails() {
        let (reg, pkg) = registry(PackageFixture::new("pkg00001", "Ui").item(ItemFixture::image("img01", "star", 8, 8)));
        let err = Tree::build(&reg, pkg.item_by_name("star").unwrap(), Config::default()).unwrap_err();
        assert_eq!(err, Error::NotAComponent("img01".into()));
    }

    #[test]
    fn test_cross_package_source() {
        let (mut reg, _) = registry(PackageFixture::new("pkg00002", "Common").item(panel()));
        let mut child = ChildFixture::from_item(9, "comp02", "n1", "shared", (0, 0));
        child.pkg = Some("pkg00002".into());
        let main = ComponentFixture::new(50, 50).child(child);
        let package = Package::decode(
            PackageFixture::new("pkg00001", "Ui")
                .item(ItemFixture::component("comp01", "Main", main))
                .version(VERSION)
                .build(),
            &Config::default(),
        )
        .unwrap();
        reg.add(package.clone());

        let tree = Tree::build(&reg, package.item_by_name("Main").unwrap(), Config::default()).unwrap();
        let shared = tree.child_by_name(tree.root(), "shared").unwrap();
        assert_eq!(tree.size(shared), Vec2::new(100.0, 40.0));
        assert_eq!(tree.children(shared).len(), 1);
    }
}
