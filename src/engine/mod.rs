//! Live object tree driven by controllers, gears and relations.
//!
//! Objects live in an arena owned by [`Tree`] and are addressed by
//! [`ObjectId`]. Controllers belong to component objects; gears on the
//! component's children bind to them by [`ControllerRef`]. Relations keep
//! an object's rect tied to its parent, a sibling or one of its children.
//!
//! Changing a controller's page re-applies every gear bound to it, runs the
//! controller's actions and records a [`TreeEvent`]. Tweened gears advance
//! in [`Tree::update`].
//!
//! # Example
//!
//! ```ignore
//! use fgui::{Config, Registry, Tree};
//!
//! let tree = Tree::build(&registry, &item, Config::default())?;
//! let state = tree.controller_by_name(tree.root(), "state").unwrap();
//! tree.set_selected_page_name(state, "open")?;
//! tree.update(0.016);
//! ```

mod builder;
mod controller;
mod ease;
mod gear;
mod relation;
mod tween;

pub use controller::*;
pub use ease::{evaluate, EaseType, PathPoint};
pub use gear::Gear;
pub use relation::*;
pub use tween::{Channels, Tween};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::component::{ActionData, GearData, GearSlot, GearValue, ObjectType, RelationDef};
use crate::package::PackageItem;
use crate::util::{Color, Config, Error, Rect, Result, Vec2};

/// Index of an object in its [`Tree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Controller `index` of object `owner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControllerRef {
    pub owner: ObjectId,
    pub index: usize,
}

/// Notifications collected by the tree, drained by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum TreeEvent {
    ControllerChanged {
        owner: ObjectId,
        controller: String,
        previous_index: i32,
        selected_index: i32,
    },
    /// A controller action asks the host to play a transition.
    PlayTransition {
        owner: ObjectId,
        transition: String,
        play_times: i32,
        delay: f32,
    },
    StopTransition {
        owner: ObjectId,
        transition: String,
    },
}

/// Presentation properties of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct Props {
    pub xy: Vec2,
    pub size: Vec2,
    pub scale: Vec2,
    pub skew: Vec2,
    pub pivot: Vec2,
    pub pivot_as_anchor: bool,
    pub alpha: f32,
    pub rotation: f32,
    pub visible: bool,
    pub touchable: bool,
    pub grayed: bool,
    pub color: Color,
    pub stroke: Color,
    pub text: Option<String>,
    pub icon: Option<String>,
    pub font_size: i32,
    pub playing: bool,
    pub frame: i32,
    pub animation: Option<String>,
    pub skin: Option<String>,
    pub data: Option<String>,
}

impl Default for Props {
    fn default() -> Self {
        Self {
            xy: Vec2::ZERO,
            size: Vec2::ZERO,
            scale: Vec2::ONE,
            skew: Vec2::ZERO,
            pivot: Vec2::ZERO,
            pivot_as_anchor: false,
            alpha: 1.0,
            rotation: 0.0,
            visible: true,
            touchable: true,
            grayed: false,
            color: Color::WHITE,
            stroke: Color::BLACK,
            text: None,
            icon: None,
            font_size: 0,
            playing: true,
            frame: 0,
            animation: None,
            skin: None,
            data: None,
        }
    }
}

/// One object of the tree.
#[derive(Debug)]
pub struct Node {
    id: String,
    name: String,
    object_type: ObjectType,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    item: Option<Arc<PackageItem>>,
    props: Props,
    gear_visible: bool,
    controllers: Vec<Controller>,
    /// Sorted by slot.
    gears: Vec<Gear>,
    relations: Vec<RelationEntry>,
    transitions: Vec<String>,
}

impl Node {
    fn new(id: &str, name: &str, object_type: ObjectType, parent: Option<ObjectId>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            object_type,
            parent,
            children: Vec::new(),
            item: None,
            props: Props::default(),
            gear_visible: true,
            controllers: Vec::new(),
            gears: Vec::new(),
            relations: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    /// Package item the object was built from.
    pub fn item(&self) -> Option<&Arc<PackageItem>> {
        self.item.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.props.xy.x, self.props.xy.y, self.props.size.x, self.props.size.y)
    }

    /// Visibility after Display gears, ignoring the `visible` property.
    pub fn gear_visible(&self) -> bool {
        self.gear_visible
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn gears(&self) -> &[Gear] {
        &self.gears
    }

    pub fn relations(&self) -> &[RelationEntry] {
        &self.relations
    }

    /// Names of the component's authored transitions.
    pub fn transitions(&self) -> &[String] {
        &self.transitions
    }
}

/// Arena of live objects. The root is always [`ObjectId`] 0.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    config: Config,
    /// Target -> owners with a relation to it.
    dependents: HashMap<ObjectId, Vec<ObjectId>>,
    events: Vec<TreeEvent>,
    /// Transition actions started and not stopped yet.
    playing: HashSet<(ControllerRef, usize)>,
    /// Targets whose relations are being applied.
    handling: HashSet<ObjectId>,
    depth: usize,
    building: bool,
}

impl Tree {
    /// Tree holding only an empty root.
    pub fn new(config: Config) -> Self {
        Self {
            nodes: vec![Node::new("", "", ObjectType::Component, None)],
            config,
            dependents: HashMap::new(),
            events: Vec::new(),
            playing: HashSet::new(),
            handling: HashSet::new(),
            depth: 0,
            building: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn root(&self) -> ObjectId {
        ObjectId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (ObjectId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (ObjectId(i), n))
    }

    /// Append a child object.
    ///
    /// # Panics
    ///
    /// If `parent` is not in this tree.
    pub fn add_child(&mut self, parent: ObjectId, id: &str, name: &str, object_type: ObjectType) -> ObjectId {
        let child = ObjectId(self.nodes.len());
        self.nodes[parent.0].children.push(child);
        self.nodes.push(Node::new(id, name, object_type, Some(parent)));
        child
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.node(id).map_or(&[], |n| &n.children)
    }

    pub fn child_at(&self, parent: ObjectId, index: usize) -> Option<ObjectId> {
        self.children(parent).get(index).copied()
    }

    pub fn child_by_name(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        self.children(parent).iter().copied().find(|&c| self.nodes[c.0].name == name)
    }

    pub fn child_by_id(&self, parent: ObjectId, id: &str) -> Option<ObjectId> {
        self.children(parent).iter().copied().find(|&c| self.nodes[c.0].id == id)
    }

    /// Descendant by dot-separated child names.
    pub fn child_by_path(&self, parent: ObjectId, path: &str) -> Option<ObjectId> {
        path.split('.').try_fold(parent, |at, name| self.child_by_name(at, name))
    }

    pub fn props(&self, id: ObjectId) -> Option<&Props> {
        self.node(id).map(|n| &n.props)
    }

    pub fn xy(&self, id: ObjectId) -> Vec2 {
        self.node(id).map_or(Vec2::ZERO, |n| n.props.xy)
    }

    pub fn size(&self, id: ObjectId) -> Vec2 {
        self.node(id).map_or(Vec2::ZERO, |n| n.props.size)
    }

    pub fn rect(&self, id: ObjectId) -> Rect {
        self.node(id).map_or_else(Rect::default, Node::rect)
    }

    /// The `visible` property combined with Display gears.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        self.node(id).is_some_and(|n| n.props.visible && n.gear_visible)
    }

    // ------------------------------------------------------------------
    // Controllers
    // ------------------------------------------------------------------

    pub fn add_controller(&mut self, owner: ObjectId, controller: Controller) -> ControllerRef {
        let node = &mut self.nodes[owner.0];
        node.controllers.push(controller);
        ControllerRef { owner, index: node.controllers.len() - 1 }
    }

    pub fn controller(&self, cref: ControllerRef) -> Option<&Controller> {
        self.node(cref.owner)?.controllers.get(cref.index)
    }

    fn controller_mut(&mut self, cref: ControllerRef) -> Result<&mut Controller> {
        self.nodes
            .get_mut(cref.owner.0)
            .and_then(|n| n.controllers.get_mut(cref.index))
            .ok_or_else(|| Error::unresolved(format!("controller {:?}", cref)))
    }

    pub fn controller_by_name(&self, owner: ObjectId, name: &str) -> Option<ControllerRef> {
        let index = self.node(owner)?.controllers.iter().position(|c| c.name() == name)?;
        Some(ControllerRef { owner, index })
    }

    /// Register a listener on a controller.
    pub fn add_controller_listener(
        &mut self,
        cref: ControllerRef,
        f: impl FnMut(&ControllerChange) + 'static,
    ) -> Result<ListenerId> {
        Ok(self.controller_mut(cref)?.add_listener(f))
    }

    /// Select a page by index. Returns whether the selection changed.
    pub fn set_selected_index(&mut self, cref: ControllerRef, index: i32) -> Result<bool> {
        let change = self.controller_mut(cref)?.set_selected_index(index)?;
        Ok(self.propagate(cref, change))
    }

    /// Select a page by id. Unknown ids leave the selection unchanged.
    pub fn set_selected_page_id(&mut self, cref: ControllerRef, id: &str) -> Result<bool> {
        let change = self.controller_mut(cref)?.set_selected_page_id(id)?;
        Ok(self.propagate(cref, change))
    }

    /// Select a page by name. Unknown names leave the selection unchanged.
    pub fn set_selected_page_name(&mut self, cref: ControllerRef, name: &str) -> Result<bool> {
        let change = self.controller_mut(cref)?.set_selected_page_name(name)?;
        Ok(self.propagate(cref, change))
    }

    fn propagate(&mut self, cref: ControllerRef, change: Option<ControllerChange>) -> bool {
        let Some(change) = change else {
            return false;
        };
        if let Ok(c) = self.controller_mut(cref) {
            c.changing = true;
        }
        self.apply_controller(cref);
        self.run_actions(cref, &change);
        if let Ok(c) = self.controller_mut(cref) {
            c.changing = false;
        }
        self.events.push(TreeEvent::ControllerChanged {
            owner: cref.owner,
            controller: change.controller,
            previous_index: change.previous_index,
            selected_index: change.selected_index,
        });
        true
    }

    /// Re-apply every gear bound to `cref`.
    pub fn apply_controller(&mut self, cref: ControllerRef) {
        for i in 0..self.nodes.len() {
            let slots: Vec<GearSlot> = self.nodes[i]
                .gears
                .iter()
                .filter(|g| g.controller() == cref)
                .map(Gear::slot)
                .collect();
            for slot in slots {
                self.apply_gear(ObjectId(i), slot);
            }
        }
    }

    /// Re-apply the gears of every controller owned by `owner`.
    pub fn apply_all_controllers(&mut self, owner: ObjectId) {
        let count = self.node(owner).map_or(0, |n| n.controllers.len());
        for index in 0..count {
            self.apply_controller(ControllerRef { owner, index });
        }
    }

    fn run_actions(&mut self, cref: ControllerRef, change: &ControllerChange) {
        let Some(actions) = self.controller(cref).map(|c| c.actions().to_vec()) else {
            return;
        };
        let from = change.previous_page_id.as_deref();
        let to = change.selected_page_id.as_deref();

        for (i, action) in actions.iter().enumerate() {
            let hit = action.matches(from, to);
            match action {
                ActionData::PlayTransition { transition, play_times, delay, stop_on_exit, .. } => {
                    if hit {
                        self.playing.insert((cref, i));
                        self.events.push(TreeEvent::PlayTransition {
                            owner: cref.owner,
                            transition: transition.clone(),
                            play_times: *play_times,
                            delay: *delay,
                        });
                    } else if *stop_on_exit && self.playing.remove(&(cref, i)) {
                        self.events.push(TreeEvent::StopTransition {
                            owner: cref.owner,
                            transition: transition.clone(),
                        });
                    }
                }
                ActionData::ChangePage { object_id, controller, target_page, .. } if hit => {
                    self.change_page(cref, object_id.as_deref(), controller, target_page);
                }
                ActionData::ChangePage { .. } => {}
            }
        }
    }

    fn change_page(&mut self, source: ControllerRef, object_id: Option<&str>, controller: &str, page: &str) {
        let owner = match object_id {
            None => Some(source.owner),
            Some(id) => self.child_by_id(source.owner, id),
        };
        let Some(target) = owner.and_then(|o| self.controller_by_name(o, controller)) else {
            warn!("change-page action: controller {} not found", controller);
            return;
        };
        if target == source || self.controller(target).map_or(true, |c| c.changing) {
            return;
        }
        let Some(src) = self.controller(source) else {
            return;
        };
        let result = match page {
            "~1" => {
                let index = src.selected_index();
                let count = self.controller(target).map_or(0, Controller::page_count);
                if index < count as i32 {
                    self.set_selected_index(target, index)
                } else {
                    Ok(false)
                }
            }
            "~2" => match src.selected_page().map(str::to_owned) {
                Some(name) => self.set_selected_page_name(target, &name),
                None => Ok(false),
            },
            id => self.set_selected_page_id(target, id),
        };
        if let Err(e) = result {
            warn!("change-page action on {}: {}", controller, e);
        }
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<TreeEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Gears
    // ------------------------------------------------------------------

    /// Bind a gear record to `controller`. An existing gear on the same
    /// slot is replaced.
    pub fn add_gear(&mut self, owner: ObjectId, data: GearData, controller: ControllerRef) -> Result<()> {
        if self.controller(controller).is_none() {
            return Err(Error::unresolved(format!("gear controller {:?}", controller)));
        }
        let slot = data.slot;
        let initial = self.current_value(owner, slot);
        let node = self
            .nodes
            .get_mut(owner.0)
            .ok_or_else(|| Error::unresolved(format!("object {:?}", owner)))?;
        node.gears.retain(|g| g.slot() != slot);
        let at = node.gears.partition_point(|g| g.slot() < slot);
        node.gears.insert(at, Gear::new(data, controller, initial));
        Ok(())
    }

    pub fn gear(&self, id: ObjectId, slot: GearSlot) -> Option<&Gear> {
        self.node(id)?.gears.iter().find(|g| g.slot() == slot)
    }

    fn page_of(&self, cref: ControllerRef) -> Option<String> {
        self.controller(cref)?.selected_page_id().map(str::to_owned)
    }

    fn apply_gear(&mut self, id: ObjectId, slot: GearSlot) {
        if slot.is_display() {
            self.update_display(id);
            return;
        }
        let Some(gi) = self.nodes[id.0].gears.iter().position(|g| g.slot() == slot) else {
            return;
        };
        let g = &self.nodes[id.0].gears[gi];
        let page = self.page_of(g.controller());
        let page = page.as_deref();
        let Some(mut target) = g.value(page) else {
            return;
        };
        if let (Some(pct), Some(parent)) = (g.percent_value(page), self.nodes[id.0].parent) {
            target = GearValue::XY(pct * self.size(parent));
        }
        let ext = g.animation_ext(page).cloned();
        let config = g.data().tween.clone().filter(|_| g.can_tween());
        let config = config.filter(|_| !self.building && !self.config.disable_tweens);

        if let Some(ext) = ext {
            let props = &mut self.nodes[id.0].props;
            props.animation = ext.animation;
            props.skin = ext.skin;
        }

        let Some(config) = config else {
            self.nodes[id.0].gears[gi].tween = None;
            self.write_value(id, &target);
            return;
        };
        let (Some(to), Some(current)) = (
            gear::channels(&target),
            self.current_value(id, slot).as_ref().and_then(gear::channels),
        ) else {
            self.write_value(id, &target);
            return;
        };
        let g = &mut self.nodes[id.0].gears[gi];
        if g.tween.as_ref().is_some_and(|t| t.end() == to) {
            return;
        }
        if current == to {
            g.tween = None;
            self.write_value(id, &target);
            return;
        }
        trace!("{:?} {:?}: tween {:?} -> {:?}", id, slot, current, to);
        g.tween = Some(Tween::new(current, to, &config));
        self.write_immediate(id, &target);
    }

    /// Recompute Display/Display2 visibility of `id`.
    fn update_display(&mut self, id: ObjectId) {
        let node = &self.nodes[id.0];
        let membership = |slot: GearSlot| {
            node.gears.iter().find(|g| g.slot() == slot).map(|g| {
                let page = self.page_of(g.controller());
                (g.is_member(page.as_deref()), g.data().condition)
            })
        };
        let primary = membership(GearSlot::Display).map_or(true, |(m, _)| m);
        let visible = match membership(GearSlot::Display2) {
            Some((secondary, 0)) => secondary && primary,
            Some((secondary, _)) => secondary || primary,
            None => primary,
        };
        trace!("{:?} gear visible = {}", id, visible);
        self.nodes[id.0].gear_visible = visible;
    }

    /// Current value of the property driven by `slot`.
    fn current_value(&self, id: ObjectId, slot: GearSlot) -> Option<GearValue> {
        let p = &self.node(id)?.props;
        Some(match slot {
            GearSlot::Display | GearSlot::Display2 => return None,
            GearSlot::XY => GearValue::XY(p.xy),
            GearSlot::Size => GearValue::Size { size: p.size, scale: p.scale },
            GearSlot::Look => GearValue::Look {
                alpha: p.alpha,
                rotation: p.rotation,
                grayed: p.grayed,
                touchable: p.touchable,
            },
            GearSlot::Color => GearValue::Color { color: p.color, stroke: p.stroke },
            GearSlot::Animation => GearValue::Animation { playing: p.playing, frame: p.frame },
            GearSlot::Text => GearValue::Text(p.text.clone()),
            GearSlot::Icon => GearValue::Icon(p.icon.clone()),
            GearSlot::FontSize => GearValue::FontSize(p.font_size),
        })
    }

    fn write_value(&mut self, id: ObjectId, value: &GearValue) {
        match value {
            GearValue::XY(xy) => self.set_xy(id, *xy),
            GearValue::Size { size, scale } => {
                self.set_size(id, *size);
                self.set_scale(id, *scale);
            }
            GearValue::Look { alpha, rotation, grayed, touchable } => {
                let p = &mut self.nodes[id.0].props;
                p.alpha = *alpha;
                p.rotation = *rotation;
                p.grayed = *grayed;
                p.touchable = *touchable;
            }
            GearValue::Color { color, stroke } => {
                let p = &mut self.nodes[id.0].props;
                p.color = *color;
                p.stroke = *stroke;
            }
            GearValue::Animation { playing, frame } => {
                let p = &mut self.nodes[id.0].props;
                p.playing = *playing;
                p.frame = *frame;
            }
            GearValue::Text(text) => self.nodes[id.0].props.text = text.clone(),
            GearValue::Icon(icon) => self.nodes[id.0].props.icon = icon.clone(),
            GearValue::FontSize(size) => self.nodes[id.0].props.font_size = *size,
        }
    }

    /// Parts of a tweened value that switch at the start of the tween.
    fn write_immediate(&mut self, id: ObjectId, value: &GearValue) {
        let p = &mut self.nodes[id.0].props;
        match value {
            GearValue::Look { grayed, touchable, .. } => {
                p.grayed = *grayed;
                p.touchable = *touchable;
            }
            GearValue::Color { stroke, .. } => p.stroke = *stroke,
            _ => {}
        }
    }

    /// Advance running gear tweens by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let running: Vec<(ObjectId, usize)> = self
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(i, n)| {
                n.gears
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.tween.is_some())
                    .map(move |(gi, _)| (ObjectId(i), gi))
            })
            .collect();

        for (id, gi) in running {
            let g = &mut self.nodes[id.0].gears[gi];
            let slot = g.slot();
            let Some(tween) = g.tween.as_mut() else {
                continue;
            };
            let done = tween.advance(dt);
            let channels = tween.value();
            if done {
                g.tween = None;
            }
            if let Some(template) = self.current_value(id, slot) {
                self.write_value(id, &gear::from_channels(&template, channels));
            }
        }
    }

    /// Whether any gear tween is running.
    pub fn is_tweening(&self) -> bool {
        self.nodes.iter().any(|n| n.gears.iter().any(Gear::is_tweening))
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Relate `owner` to `target`, which must be its parent, a sibling or
    /// one of its children. Definitions for an already related target are
    /// appended to its entry.
    pub fn add_relation(&mut self, owner: ObjectId, target: ObjectId, defs: &[RelationDef]) -> Result<()> {
        let kind = if owner == target || self.node(owner).is_none() {
            None
        } else if self.parent(owner) == Some(target) {
            Some(TargetKind::Parent)
        } else if self.parent(target) == Some(owner) {
            Some(TargetKind::Child)
        } else if self.parent(target).is_some() && self.parent(target) == self.parent(owner) {
            Some(TargetKind::Sibling)
        } else {
            None
        };
        let kind = kind.ok_or_else(|| Error::unresolved(format!("relation {:?} -> {:?}", owner, target)))?;
        let rect = self.rect(target);

        let node = &mut self.nodes[owner.0];
        match node.relations.iter_mut().find(|e| e.target == target) {
            Some(entry) => entry.defs.extend_from_slice(defs),
            None => node.relations.push(RelationEntry::new(target, kind, defs, rect)),
        }
        let owners = self.dependents.entry(target).or_default();
        if !owners.contains(&owner) {
            owners.push(owner);
        }
        Ok(())
    }

    pub fn relations(&self, id: ObjectId) -> &[RelationEntry] {
        self.node(id).map_or(&[], |n| &n.relations)
    }

    /// Propagate a geometry change of `target` to its dependents.
    fn geometry_changed(&mut self, target: ObjectId) {
        let Some(owners) = self.dependents.get(&target).cloned() else {
            return;
        };
        if self.depth >= self.config.max_relation_depth {
            warn!("relation depth limit {} reached at {:?}", self.config.max_relation_depth, target);
            return;
        }
        if !self.handling.insert(target) {
            debug!("relation cycle at {:?}", target);
            return;
        }
        self.depth += 1;
        let target_rect = self.rect(target);
        for owner in owners {
            let in_progress = self.handling.contains(&owner);
            let node = &mut self.nodes[owner.0];
            if in_progress {
                // The owner's own change is being propagated.
                for entry in node.relations.iter_mut().filter(|e| e.target == target) {
                    entry.sync(target_rect);
                }
                continue;
            }
            let before = node.rect();
            let mut rect = before;
            for entry in node.relations.iter_mut().filter(|e| e.target == target) {
                rect = entry.apply(rect, target_rect);
            }
            if rect != before {
                node.props.xy = Vec2::new(rect.x, rect.y);
                node.props.size = Vec2::new(rect.width, rect.height);
                self.geometry_changed(owner);
            }
        }
        self.depth -= 1;
        self.handling.remove(&target);
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn set_xy(&mut self, id: ObjectId, xy: Vec2) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        if node.props.xy != xy {
            node.props.xy = xy;
            self.geometry_changed(id);
        }
    }

    /// Resize; negative extents are clamped to zero.
    pub fn set_size(&mut self, id: ObjectId, size: Vec2) {
        let size = size.max(Vec2::ZERO);
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        if node.props.size != size {
            node.props.size = size;
            self.geometry_changed(id);
        }
    }

    fn props_mut(&mut self, id: ObjectId) -> Option<&mut Props> {
        self.nodes.get_mut(id.0).map(|n| &mut n.props)
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: Vec2) {
        if let Some(p) = self.props_mut(id) {
            p.scale = scale;
        }
    }

    pub fn set_alpha(&mut self, id: ObjectId, alpha: f32) {
        if let Some(p) = self.props_mut(id) {
            p.alpha = alpha;
        }
    }

    pub fn set_rotation(&mut self, id: ObjectId, rotation: f32) {
        if let Some(p) = self.props_mut(id) {
            p.rotation = rotation;
        }
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) {
        if let Some(p) = self.props_mut(id) {
            p.visible = visible;
        }
    }

    pub fn set_grayed(&mut self, id: ObjectId, grayed: bool) {
        if let Some(p) = self.props_mut(id) {
            p.grayed = grayed;
        }
    }

    pub fn set_touchable(&mut self, id: ObjectId, touchable: bool) {
        if let Some(p) = self.props_mut(id) {
            p.touchable = touchable;
        }
    }

    pub fn set_color(&mut self, id: ObjectId, color: Color) {
        if let Some(p) = self.props_mut(id) {
            p.color = color;
        }
    }

    pub fn set_text(&mut self, id: ObjectId, text: Option<String>) {
        if let Some(p) = self.props_mut(id) {
            p.text = text;
        }
    }

    pub fn set_icon(&mut self, id: ObjectId, icon: Option<String>) {
        if let Some(p) = self.props_mut(id) {
            p.icon = icon;
        }
    }

    pub fn set_font_size(&mut self, id: ObjectId, size: i32) {
        if let Some(p) = self.props_mut(id) {
            p.font_size = size;
        }
    }

    pub fn set_playing(&mut self, id: ObjectId, playing: bool) {
        if let Some(p) = self.props_mut(id) {
            p.playing = playing;
        }
    }

    pub fn set_frame(&mut self, id: ObjectId, frame: i32) {
        if let Some(p) = self.props_mut(id) {
            p.frame = frame;
        }
    }

    /// Apply an authored property override. Unsupported properties and
    /// unparsable values are ignored.
    pub fn set_property(&mut self, id: ObjectId, property: i16, value: Option<&str>) {
        let owned = value.map(str::to_owned);
        match property {
            0 => self.set_text(id, owned),
            1 => self.set_icon(id, owned),
            2 | 3 => match value.and_then(Color::from_hex) {
                Some(c) if property == 2 => self.set_color(id, c),
                Some(c) => {
                    if let Some(p) = self.props_mut(id) {
                        p.stroke = c;
                    }
                }
                None => debug!("{:?}: bad color override {:?}", id, value),
            },
            4 => self.set_playing(id, value == Some("true")),
            5 => match value.and_then(|v| v.parse().ok()) {
                Some(frame) => self.set_frame(id, frame),
                None => debug!("{:?}: bad frame override {:?}", id, value),
            },
            8 => match value.and_then(|v| v.parse().ok()) {
                Some(size) => self.set_font_size(id, size),
                None => debug!("{:?}: bad font size override {:?}", id, value),
            },
            other => debug!("{:?}: property {} not supported", id, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ControllerData, RelationType, TweenConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller(name: &str, pages: usize) -> Controller {
        controller_with(name, pages, Vec::new())
    }

    fn controller_with(name: &str, pages: usize, actions: Vec<ActionData>) -> Controller {
        let data = ControllerData {
            name: name.into(),
            page_ids: (0..pages).map(|i| i.to_string()).collect(),
            page_names: (0..pages).map(|i| format!("p{}", i)).collect(),
            actions,
            ..Default::default()
        };
        Controller::from_data(&data, &Config::default())
    }

    fn gear(slot: GearSlot, values: Vec<(&str, GearValue)>) -> GearData {
        GearData {
            slot,
            controller: 0,
            values: values.into_iter().map(|(p, v)| (p.to_string(), v)).collect(),
            default: None,
            pages: Vec::new(),
            condition: 0,
            tween: None,
            percent_values: None,
            animation_ext: Vec::new(),
            animation_ext_default: None,
        }
    }

    fn display(slot: GearSlot, pages: &[&str], condition: u8) -> GearData {
        let mut g = gear(slot, Vec::new());
        g.pages = pages.iter().map(|p| p.to_string()).collect();
        g.condition = condition;
        g
    }

    fn linear(duration: f32) -> Option<TweenConfig> {
        Some(TweenConfig { ease: EaseType::Linear, duration, delay: 0.0, custom_path: Vec::new() })
    }

    #[test]
    fn test_font_size_default_fallback() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 2));
        let label = tree.add_child(root, "n1", "label", ObjectType::Text);
        tree.set_font_size(label, 12);
        let mut data = gear(GearSlot::FontSize, vec![("0", GearValue::FontSize(10))]);
        data.default = Some(GearValue::FontSize(5));
        tree.add_gear(label, data, c).unwrap();
        tree.apply_controller(c);
        assert_eq!(tree.props(label).unwrap().font_size, 10);

        tree.set_selected_index(c, 1).unwrap();
        assert_eq!(tree.props(label).unwrap().font_size, 5);
        tree.set_selected_index(c, 0).unwrap();
        assert_eq!(tree.props(label).unwrap().font_size, 10);
    }

    #[test]
    fn test_display2_and_condition() {
        for (condition, expected) in [(0u8, [true, false, false, false]), (1, [true, true, true, false])] {
            let mut tree = Tree::new(Config::default());
            let root = tree.root();
            let a = tree.add_controller(root, controller("a", 2));
            let b = tree.add_controller(root, controller("b", 2));
            let img = tree.add_child(root, "n1", "img", ObjectType::Image);
            tree.add_gear(img, display(GearSlot::Display, &["0"], 0), a).unwrap();
            tree.add_gear(img, display(GearSlot::Display2, &["0"], condition), b).unwrap();

            let mut seen = Vec::new();
            for (ia, ib) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                tree.set_selected_index(a, ia).unwrap();
                tree.set_selected_index(b, ib).unwrap();
                tree.apply_all_controllers(root);
                seen.push(tree.is_visible(img));
            }
            assert_eq!(seen, expected, "condition {}", condition);
        }
    }

    #[test]
    fn test_display_requires_visible_property() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 2));
        let img = tree.add_child(root, "n1", "img", ObjectType::Image);
        tree.add_gear(img, display(GearSlot::Display, &["1"], 0), c).unwrap();
        tree.apply_controller(c);
        assert!(!tree.is_visible(img));
        tree.set_selected_index(c, 1).unwrap();
        assert!(tree.is_visible(img));
        tree.set_visible(img, false);
        assert!(!tree.is_visible(img));
    }

    #[test]
    fn test_xy_tween_interrupted() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 2));
        let btn = tree.add_child(root, "n1", "btn", ObjectType::Graph);
        let mut data = gear(GearSlot::XY, vec![
            ("0", GearValue::XY(Vec2::new(0.0, 0.0))),
            ("1", GearValue::XY(Vec2::new(100.0, 0.0))),
        ]);
        data.tween = linear(1.0);
        tree.add_gear(btn, data, c).unwrap();

        tree.set_selected_index(c, 1).unwrap();
        assert!(tree.is_tweening());
        tree.update(0.5);
        let mid = tree.xy(btn).x;
        assert!(mid > 0.0 && mid < 100.0);

        tree.set_selected_index(c, 0).unwrap();
        for _ in 0..20 {
            tree.update(0.1);
            let x = tree.xy(btn).x;
            assert!((0.0..=mid).contains(&x), "x = {}", x);
        }
        assert_eq!(tree.xy(btn), Vec2::ZERO);
        assert!(!tree.is_tweening());
    }

    #[test]
    fn test_disabled_tweens_apply_synchronously() {
        let mut tree = Tree::new(Config::default().without_tweens());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 2));
        let img = tree.add_child(root, "n1", "img", ObjectType::Image);
        let mut data = gear(GearSlot::Look, vec![(
            "1",
            GearValue::Look { alpha: 0.25, rotation: 45.0, grayed: true, touchable: false },
        )]);
        data.tween = linear(2.0);
        tree.add_gear(img, data, c).unwrap();

        tree.set_selected_index(c, 1).unwrap();
        assert!(!tree.is_tweening());
        let p = tree.props(img).unwrap();
        assert_eq!((p.alpha, p.rotation, p.grayed, p.touchable), (0.25, 45.0, true, false));

        tree.set_selected_index(c, 0).unwrap();
        assert_eq!(tree.props(img).unwrap().alpha, 1.0);
    }

    #[test]
    fn test_look_flags_switch_before_tween_ends() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 2));
        let img = tree.add_child(root, "n1", "img", ObjectType::Image);
        let mut data = gear(GearSlot::Look, vec![(
            "1",
            GearValue::Look { alpha: 0.0, rotation: 0.0, grayed: true, touchable: false },
        )]);
        data.tween = linear(1.0);
        tree.add_gear(img, data, c).unwrap();

        tree.set_selected_index(c, 1).unwrap();
        let p = tree.props(img).unwrap();
        assert!(p.grayed && !p.touchable);
        assert_eq!(p.alpha, 1.0);
        tree.update(1.0);
        assert_eq!(tree.props(img).unwrap().alpha, 0.0);
    }

    #[test]
    fn test_change_page_action() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let source = controller_with("a", 3, vec![ActionData::ChangePage {
            from: Vec::new(),
            to: vec!["2".into()],
            object_id: None,
            controller: "b".into(),
            target_page: "1".into(),
        }]);
        // Page names are matched by "~2".
        let names = controller_with("b", 3, vec![ActionData::ChangePage {
            from: Vec::new(),
            to: Vec::new(),
            object_id: None,
            controller: "a".into(),
            target_page: "~2".into(),
        }]);
        let a = tree.add_controller(root, source);
        let b = tree.add_controller(root, names);

        tree.set_selected_index(a, 2).unwrap();
        assert_eq!(tree.controller(b).unwrap().selected_index(), 1);
        // b's own action fired while a was changing and was skipped.
        assert_eq!(tree.controller(a).unwrap().selected_index(), 2);

        let events = tree.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], TreeEvent::ControllerChanged { controller, .. } if controller == "b"));
        assert!(tree.drain_events().is_empty());
    }

    #[test]
    fn test_transition_actions() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = controller_with("c", 2, vec![ActionData::PlayTransition {
            from: Vec::new(),
            to: vec!["1".into()],
            transition: "open".into(),
            play_times: 1,
            delay: 0.0,
            stop_on_exit: true,
        }]);
        let c = tree.add_controller(root, c);
        tree.set_selected_index(c, 1).unwrap();
        tree.set_selected_index(c, 0).unwrap();
        let events: Vec<_> = tree
            .drain_events()
            .into_iter()
            .filter(|e| !matches!(e, TreeEvent::ControllerChanged { .. }))
            .collect();
        assert_eq!(events, vec![
            TreeEvent::PlayTransition { owner: root, transition: "open".into(), play_times: 1, delay: 0.0 },
            TreeEvent::StopTransition { owner: root, transition: "open".into() },
        ]);
    }

    #[test]
    fn test_listener_sees_change() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let c = tree.add_controller(root, controller("c", 3));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        tree.add_controller_listener(c, move |ch| log.borrow_mut().push(ch.selected_index)).unwrap();
        assert!(tree.set_selected_page_name(c, "p2").unwrap());
        assert!(!tree.set_selected_page_name(c, "p2").unwrap());
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_relation_cascade() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        tree.set_size(root, Vec2::new(100.0, 100.0));
        let panel = tree.add_child(root, "n1", "panel", ObjectType::Component);
        tree.set_size(panel, Vec2::new(100.0, 50.0));
        let label = tree.add_child(panel, "n2", "label", ObjectType::Text);
        tree.set_xy(label, Vec2::new(90.0, 0.0));
        tree.set_size(label, Vec2::new(10.0, 10.0));

        let rel = |kind| RelationDef { kind, percent: false };
        tree.add_relation(panel, root, &[rel(RelationType::Width)]).unwrap();
        tree.add_relation(label, panel, &[rel(RelationType::RightRight)]).unwrap();

        tree.set_size(root, Vec2::new(160.0, 100.0));
        assert_eq!(tree.size(panel), Vec2::new(160.0, 50.0));
        assert_eq!(tree.xy(label), Vec2::new(150.0, 0.0));
    }

    #[test]
    fn test_sibling_cycle_terminates() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let a = tree.add_child(root, "n1", "a", ObjectType::Graph);
        let b = tree.add_child(root, "n2", "b", ObjectType::Graph);
        let rel = RelationDef { kind: RelationType::LeftLeft, percent: false };
        tree.add_relation(a, b, &[rel]).unwrap();
        tree.add_relation(b, a, &[rel]).unwrap();
        tree.set_xy(a, Vec2::new(10.0, 0.0));
        assert_eq!(tree.xy(b), Vec2::new(10.0, 0.0));
        assert_eq!(tree.xy(a), Vec2::new(10.0, 0.0));
        tree.set_xy(b, Vec2::new(4.0, 0.0));
        assert_eq!(tree.xy(a), Vec2::new(4.0, 0.0));
        assert!(tree.add_relation(a, a, &[rel]).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let mut config = Config::default();
        config.max_relation_depth = 2;
        let mut tree = Tree::new(config);
        let root = tree.root();
        let ids: Vec<_> = (0..4).map(|i| tree.add_child(root, &format!("n{}", i), "x", ObjectType::Graph)).collect();
        let rel = RelationDef { kind: RelationType::LeftLeft, percent: false };
        for w in ids.windows(2) {
            tree.add_relation(w[1], w[0], &[rel]).unwrap();
        }
        tree.set_xy(ids[0], Vec2::new(5.0, 0.0));
        assert_eq!(tree.xy(ids[1]).x, 5.0);
        assert_eq!(tree.xy(ids[2]).x, 5.0);
        assert_eq!(tree.xy(ids[3]).x, 0.0);
    }

    #[test]
    fn test_property_overrides_and_paths() {
        let mut tree = Tree::new(Config::default());
        let root = tree.root();
        let panel = tree.add_child(root, "n1", "panel", ObjectType::Component);
        let title = tree.add_child(panel, "n2", "title", ObjectType::Text);
        assert_eq!(tree.child_by_path(root, "panel.title"), Some(title));
        assert_eq!(tree.child_by_path(root, "panel.nope"), None);

        tree.set_property(title, 0, Some("Hello"));
        tree.set_property(title, 2, Some("#ff0000"));
        tree.set_property(title, 8, Some("24"));
        tree.set_property(title, 8, Some("big"));
        tree.set_property(title, 99, Some("x"));
        let p = tree.props(title).unwrap();
        assert_eq!(p.text.as_deref(), Some("Hello"));
        assert_eq!(p.color, Color::rgba(255, 0, 0, 255));
        assert_eq!(p.font_size, 24);
    }
}
