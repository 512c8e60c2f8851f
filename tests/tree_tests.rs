//! Integration tests building live trees from encoded packages.

use std::sync::Arc;

use fgui::component::{GearSlot, HomePage};
use fgui::fixture::*;
use fgui::prelude::*;

fn build(fixture: PackageFixture, root: &str, config: Config) -> (Tree, Arc<Package>) {
    let package = Package::decode(fixture.build(), &config).expect("package decodes");
    let mut registry = Registry::new();
    registry.add(package.clone());
    let item = package.item_by_name(root).expect("root item").clone();
    let tree = Tree::build(&registry, &item, config).expect("tree builds");
    (tree, package)
}

/// Window with a tab controller driving a sub controller, a tab-bound
/// badge and a sized body glued to the window edges.
fn window() -> PackageFixture {
    let mut tab = ControllerFixture::new("tab", &["home", "shop", "bag"]);
    tab.actions.push(ActionFixture::ChangePage {
        from: Vec::new(),
        to: vec!["2".into()],
        object_id: None,
        controller: "sub".into(),
        target_page: "~1".into(),
    });
    tab.actions.push(ActionFixture::PlayTransition {
        from: Vec::new(),
        to: vec!["1".into()],
        name: "flash".into(),
        stop_on_exit: true,
    });
    let sub = ControllerFixture::new("sub", &["x", "y", "z"]);

    let badge = ChildFixture::graph("n1", "badge", (0, 0), (16, 16))
        .gear(GearFixture::display(1, &["2"]))
        .gear(GearFixture::display2(0, &["2"], 0));
    let body = ChildFixture::graph("n2", "body", (10, 10), (280, 180))
        .relation(RelationFixture::new(-1, &[(19, false), (23, false)]));
    let mut title = ChildFixture::graph("n3", "title", (10, 0), (100, 20))
        .gear(GearFixture {
            slot: 9,
            controller: 0,
            values: vec![("1".into(), GearValueFixture::Int(18))],
            default: Some(GearValueFixture::Int(12)),
            ..Default::default()
        });
    title.object_type = 6;

    let win = ComponentFixture::new(300, 200)
        .controller(tab)
        .controller(sub)
        .child(badge)
        .child(body)
        .child(title);
    PackageFixture::new("pkg00001", "Main").item(ItemFixture::component("comp01", "Window", win))
}

#[test]
fn test_window_builds() {
    let (tree, _pkg) = build(window(), "Window", Config::default());
    let root = tree.root();
    assert_eq!(tree.node(root).unwrap().name(), "Window");
    assert_eq!(tree.children(root).len(), 3);

    let title = tree.child_by_name(root, "title").unwrap();
    assert_eq!(tree.node(title).unwrap().object_type(), ObjectType::Text);
    assert_eq!(tree.props(title).unwrap().font_size, 12);
    assert!(!tree.is_visible(tree.child_by_name(root, "badge").unwrap()));
}

#[test]
fn test_change_page_action_and_display_and() {
    let (mut tree, _pkg) = build(window(), "Window", Config::default());
    let root = tree.root();
    let tab = tree.controller_by_name(root, "tab").unwrap();
    let sub = tree.controller_by_name(root, "sub").unwrap();
    let badge = tree.child_by_name(root, "badge").unwrap();

    // Only sub alone on its third page: Display passes, Display2 fails.
    tree.set_selected_index(sub, 2).unwrap();
    assert!(!tree.is_visible(badge));

    // Entering tab page "2" copies its index onto sub, both gears pass.
    tree.set_selected_index(sub, 0).unwrap();
    tree.set_selected_index(tab, 2).unwrap();
    assert_eq!(tree.controller(sub).unwrap().selected_index(), 2);
    assert!(tree.is_visible(badge));

    tree.set_selected_index(tab, 0).unwrap();
    assert!(!tree.is_visible(badge));
    assert_eq!(tree.controller(sub).unwrap().selected_index(), 2);
}

#[test]
fn test_font_size_follows_tab() {
    let (mut tree, _pkg) = build(window(), "Window", Config::default());
    let root = tree.root();
    let tab = tree.controller_by_name(root, "tab").unwrap();
    let title = tree.child_by_name(root, "title").unwrap();

    tree.set_selected_page_name(tab, "shop").unwrap();
    assert_eq!(tree.props(title).unwrap().font_size, 18);
    tree.set_selected_page_name(tab, "bag").unwrap();
    assert_eq!(tree.props(title).unwrap().font_size, 12);
    assert!(tree.gear(title, GearSlot::FontSize).is_some());
}

#[test]
fn test_events_after_build() {
    let (mut tree, _pkg) = build(window(), "Window", Config::default());
    let root = tree.root();
    let tab = tree.controller_by_name(root, "tab").unwrap();
    assert!(tree.drain_events().is_empty());

    tree.set_selected_index(tab, 1).unwrap();
    tree.set_selected_index(tab, 0).unwrap();
    let events = tree.drain_events();
    assert!(events.contains(&TreeEvent::PlayTransition {
        owner: root,
        transition: "flash".into(),
        play_times: 1,
        delay: 0.0,
    }));
    assert!(events.contains(&TreeEvent::StopTransition { owner: root, transition: "flash".into() }));
    assert_eq!(
        events.iter().filter(|e| matches!(e, TreeEvent::ControllerChanged { .. })).count(),
        2
    );
}

#[test]
fn test_root_resize_moves_glued_children() {
    let (mut tree, _pkg) = build(window(), "Window", Config::default());
    let root = tree.root();
    let body = tree.child_by_name(root, "body").unwrap();

    tree.set_size(root, Vec2::new(400.0, 260.0));
    // RightExtRight and BottomExtBottom keep the margins to the parent edges.
    assert_eq!(tree.rect(body), Rect::new(10.0, 10.0, 380.0, 240.0));

    tree.set_size(root, Vec2::new(400.0, 260.0));
    assert_eq!(tree.rect(body), Rect::new(10.0, 10.0, 380.0, 240.0));

    tree.set_size(root, Vec2::new(5.0, 5.0));
    assert_eq!(tree.size(body), Vec2::ZERO);
}

#[test]
fn test_home_page_from_branch() {
    let mut lang = ControllerFixture::new("lang", &["en", "de"]);
    lang.home_page = HomePage::Branch;
    let label = ChildFixture::graph("n1", "hello", (0, 0), (10, 10)).gear(GearFixture::display(0, &["1"]));
    let root = ComponentFixture::new(10, 10).controller(lang).child(label);
    let fixture = PackageFixture::new("pkg00001", "Main").item(ItemFixture::component("comp01", "Root", root));

    let (tree, _pkg) = build(fixture, "Root", Config::default().with_branch("de"));
    let lang = tree.controller_by_name(tree.root(), "lang").unwrap();
    assert_eq!(tree.controller(lang).unwrap().selected_page_id(), Some("1"));
    assert_eq!(tree.controller(lang).unwrap().selected_page(), Some("de"));
    assert!(tree.is_visible(tree.child_by_name(tree.root(), "hello").unwrap()));
}
