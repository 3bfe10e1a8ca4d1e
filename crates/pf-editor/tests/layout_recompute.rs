//! Integration tests: working sizes following layout changes.

use pf_core::{BoxMetrics, Document, Insets, NodeId, PropKeys, PropPatch, Size, StaticLayout};
use pf_editor::{EditorConfig, EditorSession, Handle, Point};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

fn base_layout() -> StaticLayout {
    StaticLayout::new()
        .with(NodeId::root(), 1000.0, 800.0)
        .with(id("frame"), 500.0, 400.0)
        .with(id("tile_px"), 100.0, 80.0)
        .with(id("tile_pct"), 100.0, 50.0)
        .with(id("auto_box"), 300.0, 200.0)
        .with(id("inner"), 150.0, 20.0)
}

fn make_session(mounted: &[&str], probe: &StaticLayout) -> EditorSession {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Document::from_json(include_str!("fixtures/page.json")).unwrap();
    let mut session = EditorSession::new(doc, EditorConfig::default());
    for node in mounted {
        assert!(session.mount(id(node), PropKeys::default(), probe));
    }
    session
}

#[test]
fn percentage_follows_parent_resize() {
    let mut probe = base_layout();
    let mut s = make_session(&["tile_pct", "tile_px"], &probe);
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(100.0, 50.0)));

    probe.set(id("frame"), BoxMetrics::plain(800.0, 400.0));
    s.notify_layout_change(ms(0));
    assert!(s.tick(ms(0), &probe).recomputed.is_empty());

    let report = s.tick(ms(1), &probe);
    assert!(report.recomputed.contains(&id("tile_pct")));
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(160.0, 50.0)));
    // Pixel sizes do not depend on the parent.
    assert_eq!(s.working_size(id("tile_px")), Some(Size::new(100.0, 80.0)));
    // Committed props are untouched.
    assert_eq!(
        s.document().get(id("tile_pct")).unwrap().prop_str("width"),
        Some("20%")
    );
    assert!(!s.can_undo());
}

#[test]
fn notifications_coalesce() {
    let probe = base_layout();
    let mut s = make_session(&["tile_pct"], &probe);
    s.notify_layout_change(ms(0));
    s.notify_layout_change(ms(1));
    s.notify_layout_change(ms(2));
    assert!(s.tick(ms(2), &probe).recomputed.is_empty());
    assert_eq!(s.tick(ms(3), &probe).recomputed, vec![id("tile_pct")]);
    assert!(s.tick(ms(4), &probe).recomputed.is_empty());
}

#[test]
fn node_under_gesture_is_skipped() {
    let mut probe = base_layout();
    let mut s = make_session(&["tile_pct", "tile_px"], &probe);
    s.select(id("tile_pct"));
    s.begin_resize(id("tile_pct"), Handle::Right, Point::default(), &probe)
        .unwrap();
    s.pointer_move(Point::new(30.0, 0.0), ms(0), &probe).unwrap();

    probe.set(id("frame"), BoxMetrics::plain(250.0, 400.0));
    s.notify_layout_change(ms(10));
    let report = s.tick(ms(11), &probe);
    assert!(!report.recomputed.contains(&id("tile_pct")));
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(130.0, 50.0)));
}

#[test]
fn unmounted_nodes_are_not_recomputed() {
    let mut probe = base_layout();
    let mut s = make_session(&["tile_pct"], &probe);
    assert!(s.unmount(id("tile_pct")));

    probe.set(id("frame"), BoxMetrics::plain(800.0, 400.0));
    s.notify_layout_change(ms(0));
    assert!(s.tick(ms(5), &probe).recomputed.is_empty());
    assert_eq!(s.working_size(id("tile_pct")), None);
}

#[test]
fn percentages_resolve_against_content_box() {
    let mut probe = base_layout();
    probe.set(
        id("frame"),
        BoxMetrics::plain(500.0, 400.0).with_padding(Insets::uniform(50.0)),
    );
    let s = make_session(&["tile_pct"], &probe);
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(80.0, 50.0)));
}

#[test]
fn auto_dimensions_fill_parent() {
    let probe = base_layout();
    let s = make_session(&["auto_box"], &probe);
    assert_eq!(s.working_size(id("auto_box")), Some(Size::new(1000.0, 800.0)));
}

#[test]
fn detached_parent_measures_zero() {
    let mut probe = base_layout();
    probe.remove(id("frame"));
    let s = make_session(&["tile_pct"], &probe);
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(0.0, 50.0)));
}

#[test]
fn negative_dimensions_render_as_zero() {
    let probe = base_layout();
    let mut s = make_session(&["tile_px", "tile_pct"], &probe);
    s.set_props(id("tile_px"), PropPatch::new().set("width", "-5px"), None, ms(0))
        .unwrap();
    s.set_props(id("tile_pct"), PropPatch::new().set("height", "-10%"), None, ms(0))
        .unwrap();
    s.tick(ms(0), &probe);
    assert_eq!(s.working_size(id("tile_px")), Some(Size::new(0.0, 80.0)));
    assert_eq!(s.working_size(id("tile_pct")), Some(Size::new(100.0, 0.0)));
}
