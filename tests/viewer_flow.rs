//! End-to-end viewer behavior against the in-memory engine

use std::path::Path;

use slateview::config::ViewerConfig;
use slateview::geometry::{ClientPoint, PagePoint, PageRect};
use slateview::testkit::{FakeEngine, FakePage, form_object, image_object};
use slateview::viewer::ViewerEvent;
use slateview::{HitTest, Modifiers, Viewer};

/// A letter page with a link around page point (75, 267) targeting page 1,
/// two overlapping images and a text run.
fn letter_with_content() -> FakePage {
    FakePage::letter()
        .link(PageRect::new(60.0, 250.0, 90.0, 280.0), 1)
        .image(1, PageRect::new(300.0, 300.0, 400.0, 400.0))
        .image(2, PageRect::new(350.0, 350.0, 450.0, 450.0))
        .text(PagePoint::new(100.0, 700.0), "hello world")
}

fn open_viewer(engine: FakeEngine) -> Viewer<FakeEngine> {
    let mut viewer = Viewer::new(engine, ViewerConfig::default());
    viewer.on_resize(800, 600);
    viewer
        .open_document(Path::new("/docs/fixture.pdf"))
        .expect("open");
    viewer
}

#[test]
fn open_initializes_viewport_state() {
    let viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));

    let status = viewer.status().unwrap();
    assert_eq!(status.page_index, 0);
    assert_eq!(status.page_count, 2);
    assert_eq!(status.zoom, 1.0);

    let viewport = viewer.viewport().unwrap();
    assert_eq!(viewport.page_px_width, 816);
    assert_eq!(viewport.page_px_height, 1056);
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (0, 0));
}

#[test]
fn click_on_link_navigates_to_destination_page() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));

    // Client (100, 700) at 96 dpi / zoom 1 is page point (75, 267).
    let point = ClientPoint::new(100, 700);
    viewer.handle_pointer_down(point, Modifiers::NONE);
    let event = viewer.handle_pointer_up(point);

    assert_eq!(event, Some(ViewerEvent::NavigatedTo { page: 1 }));
    assert_eq!(viewer.current_page(), Some(1));
    let viewport = viewer.viewport().unwrap();
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (0, 0));
}

#[test]
fn link_navigation_respects_sidebar_origin() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));
    viewer.set_content_origin(220, 0);

    let point = ClientPoint::new(100 + 220, 700);
    viewer.handle_pointer_down(point, Modifiers::NONE);
    let event = viewer.handle_pointer_up(point);
    assert_eq!(event, Some(ViewerEvent::NavigatedTo { page: 1 }));
}

#[test]
fn zoom_to_cursor_scrolls_to_keep_anchor_fixed() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    viewer.zoom(2.0, Some(ClientPoint::new(400, 300)));

    let viewport = viewer.viewport().unwrap();
    assert_eq!(viewport.zoom, 2.0);
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (400, 300));
}

#[test]
fn click_and_drag_are_disambiguated_by_distance() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    // Identical down/up coordinates: click, no selection.
    let point = ClientPoint::new(500, 500);
    viewer.handle_pointer_down(point, Modifiers::NONE);
    let event = viewer.handle_pointer_up(point);
    assert_eq!(event, None);
    assert_eq!(viewer.selected_text(), None);

    // A 5 px diagonal drag produces a selection.
    viewer.handle_pointer_down(point, Modifiers::NONE);
    viewer.handle_pointer_move(ClientPoint::new(505, 505), Modifiers::NONE);
    let event = viewer.handle_pointer_up(ClientPoint::new(505, 505));
    assert_eq!(event, Some(ViewerEvent::SelectionChanged));
    assert!(viewer.selected_text().is_some());
}

#[test]
fn drag_selection_extracts_bounded_text() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    // Client (100,100)-(300,200) covers page x 75..225, y 642..717; the
    // "hello world" run sits at (100, 700).
    viewer.handle_pointer_down(ClientPoint::new(100, 100), Modifiers::NONE);
    viewer.handle_pointer_move(ClientPoint::new(300, 200), Modifiers::NONE);
    let event = viewer.handle_pointer_up(ClientPoint::new(300, 200));

    assert_eq!(event, Some(ViewerEvent::SelectionChanged));
    assert_eq!(viewer.selected_text(), Some("hello world"));
}

#[test]
fn selection_outside_text_is_active_but_empty() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    viewer.handle_pointer_down(ClientPoint::new(600, 20), Modifiers::NONE);
    viewer.handle_pointer_move(ClientPoint::new(700, 80), Modifiers::NONE);
    viewer.handle_pointer_up(ClientPoint::new(700, 80));

    assert_eq!(viewer.selected_text(), Some(""));
    // Copying an empty selection is a no-op.
    assert_eq!(viewer.copy_selection_to_clipboard().unwrap(), false);
}

#[test]
fn page_change_clears_selection() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));

    viewer.handle_pointer_down(ClientPoint::new(100, 100), Modifiers::NONE);
    viewer.handle_pointer_move(ClientPoint::new(300, 200), Modifiers::NONE);
    viewer.handle_pointer_up(ClientPoint::new(300, 200));
    assert!(viewer.selected_text().is_some());

    viewer.set_page(1).unwrap();
    assert_eq!(viewer.selected_text(), None);
}

#[test]
fn ctrl_drag_pans_instead_of_selecting() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));
    viewer.zoom(2.0, None);
    viewer.scroll_by(100, 100);

    viewer.handle_pointer_down(ClientPoint::new(400, 300), Modifiers::CTRL);
    viewer.handle_pointer_move(ClientPoint::new(420, 330), Modifiers::CTRL);
    let event = viewer.handle_pointer_up(ClientPoint::new(420, 330));

    assert_eq!(event, None);
    assert_eq!(viewer.selected_text(), None);
    let viewport = viewer.viewport().unwrap();
    // Content follows the pointer: scroll decreased by the pointer delta.
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (80, 70));
}

#[test]
fn wheel_scrolls_and_ctrl_wheel_zooms() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    viewer.handle_wheel(-120, ClientPoint::new(400, 300), Modifiers::NONE);
    assert_eq!(viewer.viewport().unwrap().scroll_y, 30);

    let before = viewer.zoom_factor().unwrap();
    viewer.handle_wheel(120, ClientPoint::new(400, 300), Modifiers::CTRL);
    assert!(viewer.zoom_factor().unwrap() > before);
}

#[test]
fn render_requests_only_the_visible_region() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));
    viewer.zoom(8.0, None);
    viewer.scroll_by(1000, 2000);

    let rendered = viewer.render().unwrap().unwrap();
    assert_eq!(rendered.frame.width, 800);
    assert_eq!(rendered.frame.height, 600);

    let request = viewer.engine().last_request().unwrap();
    assert_eq!(request.out_width, 800);
    assert_eq!(request.out_height, 600);
    // The page itself is far larger than the requested raster.
    assert!(request.page_px_width > 6000);
    let viewport = viewer.viewport().unwrap();
    assert_eq!(request.offset_x, -viewport.scroll_x);
    assert_eq!(request.offset_y, -viewport.scroll_y);
}

#[test]
fn identical_state_renders_hit_the_cache() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    let first = viewer.render().unwrap().unwrap();
    assert!(!first.stats.cached);
    let second = viewer.render().unwrap().unwrap();
    assert!(second.stats.cached);
    assert_eq!(viewer.engine().render_count(), 1);

    viewer.scroll_by(0, 50);
    let third = viewer.render().unwrap().unwrap();
    assert!(!third.stats.cached);
    assert_eq!(viewer.engine().render_count(), 2);
}

#[test]
fn hit_test_prefers_topmost_image_in_overlap() {
    let viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    // Page point (375, 375) lies in both images; client y for page y 375 at
    // 96 dpi is (792 - 375) * 96/72 = 556.
    let point = ClientPoint::new(500, 556);
    match viewer.hit_test(point).unwrap() {
        HitTest::Image { handle, .. } => assert_eq!(handle, 2),
        other => panic!("expected image hit, got {other:?}"),
    }
}

#[test]
fn draw_order_preference_is_configurable() {
    let mut config = ViewerConfig::default();
    config.topmost_image_wins = false;
    let mut viewer = Viewer::new(FakeEngine::single_page(letter_with_content()), config);
    viewer.on_resize(800, 600);
    viewer.open_document(Path::new("/docs/fixture.pdf")).unwrap();

    match viewer.hit_test(ClientPoint::new(500, 556)).unwrap() {
        HitTest::Image { handle, .. } => assert_eq!(handle, 1),
        other => panic!("expected image hit, got {other:?}"),
    }
}

#[test]
fn images_inside_forms_hit_through_composed_transforms() {
    let page = FakePage::letter().object(form_object(
        vec![image_object(5, PageRect::new(0.0, 0.0, 50.0, 50.0))],
        slateview::geometry::Transform::translate(200.0, 600.0),
    ));
    let viewer = open_viewer(FakeEngine::single_page(page));

    // Page point (225, 625): client x = 225*96/72 = 300, y = (792-625)*4/3.
    let client_y = ((792.0 - 625.0) * 96.0 / 72.0) as i32;
    match viewer.hit_test(ClientPoint::new(300, client_y)).unwrap() {
        HitTest::Image { handle, .. } => assert_eq!(handle, 5),
        other => panic!("expected image hit, got {other:?}"),
    }
}

#[test]
fn hit_test_misses_return_none() {
    let viewer = open_viewer(FakeEngine::single_page(FakePage::letter()));
    assert!(viewer.hit_test(ClientPoint::new(10, 10)).unwrap().is_none());
}

#[test]
fn failed_page_switch_leaves_viewport_untouched() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));
    viewer.scroll_by(30, 40);

    viewer.engine().fail_page_size_for.set(Some(1));
    assert!(viewer.set_page(1).is_err());

    let viewport = viewer.viewport().unwrap();
    assert_eq!(viewport.page_index, 0);
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (30, 40));
}

#[test]
fn failed_open_keeps_previous_document() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    viewer.engine().fail_load.set(true);
    assert!(viewer.open_document(Path::new("/docs/other.pdf")).is_err());

    assert!(viewer.has_document());
    assert_eq!(viewer.document_path(), Some(Path::new("/docs/fixture.pdf")));
    // The previous document was never torn down.
    assert_eq!(viewer.engine().closed_docs.get(), 0);
}

#[test]
fn reopen_tears_down_previous_document_even_when_teardown_faults() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));
    viewer.set_page(1).unwrap();
    viewer.engine().fail_close.set(true);

    viewer.open_document(Path::new("/docs/fixture.pdf")).unwrap();

    assert_eq!(viewer.engine().closed_docs.get(), 1);
    // Fresh document state despite the teardown fault.
    let status = viewer.status().unwrap();
    assert_eq!(status.page_index, 0);
    assert_eq!(status.zoom, 1.0);
}

#[test]
fn navigation_clamps_at_document_edges() {
    let mut viewer = open_viewer(FakeEngine::new(vec![letter_with_content(), FakePage::letter()]));

    viewer.prev_page().unwrap();
    assert_eq!(viewer.current_page(), Some(0));

    viewer.last_page().unwrap();
    assert_eq!(viewer.current_page(), Some(1));

    viewer.next_page().unwrap();
    assert_eq!(viewer.current_page(), Some(1));

    viewer.first_page().unwrap();
    assert_eq!(viewer.current_page(), Some(0));
}

#[test]
fn heterogeneous_page_sizes_rederive_pixels() {
    let mut viewer = open_viewer(FakeEngine::new(vec![
        letter_with_content(),
        FakePage::with_size(306.0, 396.0),
    ]));

    viewer.set_page(1).unwrap();
    let viewport = viewer.viewport().unwrap();
    assert_eq!(viewport.page_px_width, 408);
    assert_eq!(viewport.page_px_height, 528);
}

#[test]
fn zooming_out_clamps_scroll_back_to_origin() {
    let mut viewer = open_viewer(FakeEngine::single_page(letter_with_content()));
    viewer.scroll_by(500, 500);

    viewer.zoom(0.1, None);

    let viewport = viewer.viewport().unwrap();
    assert_eq!((viewport.scroll_x, viewport.scroll_y), (0, 0));
}

#[test]
fn image_export_writes_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("picked.png");
    let viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    let written = viewer.export_image_at(ClientPoint::new(500, 556), &out).unwrap();
    assert_eq!(written, Some(slateview::export::ExportFormat::Png));
    assert!(out.exists());

    // No image under the point: no file, no error.
    let missing = dir.path().join("missing.png");
    let written = viewer.export_image_at(ClientPoint::new(10, 10), &missing).unwrap();
    assert_eq!(written, None);
    assert!(!missing.exists());
}

#[test]
fn page_export_rasterizes_the_full_page() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("page.png");
    let viewer = open_viewer(FakeEngine::single_page(letter_with_content()));

    viewer.export_current_page_png(&out).unwrap();
    assert!(out.exists());

    let request = viewer.engine().last_request().unwrap();
    assert_eq!(request.out_width, 816);
    assert_eq!(request.out_height, 1056);
    assert_eq!((request.offset_x, request.offset_y), (0, 0));
}
