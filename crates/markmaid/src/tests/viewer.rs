use super::EchoEngine;
use crate::view::EventOutcome;
use crate::*;
use futures::executor::block_on;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct RecordingHost {
    launched: Rc<RefCell<Vec<String>>>,
}

impl Host for RecordingHost {
    fn launch_url(&self, url: &str) {
        self.launched.borrow_mut().push(url.to_string());
    }
}

fn viewer_with(markdown: &str) -> Viewer {
    let mut viewer = Viewer::default();
    viewer.set_data_view(Some(&DataView::single(markdown)));
    viewer
}

fn type_text(viewer: &mut Viewer, text: &str) {
    for c in text.chars() {
        viewer.on_key(KeyEvent::new(Key::Char(c)));
    }
}

#[test]
fn empty_content_shows_tutorial() {
    let viewer = Viewer::default();
    let html = viewer.render_html();
    assert!(html.contains("<h4>No Markdown Content</h4>"), "{html}");

    let quiet = Viewer::new(
        MarkmaidSettings::from_value(json!({ "view": { "showEmptyMessage": false } })).unwrap(),
    );
    assert_eq!(quiet.render_html(), "");
}

#[test]
fn whitespace_only_content_counts_as_empty() {
    let viewer = viewer_with("  \n\t ");
    assert!(viewer.is_empty());
    assert!(viewer.render_html().contains("tutorial"));
}

#[test]
fn column_rows_are_joined_into_one_document() {
    let mut viewer = Viewer::default();
    viewer.set_data_view(Some(&DataView::column(vec![
        json!("# One"),
        json!(null),
        json!("   "),
        json!("Two"),
    ])));
    assert_eq!(viewer.content(), "# One\n\n---\n\nTwo");
    let html = viewer.render_html();
    assert!(html.contains("<h1>One</h1>"), "{html}");
    assert!(html.contains("<hr />"), "{html}");
}

#[test]
fn viewport_sizes_the_scroll_container() {
    let mut viewer = viewer_with("hi");
    viewer.set_viewport(Viewport::new(640.0, 480.0));
    assert!(
        viewer
            .render_html()
            .contains("style=\"width: 640px; height: 480px; overflow-y: auto\"")
    );
}

#[test]
fn find_shortcut_opens_search_and_keys_drive_it() {
    let mut viewer = viewer_with("cat cat dog cat");

    assert_eq!(viewer.on_key(KeyEvent::new(Key::Char('c'))), EventOutcome::Ignored);
    assert!(!viewer.search().is_open());

    assert_eq!(
        viewer.on_key(KeyEvent::new(Key::Char('f')).ctrl()),
        EventOutcome::HandledPreventDefault
    );
    assert!(viewer.search().is_open());
    assert_eq!(viewer.search().status(), None);

    type_text(&mut viewer, "cat");
    assert_eq!(viewer.search().status().as_deref(), Some("1/3"));

    viewer.on_key(KeyEvent::new(Key::Enter));
    assert_eq!(viewer.search().status().as_deref(), Some("2/3"));
    viewer.on_key(KeyEvent::new(Key::Enter).shift());
    viewer.on_key(KeyEvent::new(Key::Enter).shift());
    assert_eq!(viewer.search().status().as_deref(), Some("3/3"));

    viewer.on_key(KeyEvent::new(Key::Backspace));
    assert_eq!(viewer.search().query(), "ca");
    assert_eq!(viewer.search().status().as_deref(), Some("1/3"));

    viewer.on_key(KeyEvent::new(Key::Escape));
    assert!(!viewer.search().is_open());
    assert_eq!(viewer.search().query(), "");
    assert!(!viewer.render_html().contains("<mark"));
}

#[test]
fn meta_f_also_opens_search() {
    let mut viewer = viewer_with("x");
    viewer.on_key(KeyEvent::new(Key::Char('F')).meta());
    assert!(viewer.search().is_open());
}

#[test]
fn no_match_reports_zero_results() {
    let mut viewer = viewer_with("nothing to see");
    viewer.open_search();
    assert_eq!(viewer.set_query("zebra"), 0);
    assert_eq!(viewer.search().status().as_deref(), Some("0 results"));
    assert!(viewer.render_html().contains("<span class=\"search-status\">0 results</span>"));
}

#[test]
fn new_content_reruns_the_open_search() {
    let mut viewer = viewer_with("one fish");
    viewer.open_search();
    viewer.set_query("fish");
    assert_eq!(viewer.search().count(), 1);

    viewer.set_data_view(Some(&DataView::single("red fish blue fish")));
    assert_eq!(viewer.search().count(), 2);
    assert_eq!(viewer.search().current(), 1);
}

#[test]
fn link_clicks_go_through_the_host() {
    let host = RecordingHost::default();
    let mut viewer = viewer_with("[docs](https://example.com/docs)");

    assert!(!viewer.on_link_click("https://example.com/docs").unwrap());

    viewer.set_host(host.clone());
    assert!(viewer.on_link_click("https://example.com/docs").unwrap());
    assert_eq!(*host.launched.borrow(), vec!["https://example.com/docs"]);

    assert!(matches!(
        viewer.on_link_click("javascript:alert(1)"),
        Err(Error::UnsupportedLink { .. })
    ));
    assert!(matches!(
        viewer.on_link_click("#section"),
        Err(Error::InvalidLink { .. })
    ));
    assert_eq!(host.launched.borrow().len(), 1);
}

#[test]
fn debug_panel_follows_settings() {
    let mut viewer = viewer_with("```mermaid\ngraph TD\n```");
    assert!(!viewer.debug_log().is_enabled());

    let mut settings = viewer.settings().clone();
    settings.view.show_debug_panel = true;
    viewer.set_settings(settings);
    assert!(viewer.debug_log().is_enabled());

    block_on(viewer.render_diagrams(&EchoEngine::default()));
    let html = viewer.render_html();
    assert!(html.contains("<div class=\"debug-panel\">"), "{html}");
    assert!(html.contains("<strong>Processed mermaid code</strong>"), "{html}");
    assert!(
        html.contains("<div class=\"debug-raw\"><pre>```mermaid\ngraph TD\n```</pre></div>"),
        "{html}"
    );
}

#[test]
fn debug_panel_shows_escaped_markdown_source() {
    let mut settings = MarkmaidSettings::default();
    settings.view.show_debug_panel = true;
    let mut viewer = Viewer::new(settings);
    assert!(viewer.render_html().contains("<pre>(No markdown content)</pre>"));

    viewer.set_data_view(Some(&DataView::single("a <b> & c")));
    let html = viewer.render_html();
    assert!(
        html.contains("<div class=\"debug-raw\"><pre>a &lt;b&gt; &amp; c</pre></div>"),
        "{html}"
    );
}

#[test]
fn viewer_renders_diagrams_once_per_change() {
    let engine = EchoEngine::default();
    let mut viewer = viewer_with("```mermaid\ngraph TD\n```");
    block_on(viewer.render_diagrams(&engine));
    viewer.set_viewport(Viewport::new(100.0, 100.0));
    block_on(viewer.render_diagrams(&engine));
    assert_eq!(engine.call_count(), 1);

    viewer.set_data_view(Some(&DataView::single("```mermaid\ngraph LR\n```")));
    block_on(viewer.render_diagrams(&engine));
    assert_eq!(engine.sources(), vec!["graph TD\n", "graph LR\n"]);
}

#[test]
fn unmount_stops_everything() {
    let engine = EchoEngine::default();
    let mut viewer = viewer_with("```mermaid\ngraph TD\n```");
    viewer.unmount();
    assert_eq!(block_on(viewer.render_diagrams(&engine)), 0);
    assert!(!viewer.debug_log().is_enabled());
}
