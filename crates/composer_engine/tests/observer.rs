use std::rc::Rc;
use std::time::Duration;

use composer_core::GenerationRequest;
use composer_engine::{
    Document, GenerationError, LocatorList, LogNoticeSink, MutationRecord, NodeId, Page,
    PageConfig, ReplyGenerator, SurfaceObserver, DEFAULT_SURFACE_MARKERS,
};
use pretty_assertions::assert_eq;
use tokio::task::LocalSet;

struct FixedGenerator;

#[async_trait::async_trait]
impl ReplyGenerator for FixedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok("unused".to_string())
    }
}

const DELAY_MS: u64 = 20;

fn start() -> Page {
    composer_logging::initialize_for_tests();
    let config = PageConfig {
        injection_delay_ms: DELAY_MS,
        ..PageConfig::default()
    };
    Page::start(
        Document::empty(),
        &config,
        Rc::new(FixedGenerator),
        Rc::new(LogNoticeSink),
    )
    .expect("default locators compile")
}

fn mount(page: &Page, markup: &str) -> Vec<NodeId> {
    let body = page.document().borrow().body().expect("body");
    page.document().borrow_mut().append_markup(body, markup)
}

fn find(doc: &Document, css: &str) -> Option<NodeId> {
    LocatorList::compile("test", &[css])
        .unwrap()
        .resolve(doc, doc.root())
        .map(|hit| hit.node)
}

fn controls(page: &Page) -> usize {
    let doc = page.document().borrow();
    LocatorList::compile("test", &[".ai-reply-button"])
        .unwrap()
        .resolve_all(&doc, doc.root())
        .len()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(DELAY_MS * 5)).await;
}

#[test]
fn detects_marker_on_added_node_or_descendant() {
    let mut doc = Document::empty();
    let mut records = doc.observe();
    let observer = SurfaceObserver::new(
        LocatorList::compile("compose surface", &DEFAULT_SURFACE_MARKERS).unwrap(),
    );
    let body = doc.body().unwrap();

    doc.append_markup(body, "<div><p>plain</p></div>");
    let batch: Vec<MutationRecord> = std::iter::from_fn(|| records.try_recv().ok()).collect();
    assert_eq!(observer.detect(&doc, &batch), None);

    let added = doc.append_markup(body, r#"<section><div role="dialog" id="d"></div></section>"#);
    let batch: Vec<MutationRecord> = std::iter::from_fn(|| records.try_recv().ok()).collect();
    let hit = observer.detect(&doc, &batch).expect("surface detected");
    assert_eq!(hit.node, find(&doc, "#d").unwrap());
    assert_eq!(observer.marker_pattern(&hit), "[role=\"dialog\"]");
    assert_eq!(batch[0].added, added);

    let added = doc.append_markup(body, r#"<div class="btC"></div>"#);
    let batch: Vec<MutationRecord> = std::iter::from_fn(|| records.try_recv().ok()).collect();
    let hit = observer.detect(&doc, &batch).expect("surface detected");
    assert_eq!(hit.node, added[0]);
    assert_eq!(hit.rank, 1);
}

#[tokio::test]
async fn opening_a_compose_window_injects_after_delay() {
    LocalSet::new()
        .run_until(async {
            let page = start();
            mount(
                &page,
                r#"<div role="dialog"><div class="btC"><div id="send">Send</div></div></div>"#,
            );

            // Nothing happens before the delay has elapsed.
            tokio::task::yield_now().await;
            assert_eq!(controls(&page), 0);

            settle().await;
            let control = page.control().expect("control injected");
            let doc = page.document().borrow();
            let toolbar = find(&doc, ".btC").unwrap();
            assert_eq!(doc.children(toolbar)[0], control.node());
        })
        .await;
}

#[tokio::test]
async fn unrelated_mutations_do_not_inject() {
    LocalSet::new()
        .run_until(async {
            let page = start();
            mount(&page, r#"<div class="message-list"><p>hello</p></div>"#);

            settle().await;
            assert!(page.control().is_none());
            assert_eq!(controls(&page), 0);
        })
        .await;
}

#[tokio::test]
async fn bursts_of_surfaces_leave_one_control() {
    LocalSet::new()
        .run_until(async {
            let page = start();
            mount(&page, r#"<div role="dialog"><div class="btC"></div></div>"#);
            tokio::task::yield_now().await;
            mount(&page, r#"<div class="aDh"></div>"#);
            mount(&page, r#"<div role="dialog"><div class="btC"></div></div>"#);

            settle().await;
            assert_eq!(controls(&page), 1);
        })
        .await;
}

#[tokio::test]
async fn reopened_compose_window_gets_a_fresh_control() {
    LocalSet::new()
        .run_until(async {
            let page = start();
            let first = mount(&page, r#"<div role="dialog"><div class="btC"></div></div>"#);
            settle().await;
            let old = page.control().expect("control injected").node();

            page.document().borrow_mut().remove(first[0]);
            assert!(page.control().is_none());

            mount(
                &page,
                r#"<div role="dialog" id="second"><div class="btC"></div></div>"#,
            );
            settle().await;

            let fresh = page.control().expect("control re-injected");
            assert_ne!(fresh.node(), old);
            assert_eq!(controls(&page), 1);
            let doc = page.document().borrow();
            let second = find(&doc, "#second").unwrap();
            let toolbar = doc.parent(fresh.node()).unwrap();
            assert_eq!(doc.parent(toolbar), Some(second));
        })
        .await;
}
