use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use composer_core::{ControlState, Notice, GENERATING_LABEL, IDLE_LABEL};
use composer_engine::{
    ActionController, Document, LocatorList, NodeId, NoticeSink, Page, PageConfig,
    ReqwestGenerator, StaleRequestPolicy,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::task::LocalSet;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THREAD: &str = r#"<html><head></head><body>
<div class="a3s aiL">Can we move the call to 3pm?</div>
<div role="dialog">
  <div role="textbox" g_editable="true" contenteditable="true">Hi Ana, <br>Best, Bo</div>
  <div class="btC"><div id="send">Send</div></div>
</div>
</body></html>"#;

#[derive(Default)]
struct RecordingSink {
    notices: RefCell<Vec<Notice>>,
}

impl RecordingSink {
    fn take(&self) -> Vec<Notice> {
        self.notices.borrow_mut().drain(..).collect()
    }
}

impl NoticeSink for RecordingSink {
    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

fn config_for(server: &MockServer) -> PageConfig {
    PageConfig {
        endpoint: format!("{}/api/email/generate", server.uri()),
        injection_delay_ms: 10,
        ..PageConfig::default()
    }
}

fn start(markup: &str, config: &PageConfig, sink: Rc<RecordingSink>) -> Page {
    composer_logging::initialize_for_tests();
    let generator = ReqwestGenerator::new(config.generator_settings()).expect("valid endpoint");
    Page::start(Document::parse(markup), config, Rc::new(generator), sink)
        .expect("default locators compile")
}

fn find(doc: &Document, css: &str) -> Option<NodeId> {
    LocatorList::compile("test", &[css])
        .unwrap()
        .resolve(doc, doc.root())
        .map(|hit| hit.node)
}

/// Focuses the editable field with the caret right after the greeting.
fn place_caret_after_greeting(page: &Page) -> NodeId {
    let mut doc = page.document().borrow_mut();
    let editable = find(&doc, "[role=\"textbox\"]").expect("editable");
    let greeting = doc.text_nodes(editable)[0];
    assert!(doc.set_caret(greeting, "Hi Ana, ".len()));
    assert!(doc.focus(editable));
    editable
}

async fn run_to_idle(page: &Page, controller: &ActionController) {
    let mut state = controller.subscribe();
    assert!(page.activate_control());
    assert_eq!(controller.state(), ControlState::Generating);
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ControlState::Idle),
    )
    .await
    .expect("control settles")
    .expect("controller alive");
}

fn assert_idle_look(page: &Page, controller: &ActionController) {
    let doc = page.document().borrow();
    assert_eq!(controller.state(), ControlState::Idle);
    assert_eq!(doc.rendered_text(controller.node()), IDLE_LABEL);
    assert!(!doc.is_disabled(controller.node()));
}

#[tokio::test]
async fn reply_is_inserted_at_the_caret() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/email/generate"))
                .and(body_json(json!({
                    "emailContent": "Can we move the call to 3pm?",
                    "tone": "professional"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_string("Thanks, sounds good."))
                .expect(1)
                .mount(&server)
                .await;

            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config_for(&server), sink.clone());
            let controller = page.inject_now().expect("control injected");
            let editable = place_caret_after_greeting(&page);

            let mut state = controller.subscribe();
            assert!(page.activate_control());
            {
                let doc = page.document().borrow();
                assert_eq!(doc.rendered_text(controller.node()), GENERATING_LABEL);
                assert!(doc.is_disabled(controller.node()));
            }
            // Disabled while generating: a second click is swallowed.
            assert!(!page.activate_control());

            tokio::time::timeout(
                Duration::from_secs(5),
                state.wait_for(|s| *s == ControlState::Idle),
            )
            .await
            .expect("control settles")
            .expect("controller alive");

            assert_eq!(
                page.document().borrow().rendered_text(editable),
                "Hi Ana, Thanks, sounds good.\nBest, Bo"
            );
            assert_idle_look(&page, &controller);
            assert!(sink.take().is_empty());
        })
        .await;
}

#[tokio::test]
async fn server_error_notifies_and_resets() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/email/generate"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config_for(&server), sink.clone());
            let controller = page.inject_now().expect("control injected");
            let editable = place_caret_after_greeting(&page);

            run_to_idle(&page, &controller).await;

            assert_eq!(
                sink.take(),
                vec![Notice::RequestFailed {
                    reason: "http status 500".to_string()
                }]
            );
            assert_eq!(
                page.document().borrow().rendered_text(editable),
                "Hi Ana,\nBest, Bo"
            );
            assert_idle_look(&page, &controller);
        })
        .await;
}

#[tokio::test]
async fn missing_editable_discards_reply_and_resets() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_string("Sure."))
                .mount(&server)
                .await;

            let sink = Rc::new(RecordingSink::default());
            let markup = r#"<body><div class="h7">Lunch?</div><div class="btC"></div></body>"#;
            let page = start(markup, &config_for(&server), sink.clone());
            let controller = page.inject_now().expect("control injected");

            run_to_idle(&page, &controller).await;

            assert_eq!(sink.take(), vec![Notice::EditableMissing]);
            assert!(!page.document().borrow().html().contains("Sure."));
            assert_idle_look(&page, &controller);
        })
        .await;
}

#[tokio::test]
async fn empty_message_is_still_sent() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(body_json(json!({ "emailContent": "", "tone": "professional" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!("Hello!")))
                .expect(1)
                .mount(&server)
                .await;

            let sink = Rc::new(RecordingSink::default());
            let markup = r#"<body><div role="dialog"><div role="textbox" g_editable="true"></div><div class="aDh"></div></div></body>"#;
            let page = start(markup, &config_for(&server), sink.clone());
            let controller = page.inject_now().expect("control injected");

            run_to_idle(&page, &controller).await;

            let doc = page.document().borrow();
            let editable = find(&doc, "[g_editable=\"true\"]").unwrap();
            assert_eq!(doc.rendered_text(editable), "Hello!");
            assert_eq!(doc.focused(), Some(editable));
            assert!(sink.take().is_empty());
        })
        .await;
}

#[tokio::test]
async fn configured_tone_is_sent() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(body_json(json!({
                    "emailContent": "Can we move the call to 3pm?",
                    "tone": "friendly"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_string("Sure!"))
                .expect(1)
                .mount(&server)
                .await;

            let config = PageConfig {
                tone: composer_core::Tone::Friendly,
                ..config_for(&server)
            };
            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config, sink.clone());
            let controller = page.inject_now().expect("control injected");

            run_to_idle(&page, &controller).await;
            assert!(sink.take().is_empty());
        })
        .await;
}

#[tokio::test]
async fn timeout_counts_as_request_failure() {
    LocalSet::new()
        .run_until(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_delay(Duration::from_millis(500))
                        .set_body_string("too late"),
                )
                .mount(&server)
                .await;

            let config = PageConfig {
                request_timeout_ms: 50,
                ..config_for(&server)
            };
            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config, sink.clone());
            let controller = page.inject_now().expect("control injected");

            run_to_idle(&page, &controller).await;

            assert_eq!(
                sink.take(),
                vec![Notice::RequestFailed {
                    reason: "timeout".to_string()
                }]
            );
            assert_idle_look(&page, &controller);
        })
        .await;
}

async fn slow_reply_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_string("Late reply."),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn detached_control_still_writes_late_reply() {
    LocalSet::new()
        .run_until(async {
            let server = slow_reply_server().await;
            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config_for(&server), sink.clone());
            let old = page.inject_now().expect("control injected");
            let editable = place_caret_after_greeting(&page);

            let mut old_state = old.subscribe();
            assert!(page.activate_control());
            tokio::time::sleep(Duration::from_millis(50)).await;

            let fresh = page.inject_now().expect("control re-injected");
            assert!(!page.document().borrow().contains(old.node()));
            assert_eq!(fresh.state(), ControlState::Idle);
            assert_eq!(old.state(), ControlState::Generating);

            tokio::time::timeout(
                Duration::from_secs(5),
                old_state.wait_for(|s| *s == ControlState::Idle),
            )
            .await
            .expect("old control settles")
            .expect("controller alive");

            assert_eq!(
                page.document().borrow().rendered_text(editable),
                "Hi Ana, Late reply.\nBest, Bo"
            );
            assert_idle_look(&page, &fresh);
        })
        .await;
}

#[tokio::test]
async fn cancel_policy_aborts_superseded_request() {
    LocalSet::new()
        .run_until(async {
            let server = slow_reply_server().await;
            let config = PageConfig {
                stale_requests: StaleRequestPolicy::Cancel,
                ..config_for(&server)
            };
            let sink = Rc::new(RecordingSink::default());
            let page = start(THREAD, &config, sink.clone());
            let old = page.inject_now().expect("control injected");
            let editable = place_caret_after_greeting(&page);

            let mut old_state = old.subscribe();
            assert!(page.activate_control());
            tokio::time::sleep(Duration::from_millis(50)).await;

            page.inject_now().expect("control re-injected");
            tokio::time::timeout(
                Duration::from_secs(5),
                old_state.wait_for(|s| *s == ControlState::Idle),
            )
            .await
            .expect("old control settles")
            .expect("controller alive");

            tokio::time::sleep(Duration::from_millis(400)).await;
            assert_eq!(
                page.document().borrow().rendered_text(editable),
                "Hi Ana,\nBest, Bo"
            );
            assert!(sink.take().is_empty());
        })
        .await;
}
