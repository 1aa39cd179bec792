use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use composer_core::{ControlState, Notice};
use composer_engine::{
    Document, LocatorList, LogNoticeSink, NoticeSink, Page, PageConfig, ReplyGenerator,
};
use composer_logging::composer_info;

const INJECTION_MARGIN: Duration = Duration::from_millis(50);

/// Logs notices and echoes them on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StderrNoticeSink;

impl NoticeSink for StderrNoticeSink {
    fn notify(&self, notice: &Notice) {
        LogNoticeSink.notify(notice);
        eprintln!("{notice}");
    }
}

/// Outcome of hosting one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostReport {
    NoControl,
    Injected,
    Activated { compose_text: Option<String> },
}

impl fmt::Display for HostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostReport::NoControl => write!(f, "No reply control was injected"),
            HostReport::Injected => write!(f, "Reply control injected"),
            HostReport::Activated {
                compose_text: Some(text),
            } => write!(f, "{text}"),
            HostReport::Activated { compose_text: None } => {
                write!(f, "Reply control activated; no compose box present")
            }
        }
    }
}

/// Mounts the snapshot's body into a live page and lets the controller run.
/// Must be called inside a `LocalSet`.
pub(crate) async fn run_snapshot(
    config: &PageConfig,
    snapshot: &Path,
    activate: bool,
    generator: Rc<dyn ReplyGenerator>,
) -> anyhow::Result<HostReport> {
    let markup = std::fs::read_to_string(snapshot)
        .with_context(|| format!("failed to read snapshot {:?}", snapshot))?;
    host_markup(config, &markup, activate, generator).await
}

pub(crate) async fn host_markup(
    config: &PageConfig,
    markup: &str,
    activate: bool,
    generator: Rc<dyn ReplyGenerator>,
) -> anyhow::Result<HostReport> {
    let editable = LocatorList::compile("editable", config.locators.editable.as_slice())?;
    let page = Page::start(
        Document::empty(),
        config,
        generator,
        Rc::new(StderrNoticeSink),
    )?;

    let snapshot = Document::parse(markup);
    let body_markup = snapshot
        .body()
        .and_then(|body| snapshot.inner_html(body))
        .unwrap_or_default();
    {
        let mut document = page.document().borrow_mut();
        let body = document
            .body()
            .ok_or_else(|| anyhow!("page has no body to mount into"))?;
        document.append_markup(body, &body_markup);
    }

    tokio::time::sleep(config.injection_delay() + INJECTION_MARGIN).await;

    let Some(control) = page.control() else {
        composer_info!("Snapshot hosted; no control injected");
        return Ok(HostReport::NoControl);
    };
    if !activate {
        return Ok(HostReport::Injected);
    }

    if !page.activate_control() {
        return Err(anyhow!("reply control is disabled"));
    }
    let mut state = control.subscribe();
    state
        .wait_for(|s| *s == ControlState::Idle)
        .await
        .context("reply control went away while generating")?;

    let document = page.document().borrow();
    let compose_text = editable
        .resolve(&document, document.root())
        .map(|hit| document.rendered_text(hit.node));
    Ok(HostReport::Activated { compose_text })
}
