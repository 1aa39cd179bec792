//! Top-level entry point: one per host document, alive as long as the page.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use composer_core::Tone;
use composer_logging::{composer_debug, composer_info};
use tokio::sync::mpsc;

use crate::config::PageConfig;
use crate::controller::ActionController;
use crate::document::{dispatch_activation, Document, MutationRecord};
use crate::generate::ReplyGenerator;
use crate::inject::ActionInjector;
use crate::locator::{HostLocators, LocatorError};
use crate::notice::NoticeSink;
use crate::observer::SurfaceObserver;

/// Shared handles every controller and the injector work against.
#[derive(Clone)]
pub(crate) struct PageContext {
    pub(crate) document: Rc<RefCell<Document>>,
    pub(crate) host: Rc<HostLocators>,
    pub(crate) generator: Rc<dyn ReplyGenerator>,
    pub(crate) notices: Rc<dyn NoticeSink>,
    pub(crate) tone: Tone,
}

/// The controller attached to one host document.
///
/// Starting a page subscribes the surface observer to the document for the
/// rest of its life; there is no teardown. Everything here is single-threaded
/// and must run inside a `tokio::task::LocalSet`.
pub struct Page {
    document: Rc<RefCell<Document>>,
    injector: Rc<ActionInjector>,
}

impl Page {
    pub fn start(
        document: Document,
        config: &PageConfig,
        generator: Rc<dyn ReplyGenerator>,
        notices: Rc<dyn NoticeSink>,
    ) -> Result<Self, LocatorError> {
        let host = Rc::new(HostLocators::from_config(&config.locators)?);
        let document = Rc::new(RefCell::new(document));
        let records = document.borrow_mut().observe();

        let ctx = PageContext {
            document: document.clone(),
            host: host.clone(),
            generator,
            notices,
            tone: config.tone,
        };
        let injector = Rc::new(ActionInjector::new(ctx, config.stale_requests));
        let observer = SurfaceObserver::new(host.surfaces.clone());

        tokio::task::spawn_local(watch_surfaces(
            records,
            observer,
            document.clone(),
            injector.clone(),
            config.injection_delay(),
        ));
        composer_info!("Composer started; watching for compose surfaces");

        Ok(Self { document, injector })
    }

    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// Runs one injection cycle right away.
    pub fn inject_now(&self) -> Option<Rc<ActionController>> {
        self.injector.inject()
    }

    /// The controller of the control currently in the document, if any.
    pub fn control(&self) -> Option<Rc<ActionController>> {
        self.injector
            .live()
            .filter(|c| self.document.borrow().contains(c.node()))
    }

    /// Clicks the current control. False when there is none or it is disabled.
    pub fn activate_control(&self) -> bool {
        match self.control() {
            Some(controller) => dispatch_activation(&self.document, controller.node()),
            None => false,
        }
    }
}

async fn watch_surfaces(
    mut records: mpsc::UnboundedReceiver<MutationRecord>,
    observer: SurfaceObserver,
    document: Rc<RefCell<Document>>,
    injector: Rc<ActionInjector>,
    delay: Duration,
) {
    while let Some(first) = records.recv().await {
        let mut batch = vec![first];
        while let Ok(record) = records.try_recv() {
            batch.push(record);
        }

        let detected = observer.detect(&document.borrow(), &batch);
        let Some(surface) = detected else {
            continue;
        };
        composer_info!(
            "Compose window detected ({})",
            observer.marker_pattern(&surface)
        );

        // Let the host finish rendering the surface before measuring it.
        let injector = injector.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            composer_debug!("Running scheduled injection");
            injector.inject();
        });
    }
}
