use std::cell::RefCell;
use std::rc::Rc;

use composer_core::{ControlState, ControlView, TOOLTIP};
use composer_logging::{composer_debug, composer_info};

use crate::config::StaleRequestPolicy;
use crate::controller::ActionController;
use crate::document::ActivationHandler;
use crate::page::PageContext;

/// Host button classes the control borrows so it blends into the toolbar.
pub const CONTROL_CLASSES: &str = "T-I J-J5-Ji aoO v7 T-I-atl L3";
pub const MARKER_CLASS: &str = "ai-reply-button";

pub fn control_markup(view: &ControlView) -> String {
    format!(
        r#"<div class="{CONTROL_CLASSES} {MARKER_CLASS}" role="button" data-tooltip="{TOOLTIP}" style="margin-right: 8px" aria-disabled="{}">{}</div>"#,
        !view.enabled,
        view.label
    )
}

/// Keeps at most one control in the document and wires it to a controller.
pub struct ActionInjector {
    ctx: PageContext,
    policy: StaleRequestPolicy,
    live: RefCell<Option<Rc<ActionController>>>,
}

impl ActionInjector {
    pub(crate) fn new(ctx: PageContext, policy: StaleRequestPolicy) -> Self {
        Self {
            ctx,
            policy,
            live: RefCell::new(None),
        }
    }

    pub fn live(&self) -> Option<Rc<ActionController>> {
        self.live.borrow().clone()
    }

    /// Removes any existing control, then places a fresh idle one as the
    /// first child of the located toolbar. Safe to call any number of times.
    pub fn inject(&self) -> Option<Rc<ActionController>> {
        let removed = self.remove_existing();
        if removed > 0 {
            composer_debug!("Removed {removed} existing control(s)");
        }
        let stale = self.live.borrow_mut().take();
        if let Some(stale) = stale {
            self.retire(&stale);
        }

        let toolbar = {
            let doc = self.ctx.document.borrow();
            self.ctx.host.toolbar.locate(&doc, doc.root())
        };
        let Some(toolbar) = toolbar else {
            composer_info!("Toolbar not found");
            return None;
        };

        composer_info!("Toolbar found, creating AI button");
        let markup = control_markup(&ControlState::Idle.view());
        let node = self
            .ctx
            .document
            .borrow_mut()
            .prepend_markup(toolbar, &markup)
            .into_iter()
            .next()?;

        let controller = Rc::new(ActionController::new(node, self.ctx.clone()));
        let weak = Rc::downgrade(&controller);
        let handler: ActivationHandler = Rc::new(move |_| {
            if let Some(controller) = weak.upgrade() {
                controller.activate();
            }
        });
        self.ctx
            .document
            .borrow_mut()
            .add_activation_listener(node, handler);

        *self.live.borrow_mut() = Some(controller.clone());
        Some(controller)
    }

    fn remove_existing(&self) -> usize {
        let mut doc = self.ctx.document.borrow_mut();
        let root = doc.root();
        let existing = self.ctx.host.control.resolve_all(&doc, root);
        existing
            .into_iter()
            .filter(|node| doc.remove(*node))
            .count()
    }

    fn retire(&self, stale: &ActionController) {
        if !stale.state().is_busy() {
            return;
        }
        match self.policy {
            StaleRequestPolicy::Cancel => stale.cancel(),
            StaleRequestPolicy::Detach => {
                composer_info!("Detached a control whose request is still in flight");
            }
        }
    }
}
