//! Composer engine: host-document model, control injection and the reply
//! lifecycle runtime.
mod config;
mod controller;
mod decode;
mod document;
mod extract;
mod generate;
mod inject;
mod locator;
mod notice;
mod observer;
mod page;
mod toolbar;
mod types;

pub use ego_tree::NodeId;

pub use config::{
    LocatorConfig, PageConfig, StaleRequestPolicy, DEFAULT_EDITABLE, DEFAULT_MESSAGE_BODY,
    DEFAULT_SURFACE_MARKERS, DEFAULT_TOOLBAR,
};
pub use controller::ActionController;
pub use decode::{decode_body, DecodeError};
pub use document::{dispatch_activation, ActivationHandler, Caret, Document, MutationRecord};
pub use extract::MessageExtractor;
pub use generate::{
    interpret_reply, GeneratorSettings, ReplyGenerator, ReqwestGenerator, DEFAULT_ENDPOINT,
};
pub use inject::{control_markup, ActionInjector, CONTROL_CLASSES, MARKER_CLASS};
pub use locator::{HostLocators, LocatorError, LocatorList, LocatorMatch, CONTROL_MARKER};
pub use notice::{LogNoticeSink, NoticeSink};
pub use observer::SurfaceObserver;
pub use page::Page;
pub use toolbar::ToolbarLocator;
pub use types::GenerationError;
