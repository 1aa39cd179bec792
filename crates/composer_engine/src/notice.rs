use composer_core::Notice;
use composer_logging::composer_error;

/// Where user-visible notices go. The host page shows them; tests record them.
pub trait NoticeSink {
    fn notify(&self, notice: &Notice);
}

/// Sink that only writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::RequestFailed { reason } => composer_error!("{notice} ({reason})"),
            Notice::EditableMissing => composer_error!("{notice}"),
        }
    }
}
