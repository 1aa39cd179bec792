use anyhow::bail;
use composer_core::{GenerationRequest, Tone};
use composer_engine::{PageConfig, ReplyGenerator, ReqwestGenerator};
use composer_logging::{composer_error, composer_info, composer_warn};

pub(crate) const FAILURE_MESSAGE: &str = "Failed to generate email reply. Please try again";
pub(crate) const COPY_FAILED_MESSAGE: &str = "Could not copy the reply to the clipboard";

/// Anything the reply can be copied onto.
pub(crate) trait ReplyClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), arboard::Error>;
}

impl ReplyClipboard for arboard::Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), arboard::Error> {
        arboard::Clipboard::set_text(self, text)
    }
}

/// One-shot reply request, printed to stdout and optionally copied.
pub(crate) async fn generate(
    config: &PageConfig,
    content: &str,
    tone: Option<Tone>,
    copy: bool,
) -> anyhow::Result<()> {
    let generator = ReqwestGenerator::new(config.generator_settings())?;
    let reply = request_reply(&generator, content, tone).await?;
    println!("{reply}");
    if copy {
        copy_reply(arboard::Clipboard::new, &reply);
    }
    Ok(())
}

/// Copies the reply; a failure is reported as a notice, never as an error.
pub(crate) fn copy_reply<C, F>(open: F, reply: &str) -> bool
where
    C: ReplyClipboard,
    F: FnOnce() -> Result<C, arboard::Error>,
{
    match open().and_then(|mut clipboard| clipboard.set_text(reply)) {
        Ok(()) => {
            composer_info!("Reply copied to clipboard");
            true
        }
        Err(err) => {
            composer_warn!("{COPY_FAILED_MESSAGE}: {err}");
            eprintln!("{COPY_FAILED_MESSAGE}");
            false
        }
    }
}

pub(crate) async fn request_reply(
    generator: &dyn ReplyGenerator,
    content: &str,
    tone: Option<Tone>,
) -> anyhow::Result<String> {
    if content.is_empty() {
        bail!("email content is required");
    }

    let request = GenerationRequest::new(content, tone);
    match generator.generate(&request).await {
        Ok(reply) => {
            composer_info!("Reply generated ({} chars)", reply.chars().count());
            Ok(reply)
        }
        Err(err) => {
            composer_error!("Reply generation failed: {err}");
            bail!(FAILURE_MESSAGE)
        }
    }
}
