use std::time::Duration;

use composer_core::GenerationRequest;
use composer_logging::composer_debug;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::decode::decode_body;
use crate::GenerationError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/email/generate";

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The remote reply-generation service, seen as one request/response call.
#[async_trait::async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGenerator {
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl ReqwestGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self, GenerationError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint).map_err(|err| {
            GenerationError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                message: err.to_string(),
            }
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| GenerationError::Network(err.to_string()))?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait::async_trait]
impl ReplyGenerator for ReqwestGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        composer_debug!(
            "POST {} content_len={} tone={:?}",
            self.endpoint,
            request.email_content().len(),
            request.tone()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let body = decode_body(&bytes, content_type.as_deref())?;

        Ok(interpret_reply(&body, content_type.as_deref()))
    }
}

/// Turns a success body into display text.
///
/// JSON bodies (declared, or shaped like a string, object or array) are
/// decoded: a string yields its contents, anything else its compact JSON.
/// Everything else is taken verbatim.
pub fn interpret_reply(body: &str, content_type: Option<&str>) -> String {
    let declared_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false);
    let looks_json = body
        .trim_start()
        .starts_with(|c: char| matches!(c, '"' | '{' | '['));
    if !declared_json && !looks_json {
        return body.to_string();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => body.to_string(),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        return GenerationError::Timeout;
    }
    GenerationError::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::interpret_reply;

    #[test]
    fn plain_text_is_verbatim() {
        assert_eq!(
            interpret_reply("Thanks, sounds good.", Some("text/plain")),
            "Thanks, sounds good."
        );
    }

    #[test]
    fn json_string_is_unwrapped() {
        assert_eq!(
            interpret_reply("\"Thanks, sounds good.\"", None),
            "Thanks, sounds good."
        );
    }

    #[test]
    fn json_object_is_stringified() {
        assert_eq!(
            interpret_reply("{ \"reply\": \"hi\" }", Some("application/json")),
            r#"{"reply":"hi"}"#
        );
    }

    #[test]
    fn broken_json_falls_back_to_text() {
        assert_eq!(interpret_reply("{not json", None), "{not json");
    }
}
