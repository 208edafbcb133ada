//! Extension oracle backed by the Gemini `generateContent` REST API.

use crate::matching::ports::{
    ExtensionOracle, ExtensionPlea, ExtensionVerdict, OracleError, OracleResult,
};
use async_trait::async_trait;
use minijinja::Environment;
use serde_json::{Map, Value, json};

/// Default Gemini REST base URL.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Reviewer prompt sent for each extension request.
const REVIEW_PROMPT_TEMPLATE: &str = concat!(
    "As a task assignment reviewer, evaluate an extension request. ",
    "A talent needs more time due to the following reason: \"{{ reason }}\". ",
    "Another talent is {% if alternate_available %}available{% else %}not available{% endif %} ",
    "to take over.\n\n",
    "The extension should be approved if the reason provided is valid, regardless of whether ",
    "another talent is available. ",
    "Respond with only 'yes' if the reason is valid, and 'no' otherwise."
);

/// Renders the reviewer prompt for `plea`.
///
/// # Errors
///
/// Returns [`OracleError::MalformedResponse`] when template rendering fails.
pub fn render_review_prompt(plea: &ExtensionPlea) -> OracleResult<String> {
    let mut context = Map::new();
    context.insert(
        "reason".to_owned(),
        Value::String(plea.justification.clone()),
    );
    context.insert(
        "alternate_available".to_owned(),
        Value::Bool(plea.alternate_available),
    );
    Environment::new()
        .render_str(REVIEW_PROMPT_TEMPLATE, context)
        .map_err(|err| OracleError::MalformedResponse(format!("prompt rendering failed: {err}")))
}

/// Interprets a free-text model answer: approval iff it contains "yes".
#[must_use]
pub fn interpret_answer(answer: &str) -> ExtensionVerdict {
    if answer.trim().to_ascii_lowercase().contains("yes") {
        ExtensionVerdict::Approve
    } else {
        ExtensionVerdict::Reject
    }
}

/// Oracle calling Gemini over HTTPS.
///
/// The caller bounds the call with its own timeout; transport failures are
/// returned as [`OracleError::Transport`].
#[derive(Debug, Clone)]
pub struct GeminiExtensionOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiExtensionOracle {
    /// Creates an oracle for the default endpoint and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_owned(),
            model: DEFAULT_GEMINI_MODEL.to_owned(),
            api_key: api_key.into(),
        }
    }

    /// Overrides the REST base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Extracts the first candidate's text from a `generateContent` response.
fn answer_text(body: &Value) -> Option<&str> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

#[async_trait]
impl ExtensionOracle for GeminiExtensionOracle {
    async fn decide(&self, plea: &ExtensionPlea) -> OracleResult<ExtensionVerdict> {
        let prompt = render_review_prompt(plea)?;
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(OracleError::transport)?
            .error_for_status()
            .map_err(OracleError::transport)?;
        let body: Value = response.json().await.map_err(OracleError::transport)?;

        let answer = answer_text(&body).ok_or_else(|| {
            OracleError::MalformedResponse("response carried no candidate text".to_owned())
        })?;
        tracing::debug!(answer, "extension oracle answered");
        Ok(interpret_answer(answer))
    }
}
