//! Content filtering results
//!
//! Azure OpenAI annotates prompts and completions with per-category filter
//! results. When a prompt is rejected outright the service answers 400 with
//! `error.code == "content_filter"` and the prompt results nested under
//! `error.innererror.content_filter_result`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, ResponseError};
use crate::request::Response;

const CONTENT_FILTER_CODE: &str = "content_filter";

/// How harmful the filtered content was judged to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFilterSeverity {
    Safe,
    Low,
    Medium,
    High,
    #[serde(untagged)]
    Other(String),
}

/// Result for a severity-graded category such as hate or violence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterResult {
    pub filtered: bool,
    pub severity: ContentFilterSeverity,
}

/// Result for a detection category such as profanity or jailbreak
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterDetectionResult {
    pub filtered: bool,
    pub detected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterBlocklistIdResult {
    pub id: String,
    pub filtered: bool,
}

/// Filter results for a prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterResultDetailsForPrompt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hate: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_harm: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexual: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violence: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profanity: Option<ContentFilterDetectionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jailbreak: Option<ContentFilterDetectionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_blocklists: Option<Vec<ContentFilterBlocklistIdResult>>,
    /// Set when filtering itself failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ContentFilterResultDetailsForPrompt {
    /// Names of the categories that caused filtering.
    pub fn filtered_categories(&self) -> Vec<&'static str> {
        let graded = [
            ("hate", &self.hate),
            ("self_harm", &self.self_harm),
            ("sexual", &self.sexual),
            ("violence", &self.violence),
        ];
        let detected = [("profanity", &self.profanity), ("jailbreak", &self.jailbreak)];

        let mut names: Vec<&'static str> = graded
            .into_iter()
            .filter(|(_, r)| r.as_ref().is_some_and(|r| r.filtered))
            .map(|(name, _)| name)
            .collect();
        names.extend(
            detected
                .into_iter()
                .filter(|(_, r)| r.as_ref().is_some_and(|r| r.filtered))
                .map(|(name, _)| name),
        );
        if self
            .custom_blocklists
            .as_ref()
            .is_some_and(|lists| lists.iter().any(|l| l.filtered))
        {
            names.push("custom_blocklists");
        }
        names
    }
}

/// Filter results for one prompt of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterResultsForPrompt {
    pub prompt_index: i32,
    pub content_filter_results: ContentFilterResultDetailsForPrompt,
}

/// Filter results for a generated choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFilterResultsForChoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hate: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_harm: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexual: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violence: Option<ContentFilterResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profanity: Option<ContentFilterDetectionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_material_text: Option<ContentFilterDetectionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_material_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_blocklists: Option<Vec<ContentFilterBlocklistIdResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// A request rejected by content filtering
#[derive(Debug, Clone)]
pub struct ContentFilterError {
    pub response: ResponseError,
    pub details: ContentFilterResultDetailsForPrompt,
}

impl fmt::Display for ContentFilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let categories = self.details.filtered_categories();
        if categories.is_empty() {
            writeln!(f, "content filtered")?;
        } else {
            writeln!(f, "content filtered: {}", categories.join(", "))?;
        }
        write!(f, "{}", self.response)
    }
}

impl std::error::Error for ContentFilterError {}

/// Error for a failed OpenAI response: a [`ContentFilterError`] when the
/// body carries the content filter envelope, else a plain [`ResponseError`].
pub(crate) fn error_from_response(resp: &Response) -> ClientError {
    let response = ResponseError::from_response(resp);
    match prompt_details(&response) {
        Some(details) => ClientError::ContentFilter(Box::new(ContentFilterError { response, details })),
        None => response.into(),
    }
}

fn prompt_details(response: &ResponseError) -> Option<ContentFilterResultDetailsForPrompt> {
    let body = response.body_json()?;
    let error = body.get("error")?;
    if error.get("code").and_then(Value::as_str) != Some(CONTENT_FILTER_CODE) {
        return None;
    }
    // The code alone marks a filtered request; unreadable details are dropped.
    let details = error
        .get("innererror")
        .and_then(|inner| inner.get("content_filter_result"))
        .and_then(|result| serde_json::from_value(result.clone()).ok())
        .unwrap_or_default();
    Some(details)
}
