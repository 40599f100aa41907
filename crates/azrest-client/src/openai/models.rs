//! Request and response models for the OpenAI operations

use bytes::Bytes;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content_filter::{ContentFilterResultsForChoice, ContentFilterResultsForPrompt};
use crate::pager::{Cursor, Paged};

// Chat

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
    Function,
}

/// A message sent to the chat completions API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatRequestMessage {
    System {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        content: ChatMessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ChatCompletionsToolCall>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_call: Option<FunctionCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
    Function {
        name: String,
        content: Option<String>,
    },
}

impl ChatRequestMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: ChatMessageContent::Text(content.into()),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            function_call: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }
}

/// User message content: plain text, or text and images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Parts(Vec<ChatMessageContentItem>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessageContentItem {
    Text { text: String },
    ImageUrl { image_url: ChatMessageImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageImageUrl {
    pub url: String,
    /// `auto`, `low`, or `high`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A function the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatCompletionsToolDefinition {
    Function { function: FunctionDefinition },
}

/// A function invocation chosen by the model. Arguments are a JSON string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// A tool call in a response. Streamed deltas carry only some of the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionsToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    #[serde(default)]
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// Whether and which tool the model must call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCompletionsToolChoice {
    Auto,
    None,
    Function(String),
}

impl Serialize for ChatCompletionsToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::None => serializer.serialize_str("none"),
            Self::Function(name) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "function")?;
                map.serialize_entry("function", &NamedFunction { name: name.clone() })?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ChatCompletionsToolChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Named {
            function: NamedFunction,
        }

        match Value::deserialize(deserializer)? {
            Value::String(s) if s == "auto" => Ok(Self::Auto),
            Value::String(s) if s == "none" => Ok(Self::None),
            Value::String(s) => Err(de::Error::custom(format!("unknown tool choice '{s}'"))),
            other => serde_json::from_value::<Named>(other)
                .map(|n| Self::Function(n.function.name))
                .map_err(de::Error::custom),
        }
    }
}

/// Whether and which function the model must call (legacy `functions` API)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCallPreset {
    Auto,
    None,
    Name(String),
}

impl Serialize for FunctionCallPreset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::None => serializer.serialize_str("none"),
            Self::Name(name) => NamedFunction { name: name.clone() }.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FunctionCallPreset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if s == "auto" => Ok(Self::Auto),
            Value::String(s) if s == "none" => Ok(Self::None),
            Value::String(s) => Err(de::Error::custom(format!("unknown function call '{s}'"))),
            other => serde_json::from_value::<NamedFunction>(other)
                .map(|n| Self::Name(n.name))
                .map_err(de::Error::custom),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct NamedFunction {
    name: String,
}

/// Structured output mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatCompletionsResponseFormat {
    Text,
    JsonObject,
}

/// Options for a chat completions request.
///
/// `model` is the deployment name on Azure and the model name on OpenAI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionsOptions {
    pub messages: Vec<ChatRequestMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<std::collections::HashMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ChatCompletionsResponseFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatCompletionsToolDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ChatCompletionsToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallPreset>,
    /// Azure "on your data" sources, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionsFinishReason {
    Stop,
    Length,
    ContentFilter,
    FunctionCall,
    ToolCalls,
    #[serde(untagged)]
    Other(String),
}

/// The assistant message in a response, or a streamed delta of one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatCompletionsToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatResponseMessage>,
    /// Set instead of `message` on streamed events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChatResponseMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<CompletionsFinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_filter_results: Option<ContentFilterResultsForChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionsUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A chat completions response, or one event of a streamed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletions {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(
        default,
        alias = "prompt_annotations",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_filter_results: Option<Vec<ContentFilterResultsForPrompt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionsUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatCompletions {
    /// Text of the first choice, from its message or its streamed delta.
    pub fn first_content(&self) -> Option<&str> {
        let choice = self.choices.first()?;
        choice
            .message
            .as_ref()
            .or(choice.delta.as_ref())?
            .content
            .as_deref()
    }
}

// Completions

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionsOptions {
    pub prompt: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<CompletionsFinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_filter_results: Option<ContentFilterResultsForChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completions {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(
        default,
        alias = "prompt_annotations",
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_filter_results: Option<Vec<ContentFilterResultsForPrompt>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionsUsage>,
}

// Embeddings

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsOptions {
    pub input: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingsUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embeddings {
    pub data: Vec<EmbeddingItem>,
    #[serde(default)]
    pub usage: EmbeddingsUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// Audio

/// Output format of a transcription or translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioResponseFormat {
    Json,
    VerboseJson,
    Text,
    Srt,
    Vtt,
}

impl AudioResponseFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::VerboseJson => "verbose_json",
            Self::Text => "text",
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }

    /// Whether the service answers with plain text rather than JSON.
    pub fn is_plain_text(self) -> bool {
        matches!(self, Self::Text | Self::Srt | Self::Vtt)
    }
}

/// Options for transcribing or translating an audio file
#[derive(Debug, Clone, Default)]
pub struct AudioOptions {
    /// Audio bytes
    pub file: Bytes,
    /// File name sent with the upload; its extension sets the content type
    pub filename: String,
    pub model: Option<String>,
    /// ISO-639-1 language of the input. Ignored for translations.
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub response_format: Option<AudioResponseFormat>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub avg_logprob: f64,
    #[serde(default)]
    pub compression_ratio: f64,
    #[serde(default)]
    pub no_speech_prob: f64,
    #[serde(default)]
    pub tokens: Vec<u32>,
    #[serde(default)]
    pub seek: u32,
}

/// Result of a transcription or translation. Plain-text formats only set `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscription {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<AudioSegment>>,
}

// Images

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationOptions {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// e.g. `1024x1024`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// `standard` or `hd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// `vivid` or `natural`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// `url` or `b64_json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerations {
    #[serde(default)]
    pub created: i64,
    pub data: Vec<ImageGenerationData>,
}

// Files

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilePurpose {
    #[serde(rename = "fine-tune")]
    FineTune,
    #[serde(rename = "fine-tune-results")]
    FineTuneResults,
    #[serde(rename = "assistants")]
    Assistants,
    #[serde(rename = "assistants_output")]
    AssistantsOutput,
    #[serde(rename = "batch")]
    Batch,
    #[serde(rename = "batch_output")]
    BatchOutput,
    #[serde(untagged)]
    Other(String),
}

impl FilePurpose {
    pub fn as_str(&self) -> &str {
        match self {
            Self::FineTune => "fine-tune",
            Self::FineTuneResults => "fine-tune-results",
            Self::Assistants => "assistants",
            Self::AssistantsOutput => "assistants_output",
            Self::Batch => "batch",
            Self::BatchOutput => "batch_output",
            Self::Other(s) => s,
        }
    }
}

/// An uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenAiFile {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub filename: String,
    pub purpose: FilePurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One page of the file list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListResponse {
    #[serde(default)]
    pub data: Vec<OpenAiFile>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
}

impl Paged for FileListResponse {
    type Item = OpenAiFile;

    fn next_cursor(&self) -> Option<Cursor> {
        if !self.has_more {
            return None;
        }
        self.last_id
            .clone()
            .or_else(|| self.data.last().map(|f| f.id.clone()))
            .map(Cursor::After)
    }

    fn into_items(self) -> Vec<OpenAiFile> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub id: String,
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_choice_serialization() {
        assert_eq!(
            serde_json::to_value(ChatCompletionsToolChoice::Auto).unwrap(),
            json!("auto")
        );
        assert_eq!(
            serde_json::to_value(ChatCompletionsToolChoice::None).unwrap(),
            json!("none")
        );
        assert_eq!(
            serde_json::to_value(ChatCompletionsToolChoice::Function("get_weather".into())).unwrap(),
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
    }

    #[test]
    fn test_tool_choice_deserialization() {
        let choice: ChatCompletionsToolChoice =
            serde_json::from_value(json!({"type": "function", "function": {"name": "f"}})).unwrap();
        assert_eq!(choice, ChatCompletionsToolChoice::Function("f".into()));
        let choice: ChatCompletionsToolChoice = serde_json::from_value(json!("none")).unwrap();
        assert_eq!(choice, ChatCompletionsToolChoice::None);
        assert!(serde_json::from_value::<ChatCompletionsToolChoice>(json!("required")).is_err());
    }

    #[test]
    fn test_function_call_preset() {
        assert_eq!(
            serde_json::to_value(FunctionCallPreset::Auto).unwrap(),
            json!("auto")
        );
        assert_eq!(
            serde_json::to_value(FunctionCallPreset::Name("lookup".into())).unwrap(),
            json!({"name": "lookup"})
        );
        let preset: FunctionCallPreset = serde_json::from_value(json!({"name": "lookup"})).unwrap();
        assert_eq!(preset, FunctionCallPreset::Name("lookup".into()));
    }

    #[test]
    fn test_request_messages_serialize_with_role() {
        let options = ChatCompletionsOptions {
            messages: vec![
                ChatRequestMessage::system("be brief"),
                ChatRequestMessage::user("hi"),
                ChatRequestMessage::tool("call_1", "{\"ok\":true}"),
            ],
            tools: Some(vec![ChatCompletionsToolDefinition::Function {
                function: FunctionDefinition {
                    name: "f".into(),
                    description: None,
                    parameters: Some(json!({"type": "object"})),
                },
            }]),
            ..Default::default()
        };
        let body = serde_json::to_value(&options).unwrap();
        assert_eq!(
            body,
            json!({
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"},
                    {"role": "tool", "content": "{\"ok\":true}", "tool_call_id": "call_1"}
                ],
                "tools": [{"type": "function", "function": {"name": "f", "parameters": {"type": "object"}}}]
            })
        );
    }

    #[test]
    fn test_user_message_with_image() {
        let msg = ChatRequestMessage::User {
            content: ChatMessageContent::Parts(vec![
                ChatMessageContentItem::Text { text: "what is this?".into() },
                ChatMessageContentItem::ImageUrl {
                    image_url: ChatMessageImageUrl {
                        url: "https://example.com/cat.png".into(),
                        detail: None,
                    },
                },
            ]),
            name: None,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "user", "content": [
                {"type": "text", "text": "what is this?"},
                {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}}
            ]})
        );
    }

    #[test]
    fn test_chat_completions_with_filter_results() {
        let resp: ChatCompletions = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "created": 1700000000,
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "f", "arguments": "{}"}}
                ]},
                "content_filter_results": {"hate": {"filtered": false, "severity": "safe"}}
            }],
            "prompt_annotations": [{"prompt_index": 0, "content_filter_results": {}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
        }))
        .unwrap();
        let choice = &resp.choices[0];
        assert_eq!(choice.finish_reason, Some(CompletionsFinishReason::ToolCalls));
        let calls = choice.message.as_ref().unwrap().tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "f");
        assert_eq!(resp.prompt_filter_results.unwrap()[0].prompt_index, 0);
        assert_eq!(resp.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn test_first_content_reads_delta() {
        let event: ChatCompletions = serde_json::from_value(json!({
            "id": "c", "created": 0,
            "choices": [{"index": 0, "delta": {"content": "Hel"}}]
        }))
        .unwrap();
        assert_eq!(event.first_content(), Some("Hel"));
        assert!(ChatCompletions::default().first_content().is_none());
    }

    #[test]
    fn test_file_list_cursor() {
        let page: FileListResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [{"id": "file-1", "purpose": "fine-tune", "filename": "a.jsonl", "bytes": 10, "created_at": 1}],
            "has_more": true
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), Some(Cursor::After("file-1".into())));

        let last: FileListResponse =
            serde_json::from_value(json!({"data": [], "has_more": false})).unwrap();
        assert!(last.next_cursor().is_none());
    }

    #[test]
    fn test_file_purpose_other() {
        let purpose: FilePurpose = serde_json::from_value(json!("vision")).unwrap();
        assert_eq!(purpose.as_str(), "vision");
        assert_eq!(FilePurpose::FineTune.as_str(), "fine-tune");
    }
}
