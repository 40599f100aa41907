//! Azure OpenAI and OpenAI client
//!
//! One client speaks to either service. Azure routes model operations through
//! `/openai/deployments/{deployment}/...` with an `api-version` query and
//! authorizes with an `api-key` header or an Entra ID token. OpenAI uses
//! `https://api.openai.com/v1` with a bearer key and takes the model name from
//! the request body.

pub mod content_filter;
pub mod models;

use std::sync::Arc;

use azrest_core::config::DEFAULT_OPENAI_API_VERSION;
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::TokenCredential;
use crate::error::ClientError;
use crate::multipart::MultipartForm;
use crate::pager::Pager;
use crate::pipeline::{AuthPolicy, BearerTokenPolicy, ClientOptions, KeyCredentialPolicy, Pipeline};
use crate::request::{Request, Response, expand_path, join_paths};
use crate::sse::EventReader;

use self::content_filter::error_from_response;
pub use self::models::*;

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Options for [`OpenAiClient`]
#[derive(Debug, Clone)]
pub struct OpenAiClientOptions {
    /// Azure OpenAI API version; unused for OpenAI
    pub api_version: String,
    pub client: ClientOptions,
}

impl Default for OpenAiClientOptions {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
            client: ClientOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Azure,
    OpenAi,
}

/// Client for chat, completions, embeddings, audio, images and files.
#[derive(Clone)]
pub struct OpenAiClient {
    pipeline: Pipeline,
    endpoint: String,
    service: Service,
    api_version: String,
}

impl OpenAiClient {
    /// Azure OpenAI with Entra ID authentication.
    pub fn new(
        endpoint: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: OpenAiClientOptions,
    ) -> Self {
        let policy = BearerTokenPolicy::new(credential, &[COGNITIVE_SERVICES_SCOPE]);
        Self::build(endpoint.into(), Service::Azure, AuthPolicy::Bearer(policy), options)
    }

    /// Azure OpenAI with an API key.
    pub fn with_key_credential(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        options: OpenAiClientOptions,
    ) -> Self {
        let policy = KeyCredentialPolicy::api_key(key);
        Self::build(endpoint.into(), Service::Azure, AuthPolicy::Key(policy), options)
    }

    /// The public OpenAI API, or a compatible service at `endpoint`.
    pub fn for_openai(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        options: OpenAiClientOptions,
    ) -> Self {
        let policy = KeyCredentialPolicy::bearer(key);
        Self::build(endpoint.into(), Service::OpenAi, AuthPolicy::Key(policy), options)
    }

    fn build(endpoint: String, service: Service, auth: AuthPolicy, options: OpenAiClientOptions) -> Self {
        Self {
            pipeline: Pipeline::new(auth, options.client),
            endpoint,
            service,
            api_version: options.api_version,
        }
    }

    /// Request for an operation served by a model deployment.
    fn model_request(
        &self,
        method: Method,
        model: Option<&str>,
        operation: &str,
    ) -> Result<Request, ClientError> {
        match self.service {
            Service::Azure => {
                let deployment = model.filter(|m| !m.is_empty()).ok_or_else(|| {
                    ClientError::InvalidParameter(
                        "model (the deployment name) is required for Azure OpenAI".into(),
                    )
                })?;
                let path = expand_path(
                    "/openai/deployments/{deployment}",
                    &[("deployment", deployment)],
                )?;
                Ok(Request::new(method, &join_paths(&self.endpoint, &format!("{path}/{operation}")))?
                    .with_query("api-version", &self.api_version))
            }
            Service::OpenAi => Request::new(method, &join_paths(&self.endpoint, operation)),
        }
    }

    /// Request for a resource-level operation such as files.
    fn resource_request(&self, method: Method, path: &str) -> Result<Request, ClientError> {
        match self.service {
            Service::Azure => Ok(Request::new(
                method,
                &join_paths(&self.endpoint, &format!("/openai/{}", path.trim_start_matches('/'))),
            )?
            .with_query("api-version", &self.api_version)),
            Service::OpenAi => Request::new(method, &join_paths(&self.endpoint, path)),
        }
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let resp = self.pipeline.send(request).await?;
        if !resp.has_status(&[200]) {
            return Err(error_from_response(&resp));
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: &Request) -> Result<T, ClientError> {
        self.send(request).await?.json()
    }

    async fn stream<T: DeserializeOwned>(&self, request: &Request) -> Result<EventReader<T>, ClientError> {
        let resp = self.pipeline.send_raw(request).await?;
        if resp.status().as_u16() != 200 {
            let resp = Response::from_reqwest(resp, request.method().clone()).await?;
            return Err(error_from_response(&resp));
        }
        Ok(EventReader::from_response(resp))
    }

    pub async fn get_chat_completions(
        &self,
        options: &ChatCompletionsOptions,
    ) -> Result<ChatCompletions, ClientError> {
        debug!(model = ?options.model, messages = options.messages.len(), "chat completions");
        let body = ChatCompletionsOptions {
            stream: None,
            ..options.clone()
        };
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "chat/completions")?
            .accept_json()
            .with_json(&body)?;
        self.send_json(&req).await
    }

    /// Stream chat completions as server-sent events.
    pub async fn get_chat_completions_stream(
        &self,
        options: &ChatCompletionsOptions,
    ) -> Result<EventReader<ChatCompletions>, ClientError> {
        debug!(model = ?options.model, messages = options.messages.len(), "streaming chat completions");
        let body = ChatCompletionsOptions {
            stream: Some(true),
            ..options.clone()
        };
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "chat/completions")?
            .with_json(&body)?;
        self.stream(&req).await
    }

    pub async fn get_completions(
        &self,
        options: &CompletionsOptions,
    ) -> Result<Completions, ClientError> {
        debug!(model = ?options.model, prompts = options.prompt.len(), "completions");
        let body = CompletionsOptions {
            stream: None,
            ..options.clone()
        };
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "completions")?
            .accept_json()
            .with_json(&body)?;
        self.send_json(&req).await
    }

    pub async fn get_completions_stream(
        &self,
        options: &CompletionsOptions,
    ) -> Result<EventReader<Completions>, ClientError> {
        let body = CompletionsOptions {
            stream: Some(true),
            ..options.clone()
        };
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "completions")?
            .with_json(&body)?;
        self.stream(&req).await
    }

    pub async fn get_embeddings(&self, options: &EmbeddingsOptions) -> Result<Embeddings, ClientError> {
        debug!(model = ?options.model, inputs = options.input.len(), "embeddings");
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "embeddings")?
            .accept_json()
            .with_json(options)?;
        self.send_json(&req).await
    }

    /// Transcribe audio in its own language.
    pub async fn get_audio_transcription(
        &self,
        options: &AudioOptions,
    ) -> Result<AudioTranscription, ClientError> {
        self.audio("audio/transcriptions", options, true).await
    }

    /// Translate audio into English text.
    pub async fn get_audio_translation(
        &self,
        options: &AudioOptions,
    ) -> Result<AudioTranscription, ClientError> {
        self.audio("audio/translations", options, false).await
    }

    async fn audio(
        &self,
        operation: &str,
        options: &AudioOptions,
        with_language: bool,
    ) -> Result<AudioTranscription, ClientError> {
        debug!(
            operation,
            filename = %options.filename,
            bytes = options.file.len(),
            "audio request"
        );
        let mut form = MultipartForm::new()
            .file("file", options.filename.clone(), options.file.clone())
            .optional_text("model", options.model.as_deref())
            .optional_text("prompt", options.prompt.as_deref())
            .optional_text("response_format", options.response_format.map(|f| f.as_str()))
            .optional_text("temperature", options.temperature);
        if with_language {
            form = form.optional_text("language", options.language.as_deref());
        }

        let req = self
            .model_request(Method::POST, options.model.as_deref(), operation)?
            .with_multipart(form);
        let resp = self.send(&req).await?;

        match options.response_format {
            Some(format) if format.is_plain_text() => Ok(AudioTranscription {
                text: resp.text(),
                ..Default::default()
            }),
            _ => resp.json(),
        }
    }

    pub async fn get_image_generations(
        &self,
        options: &ImageGenerationOptions,
    ) -> Result<ImageGenerations, ClientError> {
        debug!(model = ?options.model, n = ?options.n, "image generations");
        let req = self
            .model_request(Method::POST, options.model.as_deref(), "images/generations")?
            .accept_json()
            .with_json(options)?;
        self.send_json(&req).await
    }

    /// Upload a file for fine-tuning, assistants or batch.
    pub async fn upload_file(
        &self,
        filename: &str,
        data: impl Into<Bytes>,
        purpose: &FilePurpose,
    ) -> Result<OpenAiFile, ClientError> {
        let data = data.into();
        debug!(filename, bytes = data.len(), purpose = purpose.as_str(), "uploading file");
        let form = MultipartForm::new()
            .text("purpose", purpose.as_str())
            .file("file", filename, data);
        let req = self
            .resource_request(Method::POST, "files")?
            .accept_json()
            .with_multipart(form);
        self.send_json(&req).await
    }

    /// List files, following the `after` cursor between pages.
    pub fn list_files(
        &self,
        purpose: Option<&FilePurpose>,
        limit: Option<u32>,
    ) -> Result<Pager<FileListResponse>, ClientError> {
        let req = self
            .resource_request(Method::GET, "files")?
            .accept_json()
            .with_optional_query("purpose", purpose.map(FilePurpose::as_str))
            .with_optional_query("limit", limit);
        Ok(Pager::new(self.pipeline.clone(), req))
    }

    pub async fn get_file(&self, file_id: &str) -> Result<OpenAiFile, ClientError> {
        let path = expand_path("files/{file-id}", &[("file-id", file_id)])?;
        let req = self.resource_request(Method::GET, &path)?.accept_json();
        self.send_json(&req).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<DeleteFileResponse, ClientError> {
        debug!(file_id, "deleting file");
        let path = expand_path("files/{file-id}", &[("file-id", file_id)])?;
        let req = self.resource_request(Method::DELETE, &path)?.accept_json();
        self.send_json(&req).await
    }

    /// Raw content of an uploaded file.
    pub async fn get_file_content(&self, file_id: &str) -> Result<Bytes, ClientError> {
        let path = expand_path("files/{file-id}/content", &[("file-id", file_id)])?;
        let req = self.resource_request(Method::GET, &path)?;
        Ok(self.send(&req).await?.body().clone())
    }
}
