//! Azure OpenAI commands: chat, embeddings and audio transcription

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use azrest_client::openai::{
    AudioOptions, AudioResponseFormat, ChatCompletionsOptions, ChatRequestMessage, EmbeddingsOptions,
    OpenAiClient, OpenAiClientOptions,
};
use azrest_core::config::OpenAiConfig;
use colored::Colorize;
use futures::StreamExt;
use serde::Serialize;

use super::common::Context;

pub struct ChatArgs {
    pub message: String,
    pub system: Option<String>,
    pub deployment: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

fn openai_config(ctx: &Context) -> Result<&OpenAiConfig> {
    ctx.config.openai.as_ref().context(
        "Azure OpenAI is not configured. Run `azrest init --openai-endpoint <url> --openai-deployment <name>`.",
    )
}

/// Build a client with an API key when one is configured, else the Entra ID credential.
fn client(ctx: &Context, config: &OpenAiConfig) -> Result<OpenAiClient> {
    let options = OpenAiClientOptions {
        api_version: config.api_version.clone(),
        client: ctx.client_options(),
    };
    match &config.api_key_env {
        Some(var) => {
            let key = std::env::var(var)
                .with_context(|| format!("environment variable {var} holding the API key is not set"))?;
            Ok(OpenAiClient::with_key_credential(&config.endpoint, key, options))
        }
        None => Ok(OpenAiClient::new(&config.endpoint, ctx.credential()?, options)),
    }
}

pub async fn chat(ctx: &Context, args: ChatArgs) -> Result<()> {
    let config = openai_config(ctx)?;
    let client = client(ctx, config)?;

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(ChatRequestMessage::system(system));
    }
    messages.push(ChatRequestMessage::user(args.message));
    let options = ChatCompletionsOptions {
        messages,
        model: Some(args.deployment.unwrap_or_else(|| config.deployment.clone())),
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        ..Default::default()
    };

    if args.stream {
        let mut events = client
            .get_chat_completions_stream(&options)
            .await
            .context("chat request failed")?
            .into_stream()
            .boxed();
        let mut stdout = std::io::stdout().lock();
        while let Some(event) = events.next().await {
            if let Some(text) = event?.first_content() {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
        }
        writeln!(stdout)?;
        return Ok(());
    }

    let completions = client
        .get_chat_completions(&options)
        .await
        .context("chat request failed")?;
    match completions.first_content() {
        Some(text) => println!("{text}"),
        None => bail!("the service returned no message"),
    }
    if let Some(usage) = completions.usage {
        ctx.status(
            format!(
                "tokens: {} prompt + {} completion",
                usage.prompt_tokens, usage.completion_tokens
            )
            .dimmed(),
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct EmbeddingRow<'a> {
    index: u32,
    input: &'a str,
    dimensions: usize,
    embedding: &'a [f32],
}

pub async fn embed(
    ctx: &Context,
    input: Vec<String>,
    deployment: Option<String>,
    dimensions: Option<u32>,
) -> Result<()> {
    let config = openai_config(ctx)?;
    let client = client(ctx, config)?;

    let options = EmbeddingsOptions {
        input,
        model: Some(deployment.unwrap_or_else(|| config.deployment.clone())),
        dimensions,
        ..Default::default()
    };
    let embeddings = client
        .get_embeddings(&options)
        .await
        .context("embeddings request failed")?;

    let rows: Vec<EmbeddingRow> = embeddings
        .data
        .iter()
        .map(|item| EmbeddingRow {
            index: item.index,
            input: options
                .input
                .get(item.index as usize)
                .map(String::as_str)
                .unwrap_or_default(),
            dimensions: item.embedding.len(),
            embedding: &item.embedding,
        })
        .collect();
    ctx.print_items(&rows)
}

pub async fn transcribe(
    ctx: &Context,
    file: PathBuf,
    deployment: String,
    language: Option<String>,
    translate: bool,
) -> Result<()> {
    let config = openai_config(ctx)?;
    let client = client(ctx, config)?;

    let data = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let options = AudioOptions {
        file: data.into(),
        filename,
        model: Some(deployment),
        language,
        response_format: Some(AudioResponseFormat::Text),
        ..Default::default()
    };

    let result = if translate {
        client.get_audio_translation(&options).await
    } else {
        client.get_audio_transcription(&options).await
    }
    .context("audio request failed")?;
    println!("{}", result.text.trim_end());
    Ok(())
}
