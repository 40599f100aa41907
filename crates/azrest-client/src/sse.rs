//! Server-sent event reader for streaming completions
//!
//! Only `data:` lines are understood. Each one carries a JSON document,
//! except the `[DONE]` sentinel that ends the stream. Any other field is an
//! error, and so is a frame that does not decode.

use std::marker::PhantomData;
use std::pin::Pin;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::ClientError;

const DONE: &str = "[DONE]";

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Reads events of type `T` from a byte stream.
pub struct EventReader<T> {
    stream: ByteStream,
    buffer: BytesMut,
    eof: bool,
    finished: bool,
    _event: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> EventReader<T> {
    pub fn new(stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
            buffer: BytesMut::new(),
            eof: false,
            finished: false,
            _event: PhantomData,
        }
    }

    /// Read events from the body of a streaming response.
    pub fn from_response(resp: reqwest::Response) -> Self {
        Self::new(resp.bytes_stream())
    }

    /// Read the next event. `Ok(None)` means the stream has ended.
    pub async fn read(&mut self) -> Result<Option<T>, ClientError> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let Some(line) = self.next_line().await? else {
                self.finished = true;
                return Ok(None);
            };
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            if field != "data" {
                self.finished = true;
                return Err(ClientError::Stream(format!("unhandled event type: {field}")));
            }

            let data = value.trim();
            if data == DONE {
                trace!("event stream finished");
                self.finished = true;
                return Ok(None);
            }
            return Ok(Some(serde_json::from_str(data)?));
        }
    }

    /// Turn the reader into a stream that ends at `[DONE]` or the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<T, ClientError>> + Send
    where
        T: Send + 'static,
    {
        async_stream::stream! {
            loop {
                match self.read().await {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }

    /// Next `\n`-terminated line, or the unterminated remainder at end of input.
    async fn next_line(&mut self) -> Result<Option<String>, ClientError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line = self.buffer.split_to(pos);
                self.buffer.advance(1);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split();
                return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
            }
            match self.stream.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => self.eof = true,
            }
        }
    }
}
