//! Ollama generate API client
//!
//! POSTs `{model, prompt}` and reads the streamed reply: newline-delimited
//! JSON objects, each optionally carrying a `response` fragment. Fragments
//! are concatenated in arrival order. Malformed lines are logged and skipped.

use async_trait::async_trait;
use futures::StreamExt;
use kweb_common::config::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::text_generator::{GenerationBackend, GenerationError};

const USER_AGENT: &str = concat!("kweb-server/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Ollama API client
pub struct OllamaClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        tracing::debug!(endpoint = %self.endpoint, model = %model, "Querying generation service");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&GenerateRequest { model, prompt })
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Status(status.as_u16()));
        }

        let mut reassembler = StreamReassembler::default();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(map_request_error)?;
            reassembler.push(&bytes);
        }

        let skipped = reassembler.skipped();
        let text = reassembler.finish();
        tracing::info!(
            model = %model,
            chars = text.len(),
            skipped_lines = skipped,
            "Generation stream complete"
        );

        Ok(text)
    }
}

fn map_request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Network(e.to_string())
    }
}

/// Reassembles an NDJSON body delivered in arbitrary byte chunks
///
/// Lines are only decoded once complete, so multi-byte characters and JSON
/// objects split across chunks are handled.
#[derive(Debug, Default)]
pub struct StreamReassembler {
    pending: Vec<u8>,
    text: String,
    skipped: usize,
}

impl StreamReassembler {
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.handle_line(&line);
        }
    }

    /// Number of malformed lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Flush a trailing unterminated line and return the full text
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.handle_line(&rest);
        self.text
    }

    fn handle_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(chunk) => {
                if let Some(error) = chunk.error {
                    tracing::warn!(error = %error, "Generation service reported an error");
                }
                if let Some(fragment) = chunk.response {
                    self.text.push_str(&fragment);
                }
            }
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(
                    error = %e,
                    line = %line,
                    "Skipping malformed stream line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_concatenated_in_order() {
        let mut r = StreamReassembler::default();
        r.push(b"{\"response\":\"Hello\"}\n{\"response\":\", \"}\n{\"response\":\"world\",\"done\":true}\n");
        assert_eq!(r.skipped(), 0);
        assert_eq!(r.finish(), "Hello, world");
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut r = StreamReassembler::default();
        r.push(b"{\"resp");
        r.push(b"onse\":\"St");
        r.push("ars \u{2728}\"}\n{\"response\":\"!\"}".as_bytes());
        assert_eq!(r.finish(), "Stars \u{2728}!");
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "{\"response\":\"caf\u{e9}\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut r = StreamReassembler::default();
        r.push(&line[..split]);
        r.push(&line[split..]);
        assert_eq!(r.finish(), "caf\u{e9}");
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let mut r = StreamReassembler::default();
        r.push(b"{\"response\":\"a\"}\nnot json\n\n{\"done\":true}\n{\"response\":\"b\"}\n");
        assert_eq!(r.skipped(), 1);
        assert_eq!(r.finish(), "ab");
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
    }
}
