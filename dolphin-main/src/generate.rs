//! Answer generation against an Ollama-compatible `/api/generate` endpoint

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

/// Reply when the service answers with anything but `200 OK`
pub const GENERATION_FAILED: &str = "Failed to generate response.";

/// Reply when a response line is not valid JSON
pub const PARSE_FAILED: &str = "Failed to parse server response.";

/// Turns a prompt into generated text
#[async_trait]
pub trait Generator: Send + Sync {
  async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: &'a str,
}

/// One line of the newline-delimited response
#[derive(Deserialize)]
struct GenerateChunk {
  #[serde(default)]
  response: Option<String>,
}

pub struct OllamaClient {
  http_client: HttpClient,
  endpoint: String,
  model: String,
}

impl OllamaClient {
  pub fn new(endpoint: &str, model: &str) -> Result<Self> {
    let http_client = HttpClient::builder()
      .user_agent(concat!("dolphin/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self {
      http_client,
      endpoint: endpoint.trim_end_matches('/').to_string(),
      model: model.to_string(),
    })
  }

  fn url(&self) -> String {
    format!("{}/api/generate", self.endpoint)
  }
}

#[async_trait]
impl Generator for OllamaClient {
  async fn generate(&self, prompt: &str) -> Result<String> {
    let url = self.url();
    tracing::debug!(%url, model = %self.model, "sending generation request");

    let response = self
      .http_client
      .post(&url)
      .json(&GenerateRequest {
        model: &self.model,
        prompt,
      })
      .send()
      .await
      .with_context(|| format!("Failed to reach generation service at {}", url))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .context("Failed to read generation response")?;

    if status != StatusCode::OK {
      tracing::error!(%status, %body, "generation request failed");
      return Ok(GENERATION_FAILED.to_string());
    }

    match parse_generation(&body) {
      Ok(text) => Ok(text),
      Err(e) => {
        tracing::error!(error = %e, %body, "could not parse generation response");
        Ok(PARSE_FAILED.to_string())
      }
    }
  }
}

/// Concatenate the `response` fragments of a newline-delimited JSON body, in order.
///
/// Blank lines are skipped; any other line that fails to parse fails the whole body.
pub fn parse_generation(body: &str) -> std::result::Result<String, serde_json::Error> {
  let mut text = String::new();
  for line in body.lines().filter(|line| !line.trim().is_empty()) {
    let chunk: GenerateChunk = serde_json::from_str(line)?;
    if let Some(fragment) = chunk.response {
      text.push_str(&fragment);
    }
  }
  Ok(text)
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::Matcher;
  use serde_json::json;

  #[test]
  fn fragments_concatenate_in_order() {
    let body = "{\"response\":\"Miso\"}\n\n{\"response\":\" is your cat.\"}\n{\"done\":true}\n";
    assert_eq!(parse_generation(body).unwrap(), "Miso is your cat.");
  }

  #[test]
  fn lines_without_response_contribute_nothing() {
    assert_eq!(parse_generation("{\"done\":true}").unwrap(), "");
    assert_eq!(parse_generation("").unwrap(), "");
  }

  #[test]
  fn malformed_line_is_an_error() {
    assert!(parse_generation("{\"response\":\"ok\"}\nnot json\n").is_err());
    assert!(parse_generation("42").is_err());
  }

  #[tokio::test]
  async fn posts_model_and_prompt_and_joins_stream() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/api/generate")
      .match_body(Matcher::PartialJson(json!({
        "model": "tinydolphin",
        "prompt": "Say hello"
      })))
      .with_status(200)
      .with_header("content-type", "application/x-ndjson")
      .with_body("{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n{\"response\":\"\",\"done\":true}\n")
      .create_async()
      .await;

    let client = OllamaClient::new(&format!("{}/", server.url()), "tinydolphin").unwrap();
    assert_eq!(client.generate("Say hello").await.unwrap(), "Hello");
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn error_status_gives_fixed_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/api/generate")
      .with_status(500)
      .with_body("model not loaded")
      .create_async()
      .await;

    let client = OllamaClient::new(&server.url(), "tinydolphin").unwrap();
    assert_eq!(client.generate("hi").await.unwrap(), GENERATION_FAILED);
  }

  #[tokio::test]
  async fn accepted_but_not_ok_gives_fixed_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/api/generate")
      .with_status(202)
      .with_body("{\"response\":\"queued\"}\n")
      .create_async()
      .await;

    let client = OllamaClient::new(&server.url(), "tinydolphin").unwrap();
    assert_eq!(client.generate("hi").await.unwrap(), GENERATION_FAILED);
  }

  #[tokio::test]
  async fn malformed_body_gives_fixed_message() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/api/generate")
      .with_status(200)
      .with_body("{\"response\":\"partial\"}\n<html>oops</html>\n")
      .create_async()
      .await;

    let client = OllamaClient::new(&server.url(), "tinydolphin").unwrap();
    assert_eq!(client.generate("hi").await.unwrap(), PARSE_FAILED);
  }

  #[tokio::test]
  async fn unreachable_service_is_an_error() {
    let client = OllamaClient::new("http://127.0.0.1:1", "tinydolphin").unwrap();
    assert!(client.generate("hi").await.is_err());
  }
}
