//! Test collection generation with a generative model.
//!
//! The model client is injected: anything implementing [`CollectionModel`]
//! can turn a slice plus a requirements document into collection text. The
//! default implementation talks to the Anthropic Messages API and reads the
//! answer as a server-sent event stream.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::collection::{file_stem, validate_collection, write_json};
use crate::error::GenerateError;
use crate::loader::load_spec;
use crate::repair::clean_and_parse;

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
/// Environment variable overriding the model name.
pub const MODEL_VAR: &str = "ANTHROPIC_MODEL";
/// Environment variable overriding the API base URL.
pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
/// Environment variable overriding the output token limit.
pub const MAX_TOKENS_VAR: &str = "ANTHROPIC_MAX_TOKENS";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 30000;

/// Instructions sent as the system prompt for every endpoint.
pub const SYSTEM_PROMPT: &str = r#"You are an expert API tester creating a Postman Collection (v2.1.0).
You receive an OpenAPI 3.x specification describing exactly one endpoint, and a
Requirements Document describing changes across the whole API.

1. Work out the endpoint's inputs and outputs from the specification.
2. Decide whether any change in the Requirements Document affects this endpoint.
   If it does, apply the change to your understanding of the endpoint.
3. Positive tests:
   - one test that uses every parameter at once
   - for every enum parameter, one test per enum value
   - each positive test checks the status code: 300 when the value causes
     disambiguation, 200 otherwise
4. Edge tests:
   - every parameter empty, and every parameter null
   - every string parameter with special/unicode characters and escape
     sequences, and with only whitespace
   - every integer parameter with negative values, decimals, maximum + 1 and
     minimum - 1
   - every email, date, URL or UUID parameter with an invalid format
   - every boolean and enum parameter with an invalid value
   - every array, object and collection parameter empty
   Decide whether each case should pass (check for 200) or fail (check for
   400 and 404).
5. Put the tests in a Postman collection.

Notes:
- Read parameter descriptions carefully. When a description says certain
  values "cause disambiguation", tests using those values expect 300.
- Use realistic example values for path parameters, not variables.
- The URL is available as the collection variable base_url and the API key as
  app_key. No other variables exist.

Aim for maximum coverage without duplicate test logic. Output only the raw
JSON of the collection, valid and complete so it can be imported directly.
No explanations and no markdown."#;

/// Build the user prompt for one endpoint.
pub fn build_user_prompt(slice_json: &str, requirements: &str) -> String {
    format!(
        "OpenAPI specification :\n{}\nRequirements Document :\n{}\n",
        slice_json, requirements
    )
}

/// A generative model that answers a system and user prompt with text.
pub trait CollectionModel {
    /// Produce the raw model output for the prompts.
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerateError>;
}

/// Settings for the model client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

impl GeneratorConfig {
    /// Create a config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Read the config from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::MissingConfig` when the API key is unset.
    pub fn from_env() -> Result<Self, GenerateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the config through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GenerateError> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or(GenerateError::MissingConfig { name: API_KEY_VAR })?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup(MODEL_VAR).filter(|m| !m.is_empty()) {
            config.model = model;
        }
        if let Some(url) = lookup(BASE_URL_VAR).filter(|u| !u.is_empty()) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(MAX_TOKENS_VAR) {
            config.max_tokens = raw.trim().parse().map_err(|_| GenerateError::InvalidConfig {
                name: MAX_TOKENS_VAR,
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    Error { error: ApiErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Concatenate the text deltas of a Messages API event stream.
///
/// # Errors
///
/// Returns `GenerateError::Api` for an `error` event, and
/// `GenerateError::Stream`/`GenerateError::Event` for unreadable input.
pub fn read_event_stream<R: BufRead>(reader: R) -> Result<String, GenerateError> {
    let mut text = String::new();

    for line in reader.lines() {
        let line = line.map_err(|source| GenerateError::Stream { source })?;
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }

        let event: StreamEvent =
            serde_json::from_str(data).map_err(|source| GenerateError::Event { source })?;
        match event {
            StreamEvent::ContentBlockDelta {
                delta: Delta::TextDelta { text: chunk },
            } => text.push_str(&chunk),
            StreamEvent::Error { error } => {
                return Err(GenerateError::Api {
                    kind: error.kind,
                    message: error.message,
                })
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Messages API client using a blocking HTTP connection.
#[cfg(feature = "remote")]
pub struct AnthropicClient {
    config: GeneratorConfig,
    http: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl AnthropicClient {
    /// Generation can take minutes for large endpoints.
    const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(600);
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(config: GeneratorConfig) -> Result<Self, GenerateError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|source| GenerateError::Network { source })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

#[cfg(feature = "remote")]
impl CollectionModel for AnthropicClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": [{ "role": "user", "content": user }],
            "stream": true
        });

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .json(&body)
            .send()
            .map_err(|source| GenerateError::Network { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        read_event_stream(std::io::BufReader::new(response))
    }
}

/// Generate a validated collection for one slice.
///
/// # Errors
///
/// Returns `GenerateError` if the model call fails, its output is not JSON
/// even after repair, or the JSON lacks the collection layout.
pub fn generate_collection(
    model: &dyn CollectionModel,
    slice: &Value,
    requirements: &str,
) -> Result<Value, GenerateError> {
    let slice_json =
        serde_json::to_string_pretty(slice).map_err(|source| GenerateError::Serialize { source })?;
    let raw = model.complete(SYSTEM_PROMPT, &build_user_prompt(&slice_json, requirements))?;
    let collection = clean_and_parse(&raw)?;
    validate_collection(&collection)?;
    Ok(collection)
}

/// File name of the collection generated from a slice file.
pub fn collection_file_name(slice_file: &Path) -> String {
    format!("{}_collection.json", file_stem(slice_file))
}

/// Generate a collection from a slice file and write it into `output_dir`.
///
/// Returns the path written.
pub fn generate_collection_file(
    model: &dyn CollectionModel,
    slice_file: &Path,
    requirements: &str,
    output_dir: &Path,
) -> Result<PathBuf, GenerateError> {
    let slice = load_spec(slice_file)?;
    let collection = generate_collection(model, &slice, requirements)?;
    let output = output_dir.join(collection_file_name(slice_file));
    write_json(&collection, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CollectionError, RepairError};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Returns canned output and records the prompts it was given.
    struct CannedModel {
        output: String,
        prompts: RefCell<Vec<(String, String)>>,
    }

    impl CannedModel {
        fn new(output: &str) -> Self {
            Self {
                output: output.to_string(),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl CollectionModel for CannedModel {
        fn complete(&self, system: &str, user: &str) -> Result<String, GenerateError> {
            self.prompts
                .borrow_mut()
                .push((system.to_string(), user.to_string()));
            Ok(self.output.clone())
        }
    }

    fn slice() -> Value {
        json!({ "openapi": "3.0.0", "paths": { "/pets": { "get": {} } } })
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_requires_api_key() {
        let result = GeneratorConfig::from_lookup(env(&[]));
        assert!(matches!(
            result,
            Err(GenerateError::MissingConfig {
                name: "ANTHROPIC_API_KEY"
            })
        ));

        let result = GeneratorConfig::from_lookup(env(&[(API_KEY_VAR, "  ")]));
        assert!(result.is_err());
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = GeneratorConfig::from_lookup(env(&[(API_KEY_VAR, "k")])).unwrap();
        assert_eq!(config, GeneratorConfig::new("k"));
        assert_eq!(config.max_tokens, 30000);

        let config = GeneratorConfig::from_lookup(env(&[
            (API_KEY_VAR, "k"),
            (MODEL_VAR, "other-model"),
            (BASE_URL_VAR, "http://localhost:1234"),
            (MAX_TOKENS_VAR, "2048"),
        ]))
        .unwrap();
        assert_eq!(config.model, "other-model");
        assert_eq!(config.base_url, "http://localhost:1234");
        assert_eq!(config.max_tokens, 2048);
    }

    #[test]
    fn config_rejects_bad_max_tokens() {
        let result =
            GeneratorConfig::from_lookup(env(&[(API_KEY_VAR, "k"), (MAX_TOKENS_VAR, "lots")]));
        assert!(matches!(result, Err(GenerateError::InvalidConfig { .. })));
    }

    #[test]
    fn event_stream_concatenates_text() {
        let stream = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"m\"}}\n\n\
event: ping\n\
data: {\"type\":\"ping\"}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"{\\\"item\\\"\"}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\": []}\"}}\n\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\n";

        let text = read_event_stream(stream.as_bytes()).unwrap();
        assert_eq!(text, r#"{"item": []}"#);
    }

    #[test]
    fn event_stream_error_event() {
        let stream = "event: error\n\
data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        let result = read_event_stream(stream.as_bytes());
        match result {
            Err(GenerateError::Api { kind, message }) => {
                assert_eq!(kind, "overloaded_error");
                assert_eq!(message, "Overloaded");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn event_stream_malformed_data() {
        let result = read_event_stream("data: {not json\n".as_bytes());
        assert!(matches!(result, Err(GenerateError::Event { .. })));
    }

    #[test]
    fn generate_sends_slice_and_requirements() {
        let model = CannedModel::new("```json\n{\"info\": {\"name\": \"Pets\"}, \"item\": []}\n```");
        let collection = generate_collection(&model, &slice(), "Add a color filter.").unwrap();
        assert_eq!(collection["info"]["name"], "Pets");

        let prompts = model.prompts.borrow();
        let (system, user) = &prompts[0];
        assert_eq!(system, SYSTEM_PROMPT);
        assert!(user.starts_with("OpenAPI specification :\n{"));
        assert!(user.contains("\"/pets\""));
        assert!(user.contains("Requirements Document :\nAdd a color filter."));
    }

    #[test]
    fn generate_rejects_unparseable_output() {
        let model = CannedModel::new("I cannot help with that.");
        let result = generate_collection(&model, &slice(), "");
        assert!(matches!(
            result,
            Err(GenerateError::Repair(RepairError::Unparseable { .. }))
        ));
    }

    #[test]
    fn generate_rejects_wrong_shape() {
        let model = CannedModel::new(r#"{"tests": []}"#);
        let result = generate_collection(&model, &slice(), "");
        assert!(matches!(
            result,
            Err(GenerateError::Collection(CollectionError::Invalid { .. }))
        ));
    }

    #[test]
    fn generate_collection_file_writes_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let slice_file = dir.path().join("get_pets.json");
        std::fs::write(&slice_file, slice().to_string()).unwrap();
        let out_dir = dir.path().join("output_data");

        let model = CannedModel::new(r#"{"item": [{"name": "ok"}]}"#);
        let written = generate_collection_file(&model, &slice_file, "", &out_dir).unwrap();

        assert_eq!(written, out_dir.join("get_pets_collection.json"));
        let saved: Value = serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(saved["item"][0]["name"], "ok");
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;
        use mockito::Matcher;

        fn sse(text: &str) -> String {
            let delta = json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": { "type": "text_delta", "text": text }
            });
            format!(
                "event: content_block_delta\ndata: {}\n\nevent: message_stop\ndata: {{\"type\":\"message_stop\"}}\n\n",
                delta
            )
        }

        fn client(url: &str) -> AnthropicClient {
            let mut config = GeneratorConfig::new("test-key").model("test-model");
            config.base_url = url.to_string();
            AnthropicClient::new(config).unwrap()
        }

        #[test]
        fn client_streams_completion() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/v1/messages")
                .match_header("x-api-key", "test-key")
                .match_header("anthropic-version", "2023-06-01")
                .match_body(Matcher::PartialJson(json!({
                    "model": "test-model",
                    "stream": true,
                    "system": "sys",
                    "messages": [{ "role": "user", "content": "hello" }]
                })))
                .with_status(200)
                .with_header("content-type", "text/event-stream")
                .with_body(sse(r#"{"item": []}"#))
                .create();

            let text = client(&server.url()).complete("sys", "hello").unwrap();
            assert_eq!(text, r#"{"item": []}"#);
            mock.assert();
        }

        #[test]
        fn client_reports_http_status() {
            let mut server = mockito::Server::new();
            server
                .mock("POST", "/v1/messages")
                .with_status(401)
                .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
                .create();

            let result = client(&server.url()).complete("sys", "hello");
            match result {
                Err(GenerateError::Status { status, body }) => {
                    assert_eq!(status, 401);
                    assert!(body.contains("invalid x-api-key"));
                }
                other => panic!("expected status error, got {:?}", other),
            }
        }
    }
}
