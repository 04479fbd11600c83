//! Blocking HTTP client for a KServe v2 inference server (e.g. Triton).
//!
//! Speaks the JSON form of the protocol only: tensors travel as JSON arrays
//! in both directions.

use std::collections::HashMap;
use std::time::Duration;

use ureq::http::Response;
use ureq::{Agent, Body};

use crate::error::{InferError, Result};
use crate::protocol::{
    self, ErrorBody, InferRequestBody, InferResponseBody, OutputParameters, RequestInput,
    RequestOutput,
};
use crate::tensor::{DataType, Tensor, TensorData};

/// Default network timeout, in seconds, for every request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection options for [`InferenceClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Wall-clock limit for a whole request, connect through body read.
    pub timeout: Duration,
    /// Largest response body accepted, in bytes. Unbounded by default;
    /// JSON-encoded logits for a few tokens already run past ureq's 10 MB
    /// default.
    pub max_response_bytes: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_response_bytes: u64::MAX,
        }
    }
}

/// Per-call options for [`InferenceClient::infer`].
#[derive(Debug, Clone, Default)]
pub struct InferOptions {
    pub model_version: Option<String>,
    pub request_id: Option<String>,
}

/// A named input tensor.
#[derive(Debug, Clone)]
pub struct InferInput {
    name: String,
    tensor: Tensor,
}

impl InferInput {
    pub fn new(name: impl Into<String>, tensor: Tensor) -> Self {
        Self {
            name: name.into(),
            tensor,
        }
    }

    /// Build an input from textual elements, checking them against the
    /// datatype and the shape.
    pub fn from_values<S: AsRef<str>>(
        name: impl Into<String>,
        shape: Vec<i64>,
        datatype: DataType,
        values: &[S],
    ) -> Result<Self> {
        let data = TensorData::parse(datatype, values)?;
        Ok(Self::new(name, Tensor::new(shape, data)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }
}

/// An output the server should return, by name.
#[derive(Debug, Clone)]
pub struct InferRequestedOutput {
    name: String,
}

impl InferRequestedOutput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Decoded response of an inference call.
#[derive(Debug, Clone)]
pub struct InferResult {
    body: InferResponseBody,
}

impl InferResult {
    pub fn model_name(&self) -> &str {
        &self.body.model_name
    }

    pub fn model_version(&self) -> Option<&str> {
        self.body.model_version.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.body.id.as_deref()
    }

    /// Response-level parameters, as sent by the server.
    pub fn parameters(&self) -> Option<&HashMap<String, serde_json::Value>> {
        self.body.parameters.as_ref()
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.body.outputs.iter().map(|o| o.name.as_str())
    }

    /// Decode the named output into a typed tensor.
    pub fn as_tensor(&self, name: &str) -> Result<Tensor> {
        let output = self
            .body
            .outputs
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| InferError::OutputNotFound(name.to_string()))?;

        let datatype: DataType = output.datatype.parse()?;
        let data = TensorData::from_json(datatype, &output.data)?;
        Tensor::new(output.shape.clone(), data)
    }
}

/// Blocking client bound to one server.
pub struct InferenceClient {
    base_url: String,
    agent: Agent,
    max_response_bytes: u64,
}

impl InferenceClient {
    /// Create a client for `url`, which may be a bare `host:port`.
    pub fn new(url: &str, options: ClientOptions) -> Result<Self> {
        let base_url = normalize_url(url)?;
        let agent_config = Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build();
        let agent = Agent::new_with_config(agent_config);

        tracing::debug!(url = %base_url, timeout = ?options.timeout, "Inference client created");
        Ok(Self {
            base_url,
            agent,
            max_response_bytes: options.max_response_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_server_live(&self) -> Result<bool> {
        self.probe(protocol::SERVER_LIVE_PATH)
    }

    pub fn is_server_ready(&self) -> Result<bool> {
        self.probe(protocol::SERVER_READY_PATH)
    }

    pub fn is_model_ready(&self, model: &str, version: Option<&str>) -> Result<bool> {
        self.probe(&protocol::model_ready_path(model, version))
    }

    /// Run one inference call and wait for the result.
    pub fn infer(
        &self,
        model: &str,
        inputs: &[InferInput],
        outputs: &[InferRequestedOutput],
        options: &InferOptions,
    ) -> Result<InferResult> {
        let url = format!(
            "{}{}",
            self.base_url,
            protocol::infer_path(model, options.model_version.as_deref())
        );

        let body = InferRequestBody {
            id: options.request_id.as_deref(),
            inputs: inputs
                .iter()
                .map(|input| RequestInput {
                    name: input.name(),
                    shape: input.tensor().shape(),
                    datatype: input.tensor().datatype().as_str(),
                    data: input.tensor().data(),
                })
                .collect(),
            outputs: outputs
                .iter()
                .map(|output| RequestOutput {
                    name: output.name(),
                    parameters: OutputParameters { binary_data: false },
                })
                .collect(),
        };

        tracing::debug!(
            model,
            url = %url,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "Sending inference request"
        );

        let mut response = self.agent.post(&url).send_json(&body)?;
        check_status(&mut response, self.max_response_bytes)?;

        let text = response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_string()?;
        let body: InferResponseBody = serde_json::from_str(&text)?;

        tracing::debug!(
            model = %body.model_name,
            version = ?body.model_version,
            outputs = body.outputs.len(),
            "Inference response received"
        );

        Ok(InferResult { body })
    }

    fn probe(&self, path: &str) -> Result<bool> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.agent.get(&url).call()?;
        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "Health probe");
        Ok(status.is_success())
    }
}

/// Turn a non-2xx response into [`InferError::Server`], using the
/// `{"error": ...}` body when present.
fn check_status(response: &mut Response<Body>, limit: u64) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let text = match response.body_mut().with_config().limit(limit).read_to_string() {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(status = status.as_u16(), error = %e, "Failed to read error body");
            String::new()
        }
    };
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => text.trim().to_string(),
    };

    tracing::warn!(status = status.as_u16(), %message, "Server rejected request");
    Err(InferError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Accept `host:port` or an `http(s)://` URL; return it with a scheme and
/// without a trailing slash.
pub fn normalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(InferError::InvalidUrl(url.to_string()));
    }

    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme @ ("http" | "https"), rest)) => (scheme, rest),
        Some(_) => return Err(InferError::InvalidUrl(url.to_string())),
        None => ("http", trimmed),
    };

    let rest = rest.trim_end_matches('/');
    if rest.is_empty() {
        return Err(InferError::InvalidUrl(url.to_string()));
    }
    Ok(format!("{scheme}://{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_http_scheme() {
        assert_eq!(
            normalize_url("triton.llm-inference.svc:8000").unwrap(),
            "http://triton.llm-inference.svc:8000"
        );
    }

    #[test]
    fn full_url_is_kept_without_trailing_slash() {
        assert_eq!(
            normalize_url("https://triton.example.com/").unwrap(),
            "https://triton.example.com"
        );
    }

    #[test]
    fn bad_urls_are_rejected() {
        for url in ["", "   ", "ftp://host:21", "http://", "host name:8000"] {
            let err = normalize_url(url).unwrap_err();
            assert_eq!(err.code(), "INVALID_URL", "url: {url:?}");
        }
    }

    #[test]
    fn input_from_values_checks_shape() {
        let values = ["1", "2", "3", "4"];
        let input = InferInput::from_values("input_ids", vec![1, 4], DataType::Int32, &values).unwrap();
        assert_eq!(input.name(), "input_ids");
        assert_eq!(input.tensor().data(), &TensorData::Int32(vec![1, 2, 3, 4]));

        let err = InferInput::from_values("input_ids", vec![2, 4], DataType::Int32, &["1", "2"])
            .unwrap_err();
        assert_eq!(err.code(), "SHAPE_MISMATCH");
    }

    #[test]
    fn result_decodes_named_output() {
        let body: InferResponseBody = serde_json::from_value(serde_json::json!({
            "model_name": "llama3",
            "id": "req-7",
            "outputs": [
                {"name": "logits", "datatype": "FP32", "shape": [2], "data": [0.25, 0.75]},
                {"name": "output_ids", "datatype": "INT32", "shape": [1, 4], "data": [5, 6, 7, 8]},
            ],
        }))
        .unwrap();
        let result = InferResult { body };

        assert_eq!(result.id(), Some("req-7"));
        assert!(result.parameters().is_none());
        assert_eq!(result.output_names().collect::<Vec<_>>(), ["logits", "output_ids"]);

        let tensor = result.as_tensor("output_ids").unwrap();
        assert_eq!(tensor.shape(), &[1, 4]);
        assert_eq!(tensor.to_string(), "[[5 6 7 8]]");

        let err = result.as_tensor("missing").unwrap_err();
        assert_eq!(err.code(), "OUTPUT_NOT_FOUND");
    }

    #[test]
    fn result_exposes_response_parameters() {
        let body: InferResponseBody = serde_json::from_value(serde_json::json!({
            "model_name": "llama3",
            "parameters": {"sequence_id": 12, "sequence_end": true},
            "outputs": [],
        }))
        .unwrap();
        let result = InferResult { body };

        let parameters = result.parameters().unwrap();
        assert_eq!(parameters["sequence_id"], 12);
        assert_eq!(parameters["sequence_end"], true);
    }

    #[test]
    fn result_rejects_inconsistent_shape() {
        let body: InferResponseBody = serde_json::from_value(serde_json::json!({
            "model_name": "llama3",
            "outputs": [{"name": "y", "datatype": "INT64", "shape": [3], "data": [1, 2]}],
        }))
        .unwrap();
        let err = InferResult { body }.as_tensor("y").unwrap_err();
        assert_eq!(err.code(), "SHAPE_MISMATCH");
    }
}
