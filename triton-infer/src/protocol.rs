use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tensor::TensorData;

// ── KServe v2 endpoints ───────────────────────────────────────────────────

pub const SERVER_LIVE_PATH: &str = "/v2/health/live";
pub const SERVER_READY_PATH: &str = "/v2/health/ready";

/// `/v2/models/{model}` or `/v2/models/{model}/versions/{version}`.
pub fn model_path(model: &str, version: Option<&str>) -> String {
    match version.filter(|v| !v.is_empty()) {
        Some(v) => format!("/v2/models/{model}/versions/{v}"),
        None => format!("/v2/models/{model}"),
    }
}

pub fn model_ready_path(model: &str, version: Option<&str>) -> String {
    format!("{}/ready", model_path(model, version))
}

pub fn infer_path(model: &str, version: Option<&str>) -> String {
    format!("{}/infer", model_path(model, version))
}

// ── Inference request ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct InferRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub inputs: Vec<RequestInput<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<RequestOutput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RequestInput<'a> {
    pub name: &'a str,
    pub shape: &'a [i64],
    pub datatype: &'static str,
    pub data: &'a TensorData,
}

#[derive(Debug, Serialize)]
pub struct RequestOutput<'a> {
    pub name: &'a str,
    pub parameters: OutputParameters,
}

/// Per-output parameters. Outputs are always requested as JSON, never via
/// the binary tensor extension.
#[derive(Debug, Serialize)]
pub struct OutputParameters {
    pub binary_data: bool,
}

// ── Inference response ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct InferResponseBody {
    pub model_name: String,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub parameters: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub outputs: Vec<ResponseOutput>,
}

/// One output tensor as it arrives on the wire. `data` is decoded lazily
/// against `datatype`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseOutput {
    pub name: String,
    pub shape: Vec<i64>,
    pub datatype: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Body of every non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
