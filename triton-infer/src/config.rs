use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "triton-infer",
    version,
    about = "Send one tensor to a KServe v2 / Triton model over HTTP and print the result"
)]
pub struct CliArgs {
    /// Server address (host:port or http(s) URL)
    #[arg(long, default_value = "triton.llm-inference.svc:8000", env = "TRITON_INFER_URL")]
    pub url: String,

    /// Model name
    #[arg(long, default_value = "llama3", env = "TRITON_INFER_MODEL")]
    pub model: String,

    /// Model version; the server picks one when omitted
    #[arg(long, env = "TRITON_INFER_MODEL_VERSION")]
    pub model_version: Option<String>,

    /// Name of the model input
    #[arg(long, default_value = "input_ids")]
    pub input_name: String,

    /// Input datatype (BOOL, UINT8..UINT64, INT8..INT64, FP32, FP64, BYTES)
    #[arg(long, default_value = "INT32")]
    pub datatype: String,

    /// Input shape, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1,4")]
    pub shape: Vec<i64>,

    /// Input elements in row-major order, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "1,2,3,4")]
    pub data: Vec<String>,

    /// Output to request (repeatable)
    #[arg(long = "output", default_value = "output_ids")]
    pub outputs: Vec<String>,

    /// Request id echoed back by the server
    #[arg(long)]
    pub request_id: Option<String>,

    /// Network timeout in seconds
    #[arg(long, default_value = "60", env = "TRITON_INFER_TIMEOUT")]
    pub timeout: u64,

    /// Check server liveness, readiness and model readiness before inferring
    #[arg(long)]
    pub wait_ready: bool,

    /// Print outputs as JSON instead of numpy-style arrays
    #[arg(long)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "TRITON_INFER_LOG_LEVEL")]
    pub log_level: String,
}
