use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use triton_infer::client::{
    ClientOptions, InferInput, InferOptions, InferRequestedOutput, InferResult, InferenceClient,
};
use triton_infer::config::CliArgs;
use triton_infer::{DataType, InferError};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Logging goes to stderr; stdout carries only the printed result
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let client = InferenceClient::new(
        &args.url,
        ClientOptions {
            timeout: Duration::from_secs(args.timeout),
            ..ClientOptions::default()
        },
    )?;

    let options = InferOptions {
        model_version: args.model_version.clone(),
        request_id: args.request_id.clone(),
    };

    if args.wait_ready {
        check_ready(&client, &args.model, options.model_version.as_deref())?;
    }

    let datatype: DataType = args.datatype.parse()?;
    let input = InferInput::from_values(
        args.input_name.as_str(),
        args.shape.clone(),
        datatype,
        &args.data,
    )?;
    let outputs: Vec<InferRequestedOutput> =
        args.outputs.iter().map(InferRequestedOutput::new).collect();

    tracing::info!(
        url = %client.base_url(),
        model = %args.model,
        input = %args.input_name,
        shape = ?args.shape,
        %datatype,
        "Running inference"
    );

    let result = client.infer(&args.model, &[input], &outputs, &options)?;

    if args.json {
        print_json(&result, &args.outputs)
    } else {
        print_arrays(&result, &args.outputs)
    }
}

fn check_ready(client: &InferenceClient, model: &str, version: Option<&str>) -> Result<()> {
    if !client.is_server_live()? {
        bail!("server at {} is not live", client.base_url());
    }
    if !client.is_server_ready()? {
        bail!("server at {} is not ready", client.base_url());
    }
    if !client.is_model_ready(model, version)? {
        return Err(InferError::ModelNotReady(model.to_string()).into());
    }
    tracing::info!(model, "Model ready");
    Ok(())
}

fn print_arrays(result: &InferResult, names: &[String]) -> Result<()> {
    for name in names {
        let tensor = result.as_tensor(name)?;
        if names.len() == 1 {
            println!("{tensor}");
        } else {
            println!("{name}: {tensor}");
        }
    }
    Ok(())
}

fn print_json(result: &InferResult, names: &[String]) -> Result<()> {
    let mut outputs = serde_json::Map::new();
    for name in names {
        let tensor = result.as_tensor(name)?;
        outputs.insert(
            name.clone(),
            serde_json::json!({
                "shape": tensor.shape(),
                "datatype": tensor.datatype().as_str(),
                "data": tensor.data(),
            }),
        );
    }
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    Ok(())
}
